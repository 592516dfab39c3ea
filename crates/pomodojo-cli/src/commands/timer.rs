use clap::Subcommand;
use pomodojo_core::keymap::key_label;
use pomodojo_core::{
    Event, Intent, KeyValueStore, Keymap, Pomodojo, TickToken, TimerConfigPatch, TimerSnapshot,
    TimerStatus,
};
use std::io::Write;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

use super::open_app;

const TICK: Duration = Duration::from_secs(1);

#[derive(Subcommand)]
pub enum TimerAction {
    /// Run an interactive timer session (one key per line, `q` to quit)
    Run,
    /// Timer durations and cycle length
    Config {
        #[command(subcommand)]
        action: TimerConfigAction,
    },
    /// Print the timer state a new session starts from, as JSON
    Status,
}

#[derive(Subcommand)]
pub enum TimerConfigAction {
    /// Print the timer config as JSON
    Show,
    /// Change one or more durations
    Set {
        /// Focus session length in minutes
        #[arg(long)]
        focus: Option<u32>,
        /// Short break length in minutes
        #[arg(long)]
        short_break: Option<u32>,
        /// Long break length in minutes
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions before a long break
        #[arg(long)]
        sessions: Option<u32>,
    },
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let (mut app, config) = open_app()?;

    match action {
        TimerAction::Run => {
            let keymap = Keymap::from_config(&config.shortcuts);
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(interactive(&mut app, &keymap))?;
        }
        TimerAction::Config { action } => match action {
            TimerConfigAction::Show => {
                println!("{}", serde_json::to_string_pretty(&app.timer().config)?);
            }
            TimerConfigAction::Set {
                focus,
                short_break,
                long_break,
                sessions,
            } => {
                let patch = TimerConfigPatch {
                    focus_minutes: focus,
                    short_break_minutes: short_break,
                    long_break_minutes: long_break,
                    sessions_until_long_break: sessions,
                };
                if patch.is_empty() {
                    return Err("nothing to update; pass at least one option".into());
                }
                app.update_config(&patch)?;
                println!("{}", serde_json::to_string_pretty(&app.timer().config)?);
            }
        },
        TimerAction::Status => {
            println!("{}", serde_json::to_string_pretty(&app.snapshot())?);
        }
    }
    Ok(())
}

/// Outstanding tick and when to deliver it.
struct Armed {
    token: TickToken,
    deadline: Instant,
}

async fn interactive<S: KeyValueStore>(
    app: &mut Pomodojo<S>,
    keymap: &Keymap,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut armed: Option<Armed> = None;
    // Deadline of the tick just delivered, so chained ticks don't drift.
    let mut last_fired: Option<Instant> = None;

    print_help(keymap);
    render(app);

    loop {
        armed = match (app.pending_tick(), armed.take()) {
            (Some(token), Some(current)) if current.token == token => Some(current),
            (Some(token), _) => {
                let base = last_fired.take().unwrap_or_else(Instant::now);
                Some(Armed {
                    token,
                    deadline: base + TICK,
                })
            }
            (None, _) => None,
        };
        last_fired = None;

        tokio::select! {
            _ = wait_until(armed.as_ref().map(|a| a.deadline)) => {
                if let Some(fired) = armed.take() {
                    last_fired = Some(fired.deadline);
                    let event = app.tick(fired.token);
                    report(event);
                    render(app);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let input = line.trim();
                if input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit") {
                    break;
                }
                if input == "?" {
                    print_help(keymap);
                    continue;
                }
                let Some(key) = line_key(input) else {
                    println!("unbound key '{input}', press ? for help");
                    continue;
                };
                match keymap.resolve(key) {
                    Some(Intent::Settings) => {
                        println!("{}", serde_json::to_string_pretty(&app.timer().config)?);
                        print_help(keymap);
                    }
                    Some(intent) => {
                        tracing::debug!(%intent, "key pressed");
                        report(app.dispatch(intent));
                        render(app);
                    }
                    None => println!("unbound key '{key}', press ? for help"),
                }
            }
        }
    }

    println!();
    Ok(())
}

/// The key a trimmed input line stands for. A bare Enter is the space bar;
/// anything longer than one character is not a key.
fn line_key(input: &str) -> Option<char> {
    let mut chars = input.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Some(' '),
        (Some(key), None) => Some(key),
        (Some(_), Some(_)) => None,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

fn report(outcome: pomodojo_core::error::Result<Option<Event>>) {
    match outcome {
        Ok(Some(Event::TimerSkipped { from, to, .. })) => {
            println!("\nskipped {from}, next up: {to}");
        }
        Ok(Some(Event::SessionAdvanced { session_type, .. })) => {
            println!("\nnext session: {session_type}");
        }
        Ok(_) => {}
        Err(e) => eprintln!("\nerror: {e}"),
    }
}

fn render<S: KeyValueStore>(app: &Pomodojo<S>) {
    let snapshot = app.snapshot();
    let active = app
        .active_task()
        .map(|t| format!(" | {} ({}/{})", t.text, t.completed_units, t.estimated_units))
        .unwrap_or_default();
    print!("\r{}{active}   ", status_line(&snapshot));
    let _ = std::io::stdout().flush();
}

fn status_line(snapshot: &TimerSnapshot) -> String {
    let status = match snapshot.state.status {
        TimerStatus::Idle => "ready",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
        TimerStatus::Completed => "done",
    };
    format!(
        "{} #{} {} [{status}] {:>3.0}%",
        snapshot.session_label,
        snapshot.state.current_session_index,
        snapshot.clock(),
        snapshot.progress * 100.0,
    )
}

fn print_help(keymap: &Keymap) {
    let keys: Vec<String> = keymap
        .bindings()
        .map(|(key, intent)| format!("{}={intent}", key_label(key)))
        .collect();
    println!("\nkeys: {} (Enter=Space, q=quit, ?=help)", keys.join("  "));
}
