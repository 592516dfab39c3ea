//! Timer engine implementation.
//!
//! The timer engine is a tick-driven state machine. It owns no thread and no
//! clock: whoever drives it asks for the outstanding [`TickToken`] with
//! [`TimerEngine::pending_tick`], waits one second, and hands the token back to
//! [`TimerEngine::tick`]. Tokens are invalidated by every transition that
//! leaves `Running`, so a tick that arrives late is ignored instead of
//! decrementing a session that has already moved on.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!           |
//!           v
//!       Completed -> (advance_to_next) -> Idle
//! ```
//!
//! `reset` returns to Idle from anywhere; `skip` moves Running/Paused to the
//! next session's Idle.
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = TimerEngine::new(TimerConfig::default())?
//!     .with_notifier(NullNotifier)
//!     .on_focus_complete(|total| println!("{total} pomodoros"));
//! engine.start();
//! while let Some(token) = engine.pending_tick() {
//!     // wait one second
//!     engine.tick(token);
//! }
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::config::{SessionType, TimerConfig, TimerConfigPatch};
use crate::error::ValidationError;
use crate::events::Event;
use crate::notify::{Notifier, NullNotifier};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
    /// The countdown hit zero. Not terminal: `advance_to_next` or `reset`
    /// bring the timer back to `Idle`.
    Completed,
}

/// Observable timer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub status: TimerStatus,
    pub session_type: SessionType,
    pub seconds_remaining: u64,
    /// 1-based position in the focus cycle; drives the long-break rule.
    pub current_session_index: u32,
    pub total_focus_sessions_completed: u32,
    pub config: TimerConfig,
}

impl TimerState {
    fn initial(config: TimerConfig) -> Self {
        Self {
            status: TimerStatus::Idle,
            session_type: SessionType::Focus,
            seconds_remaining: config.duration_secs(SessionType::Focus),
            current_session_index: 1,
            total_focus_sessions_completed: 0,
            config,
        }
    }
}

/// Handle for the single outstanding scheduled tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TickToken(u64);

/// Render-ready view of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerSnapshot {
    #[serde(flatten)]
    pub state: TimerState,
    pub session_label: String,
    pub session_secs: u64,
    /// 0.0 .. 1.0 progress within the current session.
    pub progress: f64,
}

impl TimerSnapshot {
    /// `MM:SS` countdown text.
    pub fn clock(&self) -> String {
        let secs = self.state.seconds_remaining;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

pub type FocusCompleteCallback = Box<dyn FnMut(u32)>;

/// Core timer engine.
pub struct TimerEngine {
    state: TimerState,
    /// Length of the current session when it was entered. Stays fixed if the
    /// config changes mid-session.
    session_secs: u64,
    pending_tick: Option<TickToken>,
    next_token: u64,
    notifier: Box<dyn Notifier>,
    on_focus_complete: Option<FocusCompleteCallback>,
}

impl std::fmt::Debug for TimerEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerEngine")
            .field("state", &self.state)
            .field("session_secs", &self.session_secs)
            .field("pending_tick", &self.pending_tick)
            .finish_non_exhaustive()
    }
}

impl TimerEngine {
    /// Create a new idle engine positioned at the first focus session.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if `config` has a zero duration or a
    /// cycle shorter than two sessions.
    pub fn new(config: TimerConfig) -> Result<Self, ValidationError> {
        config.validate()?;
        let state = TimerState::initial(config);
        Ok(Self {
            session_secs: state.seconds_remaining,
            state,
            pending_tick: None,
            next_token: 0,
            notifier: Box::new(NullNotifier),
            on_focus_complete: None,
        })
    }

    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Register the callback invoked with the new total every time a focus
    /// session ends, whether it ran out or was skipped.
    pub fn on_focus_complete(mut self, callback: impl FnMut(u32) + 'static) -> Self {
        self.on_focus_complete = Some(Box::new(callback));
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    pub fn status(&self) -> TimerStatus {
        self.state.status
    }

    pub fn session_type(&self) -> SessionType {
        self.state.session_type
    }

    pub fn seconds_remaining(&self) -> u64 {
        self.state.seconds_remaining
    }

    pub fn config(&self) -> &TimerConfig {
        &self.state.config
    }

    pub fn session_secs(&self) -> u64 {
        self.session_secs
    }

    /// The tick the driver should deliver next, if the timer is running.
    pub fn pending_tick(&self) -> Option<TickToken> {
        self.pending_tick
    }

    /// Session type that `skip` or `advance_to_next` would move to.
    pub fn next_session_type(&self) -> SessionType {
        self.state
            .config
            .next_session_type(self.state.session_type, self.state.current_session_index)
    }

    /// 0.0 .. 1.0 progress within current session.
    pub fn progress(&self) -> f64 {
        if self.session_secs == 0 {
            return 0.0;
        }
        1.0 - (self.state.seconds_remaining as f64 / self.session_secs as f64)
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        TimerSnapshot {
            state: self.state.clone(),
            session_label: self.state.session_type.label().to_string(),
            session_secs: self.session_secs,
            progress: self.progress(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Option<Event> {
        let resumed = match self.state.status {
            TimerStatus::Idle => false,
            TimerStatus::Paused => true,
            TimerStatus::Running | TimerStatus::Completed => return None,
        };
        self.state.status = TimerStatus::Running;
        self.schedule_tick();
        debug!(
            session = %self.state.session_type,
            remaining = self.state.seconds_remaining,
            resumed,
            "timer running"
        );
        let remaining_secs = self.state.seconds_remaining;
        Some(if resumed {
            Event::TimerResumed {
                remaining_secs,
                at: Utc::now(),
            }
        } else {
            Event::TimerStarted {
                session_type: self.state.session_type,
                session_index: self.state.current_session_index,
                remaining_secs,
                at: Utc::now(),
            }
        })
    }

    pub fn pause(&mut self) -> Option<Event> {
        if self.state.status != TimerStatus::Running {
            return None;
        }
        self.cancel_tick();
        self.state.status = TimerStatus::Paused;
        debug!(remaining = self.state.seconds_remaining, "timer paused");
        Some(Event::TimerPaused {
            remaining_secs: self.state.seconds_remaining,
            at: Utc::now(),
        })
    }

    /// Deliver a scheduled tick. Returns `Some(Event::TimerCompleted)` when
    /// the session runs out; stale or unexpected tokens are ignored.
    pub fn tick(&mut self, token: TickToken) -> Option<Event> {
        if self.state.status != TimerStatus::Running || self.pending_tick != Some(token) {
            trace!(?token, current = ?self.pending_tick, "ignoring stale tick");
            return None;
        }
        self.pending_tick = None;
        self.state.seconds_remaining = self.state.seconds_remaining.saturating_sub(1);
        if self.state.seconds_remaining == 0 {
            return Some(self.complete_session());
        }
        self.schedule_tick();
        None
    }

    /// Deliver whatever tick is outstanding. For drivers that keep their own
    /// clock and only need "one second passed".
    pub fn tick_pending(&mut self) -> Option<Event> {
        let token = self.pending_tick?;
        self.tick(token)
    }

    pub fn reset(&mut self) -> Option<Event> {
        self.cancel_tick();
        let session_type = self.state.session_type;
        self.enter_session(session_type);
        debug!(session = %session_type, "timer reset");
        Some(Event::TimerReset {
            session_type,
            at: Utc::now(),
        })
    }

    /// Abandon the running or paused session and move to the next one.
    ///
    /// A skipped focus session still counts toward the focus total and fires
    /// the focus-complete callback, but no notification is emitted.
    pub fn skip(&mut self) -> Option<Event> {
        if !matches!(
            self.state.status,
            TimerStatus::Running | TimerStatus::Paused
        ) {
            return None;
        }
        self.cancel_tick();
        let from = self.state.session_type;
        let to = self.next_session_type();
        let elapsed_secs = self.session_secs.saturating_sub(self.state.seconds_remaining);

        if from == SessionType::Focus {
            self.state.total_focus_sessions_completed += 1;
            self.state.current_session_index += 1;
            self.fire_focus_complete();
        }
        self.enter_session(to);
        debug!(%from, %to, elapsed_secs, "session skipped");
        Some(Event::TimerSkipped {
            from,
            to,
            elapsed_secs,
            at: Utc::now(),
        })
    }

    /// "Next Session": leave a completed session for the next one's Idle.
    ///
    /// The focus total was already bumped when the session completed, so the
    /// callback is not fired again. The cycle index moves on only when the
    /// finished session was a break.
    pub fn advance_to_next(&mut self) -> Option<Event> {
        if self.state.status != TimerStatus::Completed {
            return None;
        }
        self.cancel_tick();
        let from = self.state.session_type;
        let to = self.next_session_type();
        if from.is_break() {
            self.state.current_session_index += 1;
        }
        self.enter_session(to);
        debug!(%from, %to, index = self.state.current_session_index, "advanced to next session");
        Some(Event::SessionAdvanced {
            session_type: to,
            session_index: self.state.current_session_index,
            duration_secs: self.session_secs,
            at: Utc::now(),
        })
    }

    /// Merge `patch` into the config.
    ///
    /// While idle the countdown is recomputed for the current session type;
    /// otherwise the in-flight countdown is left alone and the new durations
    /// apply from the next reset, completion or skip.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] without touching any state if the merged
    /// config is invalid.
    pub fn update_config(&mut self, patch: &TimerConfigPatch) -> Result<Event, ValidationError> {
        let config = self.state.config.merged(patch)?;
        self.state.config = config;
        let applied_to_countdown = self.state.status == TimerStatus::Idle;
        if applied_to_countdown {
            let session_type = self.state.session_type;
            self.enter_session(session_type);
        }
        debug!(?config, applied_to_countdown, "timer config updated");
        Ok(Event::ConfigUpdated {
            config,
            applied_to_countdown,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_session(&mut self) -> Event {
        self.cancel_tick();
        self.state.status = TimerStatus::Completed;
        self.state.seconds_remaining = 0;
        let session_type = self.state.session_type;
        if session_type == SessionType::Focus {
            self.state.total_focus_sessions_completed += 1;
            self.fire_focus_complete();
        }
        info!(
            session = %session_type,
            total_focus = self.state.total_focus_sessions_completed,
            "session completed"
        );
        self.notifier.notify(session_type.label());
        Event::TimerCompleted {
            session_type,
            session_index: self.state.current_session_index,
            duration_secs: self.session_secs,
            total_focus_sessions: self.state.total_focus_sessions_completed,
            at: Utc::now(),
        }
    }

    fn fire_focus_complete(&mut self) {
        let total = self.state.total_focus_sessions_completed;
        if let Some(callback) = self.on_focus_complete.as_mut() {
            callback(total);
        }
    }

    fn enter_session(&mut self, session_type: SessionType) {
        self.state.session_type = session_type;
        self.state.status = TimerStatus::Idle;
        self.session_secs = self.state.config.duration_secs(session_type);
        self.state.seconds_remaining = self.session_secs;
    }

    fn schedule_tick(&mut self) {
        self.next_token = self.next_token.wrapping_add(1);
        self.pending_tick = Some(TickToken(self.next_token));
    }

    fn cancel_tick(&mut self) {
        if let Some(token) = self.pending_tick.take() {
            trace!(?token, "tick cancelled");
        }
    }
}
