use clap::Subcommand;

use super::open_app;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's statistics
    Today,
    /// All-time statistics
    All,
    /// Per-day breakdown
    Days,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let (app, _) = open_app()?;
    let stats = app.stats();

    match action {
        StatsAction::Today => {
            println!("{}", serde_json::to_string_pretty(&stats.today())?);
        }
        StatsAction::All => {
            println!("{}", serde_json::to_string_pretty(&stats.all_time())?);
        }
        StatsAction::Days => {
            let days: Vec<_> = stats.days().collect();
            println!("{}", serde_json::to_string_pretty(&days)?);
        }
    }
    Ok(())
}
