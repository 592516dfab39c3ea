pub mod config;
pub mod stats;
pub mod task;
pub mod timer;

use pomodojo_core::{Config, Database, Pomodojo};

use crate::notifier::TerminalNotifier;

/// Load the application config and open a session over the configured database.
pub fn open_app() -> Result<(Pomodojo<Database>, Config), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = match &config.storage.database {
        Some(path) => Database::open_at(path.clone())?,
        None => Database::open()?,
    };
    let notifier = TerminalNotifier::from_config(&config.notifications);
    let app = Pomodojo::open(db, notifier)?;
    Ok((app, config))
}
