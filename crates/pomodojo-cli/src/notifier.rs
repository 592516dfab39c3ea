//! Terminal rendition of "session complete".

use pomodojo_core::storage::NotificationsConfig;
use pomodojo_core::Notifier;
use std::io::Write;

pub struct TerminalNotifier {
    enabled: bool,
    sound: bool,
}

impl TerminalNotifier {
    pub fn from_config(config: &NotificationsConfig) -> Self {
        Self {
            enabled: config.enabled,
            sound: config.sound,
        }
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, session_label: &str) {
        if !self.enabled {
            return;
        }
        let bell = if self.sound { "\x07" } else { "" };
        let mut err = std::io::stderr().lock();
        // A closed stderr is not worth failing the session over.
        let _ = writeln!(
            err,
            "\n{bell}{session_label} session completed! Ready for the next session?"
        );
        let _ = err.flush();
    }
}
