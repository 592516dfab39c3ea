//! Keyboard shortcuts.
//!
//! Raw keys are translated into the same [`Intent`]s the command surface
//! uses, so a key press and an explicit command go through one code path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::error::ValidationError;
use crate::storage::ShortcutsConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Pause when running, start otherwise.
    StartPause,
    Reset,
    Skip,
    /// "Next Session" after a completed one.
    Next,
    /// Open the settings view; handled by the presentation layer.
    Settings,
}

impl Intent {
    pub fn name(self) -> &'static str {
        match self {
            Intent::StartPause => "start_pause",
            Intent::Reset => "reset",
            Intent::Skip => "skip",
            Intent::Next => "next",
            Intent::Settings => "settings",
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Intent {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start_pause" => Ok(Intent::StartPause),
            "reset" => Ok(Intent::Reset),
            "skip" => Ok(Intent::Skip),
            "next" => Ok(Intent::Next),
            "settings" => Ok(Intent::Settings),
            other => Err(ValidationError::invalid(
                "intent",
                format!("expected start_pause, reset, skip, next or settings, got '{other}'"),
            )),
        }
    }
}

/// Key → intent table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keymap {
    bindings: BTreeMap<char, Intent>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = [
            (' ', Intent::StartPause),
            ('r', Intent::Reset),
            ('s', Intent::Skip),
            ('n', Intent::Next),
            ('t', Intent::Settings),
        ]
        .into_iter()
        .collect();
        Self { bindings }
    }
}

impl Keymap {
    /// Defaults overlaid with the user's bindings. Entries that are not a
    /// single character or name an unknown intent are skipped with a warning.
    pub fn from_config(shortcuts: &ShortcutsConfig) -> Self {
        let mut keymap = Self::default();
        for (key, intent) in &shortcuts.bindings {
            let Some(ch) = parse_key(key) else {
                warn!(key, "ignoring shortcut: key must be a single character or \"space\"");
                continue;
            };
            match intent.parse::<Intent>() {
                Ok(intent) => keymap.bind(ch, intent),
                Err(e) => warn!(key, error = %e, "ignoring shortcut"),
            }
        }
        keymap
    }

    /// Bind `key` to `intent`, dropping any other key bound to the same intent.
    pub fn bind(&mut self, key: char, intent: Intent) {
        self.bindings.retain(|_, bound| *bound != intent);
        self.bindings.insert(key.to_ascii_lowercase(), intent);
    }

    /// Intent for a key press. Letters match case-insensitively.
    pub fn resolve(&self, key: char) -> Option<Intent> {
        self.bindings.get(&key.to_ascii_lowercase()).copied()
    }

    pub fn key_for(&self, intent: Intent) -> Option<char> {
        self.bindings
            .iter()
            .find(|(_, bound)| **bound == intent)
            .map(|(key, _)| *key)
    }

    pub fn bindings(&self) -> impl Iterator<Item = (char, Intent)> + '_ {
        self.bindings.iter().map(|(k, i)| (*k, *i))
    }
}

fn parse_key(key: &str) -> Option<char> {
    if key.eq_ignore_ascii_case("space") {
        return Some(' ');
    }
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Some(ch),
        _ => None,
    }
}

/// Display name for a bound key.
pub fn key_label(key: char) -> String {
    if key == ' ' {
        "Space".to_string()
    } else {
        key.to_ascii_uppercase().to_string()
    }
}
