use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionType {
    Focus,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Focus)
    }

    /// Human-readable label, used for notifications and the countdown display.
    pub fn label(self) -> &'static str {
        match self {
            SessionType::Focus => "Focus",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }
}

impl std::fmt::Display for SessionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Durations and cycle length for the timer.
///
/// Treated as an immutable snapshot: updates go through [`TimerConfig::merged`],
/// which builds and validates a whole new value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfig {
    #[serde(default = "default_focus_minutes")]
    pub focus_minutes: u32,
    #[serde(default = "default_short_break_minutes")]
    pub short_break_minutes: u32,
    #[serde(default = "default_long_break_minutes")]
    pub long_break_minutes: u32,
    #[serde(default = "default_sessions_until_long_break")]
    pub sessions_until_long_break: u32,
}

/// Partial update for [`TimerConfig`]. `None` fields keep their current value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerConfigPatch {
    #[serde(default)]
    pub focus_minutes: Option<u32>,
    #[serde(default)]
    pub short_break_minutes: Option<u32>,
    #[serde(default)]
    pub long_break_minutes: Option<u32>,
    #[serde(default)]
    pub sessions_until_long_break: Option<u32>,
}

impl TimerConfigPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn default_focus_minutes() -> u32 {
    25
}
fn default_short_break_minutes() -> u32 {
    5
}
fn default_long_break_minutes() -> u32 {
    15
}
fn default_sessions_until_long_break() -> u32 {
    4
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            focus_minutes: default_focus_minutes(),
            short_break_minutes: default_short_break_minutes(),
            long_break_minutes: default_long_break_minutes(),
            sessions_until_long_break: default_sessions_until_long_break(),
        }
    }
}

impl TimerConfig {
    /// Build a validated config.
    ///
    /// # Errors
    /// Returns a [`ValidationError`] if any duration is zero or the cycle is
    /// shorter than two sessions.
    pub fn new(
        focus_minutes: u32,
        short_break_minutes: u32,
        long_break_minutes: u32,
        sessions_until_long_break: u32,
    ) -> Result<Self, ValidationError> {
        let cfg = Self {
            focus_minutes,
            short_break_minutes,
            long_break_minutes,
            sessions_until_long_break,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let durations = [
            ("focus_minutes", self.focus_minutes),
            ("short_break_minutes", self.short_break_minutes),
            ("long_break_minutes", self.long_break_minutes),
        ];
        for (field, minutes) in durations {
            if minutes == 0 {
                return Err(ValidationError::invalid(field, "must be greater than 0"));
            }
        }
        if self.sessions_until_long_break < 2 {
            return Err(ValidationError::invalid(
                "sessions_until_long_break",
                "must be at least 2",
            ));
        }
        Ok(())
    }

    /// Apply `patch` on top of this config and validate the result.
    /// `self` is left untouched either way.
    pub fn merged(&self, patch: &TimerConfigPatch) -> Result<Self, ValidationError> {
        let cfg = Self {
            focus_minutes: patch.focus_minutes.unwrap_or(self.focus_minutes),
            short_break_minutes: patch.short_break_minutes.unwrap_or(self.short_break_minutes),
            long_break_minutes: patch.long_break_minutes.unwrap_or(self.long_break_minutes),
            sessions_until_long_break: patch
                .sessions_until_long_break
                .unwrap_or(self.sessions_until_long_break),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn minutes_for(&self, session_type: SessionType) -> u32 {
        match session_type {
            SessionType::Focus => self.focus_minutes,
            SessionType::ShortBreak => self.short_break_minutes,
            SessionType::LongBreak => self.long_break_minutes,
        }
    }

    /// Session length in seconds.
    ///
    /// Uses saturating arithmetic so absurd minute values cannot overflow.
    pub fn duration_secs(&self, session_type: SessionType) -> u64 {
        u64::from(self.minutes_for(session_type)).saturating_mul(60)
    }

    /// Session that follows `current`, given the 1-based index of the current
    /// focus cycle.
    pub fn next_session_type(&self, current: SessionType, session_index: u32) -> SessionType {
        match current {
            SessionType::Focus => {
                if self.sessions_until_long_break != 0
                    && session_index % self.sessions_until_long_break == 0
                {
                    SessionType::LongBreak
                } else {
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Focus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn default_config_is_classic_pomodoro() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.focus_minutes, 25);
        assert_eq!(cfg.short_break_minutes, 5);
        assert_eq!(cfg.long_break_minutes, 15);
        assert_eq!(cfg.sessions_until_long_break, 4);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn durations_in_seconds() {
        let cfg = TimerConfig::default();
        assert_eq!(cfg.duration_secs(SessionType::Focus), 1500);
        assert_eq!(cfg.duration_secs(SessionType::ShortBreak), 300);
        assert_eq!(cfg.duration_secs(SessionType::LongBreak), 900);
    }

    #[test]
    fn rejects_zero_durations() {
        assert!(TimerConfig::new(0, 5, 15, 4).is_err());
        assert!(TimerConfig::new(25, 0, 15, 4).is_err());
        assert!(TimerConfig::new(25, 5, 0, 4).is_err());
    }

    #[test]
    fn rejects_cycle_shorter_than_two() {
        let err = TimerConfig::new(25, 5, 15, 1).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidValue {
                field: "sessions_until_long_break".into(),
                message: "must be at least 2".into(),
            }
        );
    }

    #[test]
    fn merged_keeps_unset_fields() {
        let cfg = TimerConfig::default();
        let patch = TimerConfigPatch {
            focus_minutes: Some(50),
            ..Default::default()
        };
        let merged = cfg.merged(&patch).unwrap();
        assert_eq!(merged.focus_minutes, 50);
        assert_eq!(merged.short_break_minutes, 5);
        assert_eq!(cfg.focus_minutes, 25);
    }

    #[test]
    fn merged_rejects_invalid_result() {
        let patch = TimerConfigPatch {
            long_break_minutes: Some(0),
            ..Default::default()
        };
        assert!(TimerConfig::default().merged(&patch).is_err());
    }

    #[test]
    fn rotation_with_four_session_cycle() {
        let cfg = TimerConfig::default();
        for index in 1..=3 {
            assert_eq!(
                cfg.next_session_type(SessionType::Focus, index),
                SessionType::ShortBreak
            );
        }
        assert_eq!(
            cfg.next_session_type(SessionType::Focus, 4),
            SessionType::LongBreak
        );
        assert_eq!(
            cfg.next_session_type(SessionType::ShortBreak, 4),
            SessionType::Focus
        );
        assert_eq!(
            cfg.next_session_type(SessionType::LongBreak, 8),
            SessionType::Focus
        );
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: TimerConfig = serde_json::from_str(r#"{"focus_minutes": 40}"#).unwrap();
        assert_eq!(cfg.focus_minutes, 40);
        assert_eq!(cfg.sessions_until_long_break, 4);
    }

    proptest! {
        #[test]
        fn long_break_exactly_on_cycle_boundary(n in 2u32..12, index in 1u32..200) {
            let cfg = TimerConfig::new(25, 5, 15, n).unwrap();
            let next = cfg.next_session_type(SessionType::Focus, index);
            prop_assert_eq!(next == SessionType::LongBreak, index % n == 0);
        }

        #[test]
        fn valid_configs_have_positive_durations(
            f in 1u32..240, s in 1u32..60, l in 1u32..120, n in 2u32..10
        ) {
            let cfg = TimerConfig::new(f, s, l, n).unwrap();
            prop_assert_eq!(cfg.duration_secs(SessionType::Focus), u64::from(f) * 60);
            prop_assert!(cfg.duration_secs(SessionType::ShortBreak) > 0);
            prop_assert!(cfg.duration_secs(SessionType::LongBreak) > 0);
        }
    }
}
