use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{SessionType, TimerConfig};

/// Every state change in the timer produces an Event.
/// The presentation layer renders them; the application records statistics from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        session_type: SessionType,
        session_index: u32,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        session_type: SessionType,
        session_index: u32,
        /// Full length of the session that just ran out.
        duration_secs: u64,
        total_focus_sessions: u32,
        at: DateTime<Utc>,
    },
    TimerSkipped {
        from: SessionType,
        to: SessionType,
        /// Seconds actually spent in the skipped session.
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    TimerReset {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    SessionAdvanced {
        session_type: SessionType,
        session_index: u32,
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    ConfigUpdated {
        config: TimerConfig,
        /// False when a session was in flight and keeps its countdown.
        applied_to_countdown: bool,
        at: DateTime<Utc>,
    },
}
