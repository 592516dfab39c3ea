//! Per-day session counts.
//!
//! Only what the timer already knows is recorded: how many focus sessions
//! were finished and how long the sessions lasted.

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::events::Event;
use crate::timer::SessionType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    /// Focus sessions finished, including skipped ones.
    pub completed_sessions: u32,
    pub focus_secs: u64,
    /// Focus and break time together.
    pub total_secs: u64,
}

impl DailyStats {
    fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            ..Default::default()
        }
    }

    pub fn focus_minutes(&self) -> u64 {
        self.focus_secs / 60
    }

    pub fn total_minutes(&self) -> u64 {
        self.total_secs / 60
    }
}

/// All-time roll-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub days: usize,
    pub completed_sessions: u64,
    pub focus_secs: u64,
    pub total_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsLog {
    #[serde(default)]
    days: BTreeMap<NaiveDate, DailyStats>,
}

impl StatsLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one session's worth of time to the day `at` falls on (local time).
    pub fn record(
        &mut self,
        session_type: SessionType,
        elapsed_secs: u64,
        counts_as_completed: bool,
        at: DateTime<Utc>,
    ) {
        let date = at.with_timezone(&Local).date_naive();
        let day = self
            .days
            .entry(date)
            .or_insert_with(|| DailyStats::empty(date));
        if session_type == SessionType::Focus {
            day.focus_secs += elapsed_secs;
            if counts_as_completed {
                day.completed_sessions += 1;
            }
        }
        day.total_secs += elapsed_secs;
    }

    /// Update from a timer event. Returns whether anything was recorded.
    pub fn record_event(&mut self, event: &Event) -> bool {
        match event {
            Event::TimerCompleted {
                session_type,
                duration_secs,
                at,
                ..
            } => {
                self.record(*session_type, *duration_secs, true, *at);
                true
            }
            Event::TimerSkipped {
                from,
                elapsed_secs,
                at,
                ..
            } => {
                self.record(*from, *elapsed_secs, *from == SessionType::Focus, *at);
                true
            }
            _ => false,
        }
    }

    pub fn day(&self, date: NaiveDate) -> DailyStats {
        self.days
            .get(&date)
            .cloned()
            .unwrap_or_else(|| DailyStats::empty(date))
    }

    pub fn today(&self) -> DailyStats {
        self.day(Local::now().date_naive())
    }

    pub fn days(&self) -> impl Iterator<Item = &DailyStats> {
        self.days.values()
    }

    pub fn all_time(&self) -> Summary {
        self.days.values().fold(
            Summary {
                days: self.days.len(),
                ..Default::default()
            },
            |mut acc, day| {
                acc.completed_sessions += u64::from(day.completed_sessions);
                acc.focus_secs += day.focus_secs;
                acc.total_secs += day.total_secs;
                acc
            },
        )
    }
}
