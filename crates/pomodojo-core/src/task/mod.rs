//! Task ledger: todos that collect focus-session credit.
//!
//! Each task carries an estimate and a count of completed units (one unit is
//! one focus session). At most one task is *active*; the application credits
//! it whenever the timer reports a finished focus session.
//!
//! The active pointer is a plain id, never a borrow. The ledger keeps it
//! valid: deleting or completing the active task clears it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{NotFoundError, Result, ValidationError};

/// Opaque task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(Uuid);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        })
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::invalid(
                "priority",
                format!("expected low, medium or high, got '{other}'"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub text: String,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
    /// Planned number of focus sessions, at least 1.
    pub estimated_units: u32,
    /// Focus sessions credited so far. May exceed the estimate.
    #[serde(default)]
    pub completed_units: u32,
}

impl Task {
    /// Units still expected; zero once the estimate is met or overrun.
    pub fn remaining_units(&self) -> u32 {
        self.estimated_units.saturating_sub(self.completed_units)
    }

    pub fn is_overrun(&self) -> bool {
        self.completed_units > self.estimated_units
    }
}

/// Partial update for a [`Task`]. `None` fields are left as they are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub estimated_units: Option<u32>,
    #[serde(default)]
    pub completed_units: Option<u32>,
}

/// Serializable ledger contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskLedgerState {
    /// Insertion order.
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub active_task_id: Option<TaskId>,
}

/// Ordered task collection with an active-task pointer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskLedger {
    state: TaskLedgerState,
}

fn validate_text(text: &str) -> std::result::Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
    }
    Ok(trimmed.to_string())
}

fn validate_estimate(units: u32) -> std::result::Result<u32, ValidationError> {
    if units == 0 {
        return Err(ValidationError::invalid(
            "estimated_units",
            "must be at least 1",
        ));
    }
    Ok(units)
}

impl TaskLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from persisted state, dropping an active id that no
    /// longer points at an existing task.
    pub fn from_state(mut state: TaskLedgerState) -> Self {
        if let Some(id) = state.active_task_id {
            if !state.tasks.iter().any(|t| t.id == id) {
                warn!(%id, "discarding dangling active task id");
                state.active_task_id = None;
            }
        }
        Self { state }
    }

    pub fn state(&self) -> &TaskLedgerState {
        &self.state
    }

    pub fn tasks(&self) -> &[Task] {
        &self.state.tasks
    }

    pub fn len(&self) -> usize {
        self.state.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.state.tasks.iter().find(|t| t.id == id)
    }

    fn get_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| NotFoundError::Task(id).into())
    }

    /// Append a new task and return its id.
    ///
    /// # Errors
    /// `ValidationError` if `text` is blank or `estimated_units` is zero.
    pub fn add(&mut self, text: &str, priority: Priority, estimated_units: u32) -> Result<TaskId> {
        let text = validate_text(text)?;
        let estimated_units = validate_estimate(estimated_units)?;
        let task = Task {
            id: TaskId::new(),
            text,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
            priority,
            estimated_units,
            completed_units: 0,
        };
        let id = task.id;
        debug!(%id, text = %task.text, "task added");
        self.state.tasks.push(task);
        Ok(id)
    }

    /// Apply `patch` to a task.
    ///
    /// Marking an open task completed stamps `completed_at`, gives full credit
    /// (`completed_units = estimated_units`) if no units were tracked yet, and
    /// releases the active pointer. Re-opening clears `completed_at`.
    ///
    /// # Errors
    /// `NotFoundError` for an unknown id; `ValidationError` for blank text or
    /// a zero estimate. Nothing is modified on error.
    pub fn update(&mut self, id: TaskId, patch: TaskPatch) -> Result<&Task> {
        if self.get(id).is_none() {
            return Err(NotFoundError::Task(id).into());
        }
        let text = patch.text.as_deref().map(validate_text).transpose()?;
        let estimated_units = patch.estimated_units.map(validate_estimate).transpose()?;

        let task = self.get_mut(id)?;
        let was_completed = task.completed;
        let units_before = task.completed_units;
        let estimate_before = task.estimated_units;

        if let Some(text) = text {
            task.text = text;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(units) = estimated_units {
            task.estimated_units = units;
        }
        if let Some(units) = patch.completed_units {
            task.completed_units = units;
        }

        let mut just_completed = false;
        match patch.completed {
            Some(true) if !was_completed => {
                task.completed = true;
                task.completed_at = Some(Utc::now());
                if units_before == 0 {
                    task.completed_units = estimate_before;
                }
                just_completed = true;
            }
            Some(false) if was_completed => {
                task.completed = false;
                task.completed_at = None;
            }
            _ => {}
        }

        if just_completed {
            self.release_active(id);
        }
        debug!(%id, just_completed, "task updated");
        self.get(id).ok_or_else(|| NotFoundError::Task(id).into())
    }

    /// Complete a task with full credit regardless of tracked units.
    ///
    /// # Errors
    /// `NotFoundError` for an unknown id.
    pub fn mark_completed(&mut self, id: TaskId) -> Result<&Task> {
        let task = self.get_mut(id)?;
        task.completed = true;
        task.completed_units = task.estimated_units;
        task.completed_at = Some(Utc::now());
        self.release_active(id);
        debug!(%id, "task marked completed");
        self.get(id).ok_or_else(|| NotFoundError::Task(id).into())
    }

    /// Remove a task. Unknown ids are ignored.
    pub fn delete(&mut self, id: TaskId) -> Option<Task> {
        let index = self.state.tasks.iter().position(|t| t.id == id)?;
        let removed = self.state.tasks.remove(index);
        self.release_active(id);
        debug!(%id, "task deleted");
        Some(removed)
    }

    /// Point the active-task marker at `id`, or clear it with `None`.
    ///
    /// # Errors
    /// `NotFoundError` if `id` is given but not in the ledger.
    pub fn set_active(&mut self, id: Option<TaskId>) -> Result<()> {
        if let Some(id) = id {
            if self.get(id).is_none() {
                return Err(NotFoundError::Task(id).into());
            }
        }
        self.state.active_task_id = id;
        debug!(active = ?id, "active task changed");
        Ok(())
    }

    /// Activate `id`, or deactivate it if it is already the active task.
    /// Returns the new active id.
    pub fn toggle_active(&mut self, id: TaskId) -> Result<Option<TaskId>> {
        let next = if self.state.active_task_id == Some(id) {
            None
        } else {
            Some(id)
        };
        self.set_active(next)?;
        Ok(next)
    }

    /// Credit one focus session to a task. Not capped at the estimate.
    ///
    /// # Errors
    /// `NotFoundError` for an unknown id.
    pub fn increment_completed_units(&mut self, id: TaskId) -> Result<u32> {
        let task = self.get_mut(id)?;
        task.completed_units = task.completed_units.saturating_add(1);
        let units = task.completed_units;
        debug!(%id, units, "task credited with focus unit");
        Ok(units)
    }

    pub fn active_task_id(&self) -> Option<TaskId> {
        self.state.active_task_id
    }

    pub fn active(&self) -> Option<&Task> {
        self.state.active_task_id.and_then(|id| self.get(id))
    }

    pub fn pending(&self) -> Vec<&Task> {
        self.state.tasks.iter().filter(|t| !t.completed).collect()
    }

    pub fn completed(&self) -> Vec<&Task> {
        self.state.tasks.iter().filter(|t| t.completed).collect()
    }

    fn release_active(&mut self, id: TaskId) {
        if self.state.active_task_id == Some(id) {
            self.state.active_task_id = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    fn ledger_with(texts: &[&str]) -> (TaskLedger, Vec<TaskId>) {
        let mut ledger = TaskLedger::new();
        let ids = texts
            .iter()
            .map(|t| ledger.add(t, Priority::Medium, 2).unwrap())
            .collect();
        (ledger, ids)
    }

    #[test]
    fn add_trims_and_defaults() {
        let mut ledger = TaskLedger::new();
        let id = ledger.add("  Write report  ", Priority::High, 3).unwrap();
        let task = ledger.get(id).unwrap();
        assert_eq!(task.text, "Write report");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.estimated_units, 3);
        assert_eq!(task.completed_units, 0);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn add_rejects_blank_text() {
        let mut ledger = TaskLedger::new();
        let err = ledger.add("   ", Priority::Low, 1).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::EmptyText)
        ));
        assert!(ledger.is_empty());
    }

    #[test]
    fn add_rejects_zero_estimate() {
        let mut ledger = TaskLedger::new();
        assert!(ledger.add("Something", Priority::Low, 0).is_err());
        assert!(ledger.is_empty());
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let mut ledger = TaskLedger::new();
        let err = ledger
            .update(TaskId::new(), TaskPatch::default())
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn update_unknown_id_wins_over_invalid_patch() {
        let (mut ledger, _) = ledger_with(&["A"]);
        let before = ledger.clone();
        let patch = TaskPatch {
            text: Some("  ".into()),
            estimated_units: Some(0),
            ..Default::default()
        };
        let err = ledger.update(TaskId::new(), patch).unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
        assert_eq!(ledger, before);
    }

    #[test]
    fn update_with_blank_text_changes_nothing() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        let before = ledger.clone();
        let patch = TaskPatch {
            text: Some(" ".into()),
            priority: Some(Priority::High),
            ..Default::default()
        };
        assert!(ledger.update(ids[0], patch).is_err());
        assert_eq!(ledger, before);
    }

    #[test]
    fn completing_untracked_task_gives_full_credit() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        let task = ledger.update(ids[0], patch).unwrap();
        assert!(task.completed);
        assert!(task.completed_at.is_some());
        assert_eq!(task.completed_units, 2);
    }

    #[test]
    fn completing_tracked_task_keeps_units() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        ledger.increment_completed_units(ids[0]).unwrap();
        let patch = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        let task = ledger.update(ids[0], patch).unwrap();
        assert_eq!(task.completed_units, 1);
    }

    #[test]
    fn completing_active_task_clears_active() {
        let (mut ledger, ids) = ledger_with(&["A", "B"]);
        ledger.set_active(Some(ids[0])).unwrap();
        ledger
            .update(
                ids[0],
                TaskPatch {
                    completed: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(ledger.active().is_none());
    }

    #[test]
    fn reopening_clears_completed_at() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        let done = TaskPatch {
            completed: Some(true),
            ..Default::default()
        };
        ledger.update(ids[0], done).unwrap();
        let reopen = TaskPatch {
            completed: Some(false),
            ..Default::default()
        };
        let task = ledger.update(ids[0], reopen).unwrap();
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert_eq!(task.completed_units, 2);
    }

    #[test]
    fn mark_completed_overrides_units() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        for _ in 0..5 {
            ledger.increment_completed_units(ids[0]).unwrap();
        }
        ledger.set_active(Some(ids[0])).unwrap();
        let task = ledger.mark_completed(ids[0]).unwrap();
        assert_eq!(task.completed_units, 2);
        assert!(ledger.active_task_id().is_none());
    }

    #[test]
    fn delete_active_clears_pointer() {
        let (mut ledger, ids) = ledger_with(&["A", "B"]);
        ledger.set_active(Some(ids[1])).unwrap();
        assert!(ledger.delete(ids[1]).is_some());
        assert!(ledger.active_task_id().is_none());
        assert!(ledger.active().is_none());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn delete_unknown_is_noop() {
        let (mut ledger, _) = ledger_with(&["A"]);
        let before = ledger.clone();
        assert!(ledger.delete(TaskId::new()).is_none());
        assert_eq!(ledger, before);
    }

    #[test]
    fn set_active_rejects_unknown() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        ledger.set_active(Some(ids[0])).unwrap();
        assert!(ledger.set_active(Some(TaskId::new())).is_err());
        assert_eq!(ledger.active_task_id(), Some(ids[0]));
        ledger.set_active(None).unwrap();
        assert!(ledger.active().is_none());
    }

    #[test]
    fn toggle_active_turns_off_on_second_call() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        assert_eq!(ledger.toggle_active(ids[0]).unwrap(), Some(ids[0]));
        assert_eq!(ledger.toggle_active(ids[0]).unwrap(), None);
    }

    #[test]
    fn increment_is_uncapped() {
        let (mut ledger, ids) = ledger_with(&["A"]);
        for _ in 0..3 {
            ledger.increment_completed_units(ids[0]).unwrap();
        }
        let task = ledger.get(ids[0]).unwrap();
        assert_eq!(task.completed_units, 3);
        assert!(task.is_overrun());
        assert_eq!(task.remaining_units(), 0);
        assert!(ledger.increment_completed_units(TaskId::new()).is_err());
    }

    #[test]
    fn pending_and_completed_keep_insertion_order() {
        let (mut ledger, ids) = ledger_with(&["A", "B", "C", "D"]);
        ledger.mark_completed(ids[1]).unwrap();
        ledger.mark_completed(ids[3]).unwrap();
        let pending: Vec<_> = ledger.pending().iter().map(|t| t.text.as_str()).collect();
        let completed: Vec<_> = ledger.completed().iter().map(|t| t.text.as_str()).collect();
        assert_eq!(pending, vec!["A", "C"]);
        assert_eq!(completed, vec!["B", "D"]);
    }

    #[test]
    fn from_state_drops_dangling_active() {
        let state = TaskLedgerState {
            tasks: vec![],
            active_task_id: Some(TaskId::new()),
        };
        let ledger = TaskLedger::from_state(state);
        assert!(ledger.active_task_id().is_none());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }
}
