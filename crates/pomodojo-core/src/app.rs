//! Application session: one timer, one task ledger, one store.
//!
//! [`Pomodojo`] is what a front end talks to. It wires the timer's
//! focus-complete callback to the task ledger (the active task gets one unit
//! per finished focus session), records statistics from timer events, and
//! writes everything that outlives the process back to the key-value store.
//!
//! Persistence never rolls back a transition. When a save fails the method
//! returns the storage error, the in-memory state keeps the change, and the
//! next successful save (or [`Pomodojo::flush`]) writes it out.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::events::Event;
use crate::keymap::Intent;
use crate::notify::Notifier;
use crate::stats::StatsLog;
use crate::storage::{KeyValueStore, STATS_KEY, TASKS_KEY, TIMER_CONFIG_KEY};
use crate::task::{Priority, Task, TaskId, TaskLedger, TaskLedgerState, TaskPatch};
use crate::timer::{
    TickToken, TimerConfig, TimerConfigPatch, TimerEngine, TimerSnapshot, TimerState, TimerStatus,
};

pub struct Pomodojo<S: KeyValueStore> {
    store: S,
    engine: TimerEngine,
    ledger: Rc<RefCell<TaskLedger>>,
    ledger_dirty: Rc<Cell<bool>>,
    stats: StatsLog,
    stats_dirty: bool,
    config_dirty: bool,
}

impl<S: KeyValueStore> std::fmt::Debug for Pomodojo<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pomodojo")
            .field("engine", &self.engine)
            .field("tasks", &self.ledger.borrow().len())
            .finish_non_exhaustive()
    }
}

impl<S: KeyValueStore> Pomodojo<S> {
    /// Restore config, tasks and statistics from `store` and build an idle
    /// timer at the first focus session.
    ///
    /// # Errors
    /// Returns a storage error if the store cannot be read.
    pub fn open(store: S, notifier: impl Notifier + 'static) -> Result<Self> {
        let mut config: TimerConfig = store.load(TIMER_CONFIG_KEY)?;
        if let Err(e) = config.validate() {
            warn!(error = %e, "stored timer config is invalid, using defaults");
            config = TimerConfig::default();
        }
        let ledger_state: TaskLedgerState = store.load(TASKS_KEY)?;
        let stats: StatsLog = store.load(STATS_KEY)?;

        let ledger = Rc::new(RefCell::new(TaskLedger::from_state(ledger_state)));
        let ledger_dirty = Rc::new(Cell::new(false));

        let credit = Rc::clone(&ledger);
        let dirty = Rc::clone(&ledger_dirty);
        let engine = TimerEngine::new(config)?
            .with_notifier(notifier)
            .on_focus_complete(move |total| {
                let mut ledger = credit.borrow_mut();
                let Some(id) = ledger.active().map(|t| t.id) else {
                    debug!(total, "focus session finished with no active task");
                    return;
                };
                match ledger.increment_completed_units(id) {
                    Ok(units) => {
                        dirty.set(true);
                        info!(%id, units, total, "credited focus session to active task");
                    }
                    Err(e) => warn!(%id, error = %e, "could not credit active task"),
                }
            });

        Ok(Self {
            store,
            engine,
            ledger,
            ledger_dirty,
            stats,
            stats_dirty: false,
            config_dirty: false,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ── Timer surface ────────────────────────────────────────────────

    pub fn timer(&self) -> &TimerState {
        self.engine.state()
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        self.engine.snapshot()
    }

    pub fn pending_tick(&self) -> Option<TickToken> {
        self.engine.pending_tick()
    }

    pub fn start(&mut self) -> Result<Option<Event>> {
        let event = self.engine.start();
        self.after_transition(event)
    }

    pub fn pause(&mut self) -> Result<Option<Event>> {
        let event = self.engine.pause();
        self.after_transition(event)
    }

    pub fn reset(&mut self) -> Result<Option<Event>> {
        let event = self.engine.reset();
        self.after_transition(event)
    }

    pub fn skip(&mut self) -> Result<Option<Event>> {
        let event = self.engine.skip();
        self.after_transition(event)
    }

    pub fn advance_to_next(&mut self) -> Result<Option<Event>> {
        let event = self.engine.advance_to_next();
        self.after_transition(event)
    }

    pub fn tick(&mut self, token: TickToken) -> Result<Option<Event>> {
        let event = self.engine.tick(token);
        self.after_transition(event)
    }

    pub fn tick_pending(&mut self) -> Result<Option<Event>> {
        let event = self.engine.tick_pending();
        self.after_transition(event)
    }

    /// Merge `patch` into the timer config and persist it.
    ///
    /// # Errors
    /// `ValidationError` (nothing changed) or a storage error (config applied
    /// in memory, saved by the next [`Pomodojo::flush`]).
    pub fn update_config(&mut self, patch: &TimerConfigPatch) -> Result<Event> {
        let event = self.engine.update_config(patch)?;
        self.save_config()?;
        Ok(event)
    }

    /// Run an input intent. `Settings` belongs to the presentation layer and
    /// is a no-op here.
    pub fn dispatch(&mut self, intent: Intent) -> Result<Option<Event>> {
        match intent {
            Intent::StartPause => {
                if self.engine.status() == TimerStatus::Running {
                    self.pause()
                } else {
                    self.start()
                }
            }
            Intent::Reset => self.reset(),
            Intent::Skip => self.skip(),
            Intent::Next => self.advance_to_next(),
            Intent::Settings => Ok(None),
        }
    }

    // ── Task surface ─────────────────────────────────────────────────

    pub fn ledger(&self) -> Ref<'_, TaskLedger> {
        self.ledger.borrow()
    }

    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.ledger.borrow().get(id).cloned()
    }

    pub fn active_task(&self) -> Option<Task> {
        self.ledger.borrow().active().cloned()
    }

    pub fn pending_tasks(&self) -> Vec<Task> {
        self.ledger.borrow().pending().into_iter().cloned().collect()
    }

    pub fn completed_tasks(&self) -> Vec<Task> {
        self.ledger.borrow().completed().into_iter().cloned().collect()
    }

    pub fn add_task(
        &mut self,
        text: &str,
        priority: Priority,
        estimated_units: u32,
    ) -> Result<TaskId> {
        let id = self
            .ledger
            .borrow_mut()
            .add(text, priority, estimated_units)?;
        self.save_ledger()?;
        Ok(id)
    }

    pub fn update_task(&mut self, id: TaskId, patch: TaskPatch) -> Result<Task> {
        let task = self.ledger.borrow_mut().update(id, patch)?.clone();
        self.save_ledger()?;
        Ok(task)
    }

    pub fn complete_task(&mut self, id: TaskId) -> Result<Task> {
        let task = self.ledger.borrow_mut().mark_completed(id)?.clone();
        self.save_ledger()?;
        Ok(task)
    }

    pub fn delete_task(&mut self, id: TaskId) -> Result<Option<Task>> {
        let removed = self.ledger.borrow_mut().delete(id);
        if removed.is_some() {
            self.save_ledger()?;
        }
        Ok(removed)
    }

    pub fn set_active_task(&mut self, id: Option<TaskId>) -> Result<()> {
        self.ledger.borrow_mut().set_active(id)?;
        self.save_ledger()
    }

    pub fn toggle_active_task(&mut self, id: TaskId) -> Result<Option<TaskId>> {
        let active = self.ledger.borrow_mut().toggle_active(id)?;
        self.save_ledger()?;
        Ok(active)
    }

    pub fn increment_task_units(&mut self, id: TaskId) -> Result<u32> {
        let units = self.ledger.borrow_mut().increment_completed_units(id)?;
        self.save_ledger()?;
        Ok(units)
    }

    // ── Statistics ───────────────────────────────────────────────────

    pub fn stats(&self) -> &StatsLog {
        &self.stats
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write out anything a previous failed save left behind.
    pub fn flush(&mut self) -> Result<()> {
        if self.config_dirty {
            self.save_config()?;
        }
        if self.ledger_dirty.get() {
            self.save_ledger()?;
        }
        if self.stats_dirty {
            self.save_stats()?;
        }
        Ok(())
    }

    fn after_transition(&mut self, event: Option<Event>) -> Result<Option<Event>> {
        if let Some(ref event) = event {
            if self.stats.record_event(event) {
                self.stats_dirty = true;
            }
        }
        self.flush()?;
        Ok(event)
    }

    fn save_ledger(&mut self) -> Result<()> {
        self.ledger_dirty.set(true);
        self.store.save(TASKS_KEY, self.ledger.borrow().state())?;
        self.ledger_dirty.set(false);
        Ok(())
    }

    fn save_config(&mut self) -> Result<()> {
        self.config_dirty = true;
        self.store.save(TIMER_CONFIG_KEY, self.engine.config())?;
        self.config_dirty = false;
        Ok(())
    }

    fn save_stats(&mut self) -> Result<()> {
        self.store.save(STATS_KEY, &self.stats)?;
        self.stats_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CoreError, StorageError};
    use crate::notify::NullNotifier;
    use crate::storage::MemoryStore;

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_writes: Cell<bool>,
    }

    impl KeyValueStore for FlakyStore {
        fn get_raw(&self, key: &str) -> std::result::Result<Option<String>, StorageError> {
            self.inner.get_raw(key)
        }

        fn set_raw(&self, key: &str, value: &str) -> std::result::Result<(), StorageError> {
            if self.fail_writes.get() {
                return Err(StorageError::QueryFailed("disk full".into()));
            }
            self.inner.set_raw(key, value)
        }
    }

    #[test]
    fn open_on_empty_store_uses_defaults() {
        let app = Pomodojo::open(MemoryStore::new(), NullNotifier).unwrap();
        assert_eq!(app.timer().config, TimerConfig::default());
        assert_eq!(app.timer().seconds_remaining, 1500);
        assert!(app.ledger().is_empty());
    }

    #[test]
    fn open_replaces_invalid_stored_config() {
        let store = MemoryStore::new();
        store
            .set_raw(TIMER_CONFIG_KEY, r#"{"focus_minutes": 0}"#)
            .unwrap();
        let app = Pomodojo::open(store, NullNotifier).unwrap();
        assert_eq!(app.timer().config, TimerConfig::default());
    }

    #[test]
    fn dispatch_toggles_start_pause() {
        let mut app = Pomodojo::open(MemoryStore::new(), NullNotifier).unwrap();
        app.dispatch(Intent::StartPause).unwrap();
        assert_eq!(app.timer().status, TimerStatus::Running);
        app.dispatch(Intent::StartPause).unwrap();
        assert_eq!(app.timer().status, TimerStatus::Paused);
        assert!(app.dispatch(Intent::Settings).unwrap().is_none());
    }

    #[test]
    fn failed_save_keeps_memory_state_and_retries() {
        let mut app = Pomodojo::open(FlakyStore::default(), NullNotifier).unwrap();
        app.store().fail_writes.set(true);
        let err = app.add_task("Offline", Priority::Low, 1).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(app.ledger().len(), 1);

        app.store().fail_writes.set(false);
        app.flush().unwrap();
        let saved: TaskLedgerState = app.store().load(TASKS_KEY).unwrap();
        assert_eq!(saved.tasks.len(), 1);
    }

    #[test]
    fn failed_config_save_is_retried_by_flush() {
        let mut app = Pomodojo::open(FlakyStore::default(), NullNotifier).unwrap();
        app.store().fail_writes.set(true);
        let patch = TimerConfigPatch {
            focus_minutes: Some(50),
            ..Default::default()
        };
        let err = app.update_config(&patch).unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
        assert_eq!(app.timer().config.focus_minutes, 50);
        assert!(app.flush().is_err());

        app.store().fail_writes.set(false);
        app.flush().unwrap();
        let saved: TimerConfig = app.store().load(TIMER_CONFIG_KEY).unwrap();
        assert_eq!(saved.focus_minutes, 50);

        let reopened = Pomodojo::open(&app.store().inner, NullNotifier).unwrap();
        assert_eq!(reopened.timer().config.focus_minutes, 50);
    }

    #[test]
    fn increment_task_units_credits_and_saves() {
        let store = MemoryStore::new();
        let mut app = Pomodojo::open(&store, NullNotifier).unwrap();
        let id = app.add_task("Manual credit", Priority::Low, 1).unwrap();
        assert_eq!(app.increment_task_units(id).unwrap(), 1);
        assert_eq!(app.increment_task_units(id).unwrap(), 2);

        let saved: TaskLedgerState = store.load(TASKS_KEY).unwrap();
        assert_eq!(saved.tasks[0].completed_units, 2);
        assert!(app.increment_task_units(TaskId::new()).is_err());
    }

    #[test]
    fn toggle_active_task_round_trips() {
        let mut app = Pomodojo::open(MemoryStore::new(), NullNotifier).unwrap();
        let id = app.add_task("Toggle", Priority::Medium, 1).unwrap();
        assert_eq!(app.toggle_active_task(id).unwrap(), Some(id));
        assert_eq!(app.active_task().map(|t| t.id), Some(id));
        assert_eq!(app.toggle_active_task(id).unwrap(), None);
        assert!(app.active_task().is_none());
    }

    #[test]
    fn validation_error_saves_nothing() {
        let store = MemoryStore::new();
        let mut app = Pomodojo::open(&store, NullNotifier).unwrap();
        assert!(app.add_task("  ", Priority::Low, 1).is_err());
        assert!(store.is_empty());
    }
}
