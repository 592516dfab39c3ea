//! Integration tests for restoring an application session from SQLite.
//!
//! Config, tasks and statistics survive a restart; the timer's run state
//! (status, countdown, counters) always comes back idle.

use pomodojo_core::storage::{STATS_KEY, TASKS_KEY, TIMER_CONFIG_KEY};
use pomodojo_core::{
    Database, KeyValueStore, NullNotifier, Pomodojo, Priority, SessionType, TaskLedgerState,
    TimerConfig, TimerConfigPatch, TimerStatus,
};

#[test]
fn test_config_and_tasks_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomodojo.db");

    let task_id = {
        let db = Database::open_at(&path).unwrap();
        let mut app = Pomodojo::open(db, NullNotifier).unwrap();
        app.update_config(&TimerConfigPatch {
            focus_minutes: Some(1),
            sessions_until_long_break: Some(3),
            ..Default::default()
        })
        .unwrap();
        let id = app.add_task("Persist me", Priority::High, 2).unwrap();
        app.set_active_task(Some(id)).unwrap();

        app.start().unwrap();
        while let Some(token) = app.pending_tick() {
            app.tick(token).unwrap();
        }
        app.advance_to_next().unwrap();
        app.start().unwrap();
        id
    };

    let db = Database::open_at(&path).unwrap();
    let app = Pomodojo::open(db, NullNotifier).unwrap();

    assert_eq!(app.timer().config.focus_minutes, 1);
    assert_eq!(app.timer().config.sessions_until_long_break, 3);
    assert_eq!(app.timer().status, TimerStatus::Idle);
    assert_eq!(app.timer().session_type, SessionType::Focus);
    assert_eq!(app.timer().seconds_remaining, 60);
    assert_eq!(app.timer().current_session_index, 1);
    assert_eq!(app.timer().total_focus_sessions_completed, 0);

    let task = app.task(task_id).unwrap();
    assert_eq!(task.completed_units, 1);
    assert_eq!(app.active_task().map(|t| t.id), Some(task_id));
    assert_eq!(app.stats().all_time().completed_sessions, 1);
}

#[test]
fn test_keys_written_as_json_documents() {
    let db = Database::open_memory().unwrap();
    let mut app = Pomodojo::open(&db, NullNotifier).unwrap();
    app.update_config(&TimerConfigPatch {
        long_break_minutes: Some(20),
        ..Default::default()
    })
    .unwrap();
    app.add_task("Inspect", Priority::Low, 1).unwrap();
    app.start().unwrap();
    app.skip().unwrap();

    let cfg: TimerConfig = db.load(TIMER_CONFIG_KEY).unwrap();
    assert_eq!(cfg.long_break_minutes, 20);

    let state: TaskLedgerState = db.load(TASKS_KEY).unwrap();
    assert_eq!(state.tasks[0].text, "Inspect");

    let raw_stats = db.kv_get(STATS_KEY).unwrap().unwrap();
    let stats: serde_json::Value = serde_json::from_str(&raw_stats).unwrap();
    assert!(stats["days"].is_object());
}

#[test]
fn test_corrupt_ledger_falls_back_to_empty() {
    let db = Database::open_memory().unwrap();
    db.kv_set(TASKS_KEY, "[[[").unwrap();
    let app = Pomodojo::open(&db, NullNotifier).unwrap();
    assert!(app.ledger().is_empty());
}
