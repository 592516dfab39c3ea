//! # Pomodojo Core Library
//!
//! This library provides the core logic for the Pomodojo Pomodoro timer and
//! its task tracker. Front ends (the `pomodojo` CLI, or anything else) stay
//! thin: they raise intents, deliver ticks and render snapshots.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A tick-driven state machine; the caller delivers one
//!   tick per second using the token the engine hands out
//! - **Task Ledger**: Todos credited with one unit per finished focus session
//! - **Storage**: SQLite-backed key-value store and TOML-based configuration
//! - **App**: Wires the engine to the ledger and persists state
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`TaskLedger`]: Task collection with an active-task pointer
//! - [`Pomodojo`]: Application session over a [`KeyValueStore`]
//! - [`Config`]: Application configuration management

pub mod app;
pub mod error;
pub mod events;
pub mod keymap;
pub mod notify;
pub mod stats;
pub mod storage;
pub mod task;
pub mod timer;

pub use app::Pomodojo;
pub use error::{ConfigError, CoreError, NotFoundError, StorageError, ValidationError};
pub use events::Event;
pub use keymap::{Intent, Keymap};
pub use notify::{Notifier, NullNotifier, RecordingNotifier};
pub use stats::{DailyStats, StatsLog, Summary};
pub use storage::{Config, Database, KeyValueStore, MemoryStore};
pub use task::{Priority, Task, TaskId, TaskLedger, TaskLedgerState, TaskPatch};
pub use timer::{
    SessionType, TickToken, TimerConfig, TimerConfigPatch, TimerEngine, TimerSnapshot, TimerState,
    TimerStatus,
};
