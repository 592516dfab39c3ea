mod config;
mod engine;

pub use config::{SessionType, TimerConfig, TimerConfigPatch};
pub use engine::{
    FocusCompleteCallback, TickToken, TimerEngine, TimerSnapshot, TimerState, TimerStatus,
};
