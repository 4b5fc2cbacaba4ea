//! Arbitration Engine
//!
//! Resolves the competing inputs of one control cycle into exactly one
//! drive command. Priority, highest first:
//! - Kill switch (always Stop)
//! - Manual override (operator command verbatim)
//! - Stop sign, then proximity, then visual obstacle, then Forward
//!
//! Timed manoeuvres (stop-sign hold, reverse-and-turn) are explicit dwell
//! sequences checked on every tick instead of blocking sleeps.

mod config;
mod control;
mod dwell;
mod engine;

pub use config::ControlConfig;
pub use control::ControlLoop;
pub use dwell::{DwellSequence, DwellStep};
pub use engine::{ArbitrationEngine, Decision, OperatorSignals};
