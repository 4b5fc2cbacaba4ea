//! Console route handlers

pub mod control;
pub mod telemetry;
