//! The live workout session: phase machine, telemetry and derived metrics.

mod engine;
pub mod metrics;
mod summary;

pub use engine::{EngineSettings, Session, SessionEngine, MAX_TICK_INTERVAL_MS};
pub use metrics::LiveMetrics;
pub use summary::{MemoryRepository, SessionRepository, SessionSummary};

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Idle,
    /// Readiness countdown.
    Preparing,
    /// Telemetry running.
    Active,
    /// Terminal; summary available until `reset`.
    Finished,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Preparing => "preparing",
            SessionPhase::Active => "active",
            SessionPhase::Finished => "finished",
        })
    }
}
