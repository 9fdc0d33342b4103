use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ranking::ActivityType;
use crate::session::{LiveMetrics, SessionPhase, SessionSummary};

/// Every state change in the session engine produces an Event.
/// The UI renders from these; nothing in the engine depends on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Permission granted; readiness countdown begins.
    SessionPreparing {
        session_id: String,
        activity: ActivityType,
        countdown_ticks: u32,
        at: DateTime<Utc>,
    },
    CountdownTick {
        remaining: u32,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero; telemetry is running.
    SessionStarted {
        session_id: String,
        started_at: DateTime<Utc>,
    },
    DistanceAdvanced {
        delta_m: f64,
        total_m: f64,
        at: DateTime<Utc>,
    },
    RepRecorded {
        rep_count: u32,
        at: DateTime<Utc>,
    },
    MeasurementRecorded {
        value: f64,
        best: f64,
        at: DateTime<Utc>,
    },
    MetricsUpdated {
        metrics: LiveMetrics,
        at: DateTime<Utc>,
    },
    SessionFinished {
        summary: SessionSummary,
    },
    /// Returned to Idle before becoming active (source failure or user abort).
    SessionAborted {
        reason: String,
        at: DateTime<Utc>,
    },
    SessionReset {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        phase: SessionPhase,
        activity: Option<ActivityType>,
        countdown_remaining: u32,
        metrics: LiveMetrics,
        at: DateTime<Utc>,
    },
}
