use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::ranking::{ActivityType, LeaderboardEntry, ScoreUnit, Tier};

/// Frozen result of a finished session, as handed to a [`SessionRepository`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub activity_type: ActivityType,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_seconds: u64,
    pub distance_meters: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_count: Option<u32>,
    pub average_speed_kmh: f64,
    pub pace_min_per_km: f64,
    pub stamina_percent: f64,
    pub derived_score: f64,
    pub score_unit: ScoreUnit,
    pub tier: Tier,
    /// Reference into the external media sink (e.g. an uploaded video).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl SessionSummary {
    /// Leaderboard entry for `subject_id` built from this summary.
    pub fn to_entry(&self, subject_id: impl Into<String>, location: Option<String>) -> LeaderboardEntry {
        LeaderboardEntry {
            subject_id: subject_id.into(),
            display_score: self.derived_score,
            score_unit: self.score_unit,
            tier: self.tier,
            location,
        }
    }
}

/// External persistence for finished sessions.
///
/// The engine calls `save_summary` once and does not retry; retry policy
/// belongs to the implementation.
pub trait SessionRepository {
    fn save_summary(&mut self, summary: &SessionSummary) -> Result<i64>;
}

/// Repository that keeps summaries in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    pub saved: Vec<SessionSummary>,
}

impl SessionRepository for MemoryRepository {
    fn save_summary(&mut self, summary: &SessionSummary) -> Result<i64> {
        self.saved.push(summary.clone());
        Ok(self.saved.len() as i64)
    }
}
