use serde::{Deserialize, Serialize};

use super::{ActivityType, ScoreUnit, Tier};

/// One subject's classified result for an activity. Never mutated; a newer
/// result replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub subject_id: String,
    pub display_score: f64,
    pub score_unit: ScoreUnit,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// An entry with its 1-based position in the current view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// Entries for a single activity, kept in submission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Leaderboard {
    activity: ActivityType,
    entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn new(activity: ActivityType) -> Self {
        Self {
            activity,
            entries: Vec::new(),
        }
    }

    pub fn activity(&self) -> ActivityType {
        self.activity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add `entry`, dropping any earlier entry for the same subject. The new
    /// entry takes the latest submission position.
    pub fn submit(&mut self, entry: LeaderboardEntry) {
        self.entries.retain(|e| e.subject_id != entry.subject_id);
        self.entries.push(entry);
    }

    /// Ranked view, optionally restricted to one location.
    ///
    /// Sorted by score descending. The sort is stable, so equal scores keep
    /// submission order. Ranks are `1..=N` over the filtered list.
    pub fn ranked(&self, location: Option<&str>) -> Vec<RankedEntry> {
        let mut view: Vec<&LeaderboardEntry> = self
            .entries
            .iter()
            .filter(|e| match location {
                None => true,
                Some(loc) => e.location.as_deref() == Some(loc),
            })
            .collect();
        view.sort_by(|a, b| descending(a.display_score, b.display_score));

        view.into_iter()
            .enumerate()
            .map(|(i, entry)| RankedEntry {
                rank: i + 1,
                entry: entry.clone(),
            })
            .collect()
    }

    /// Distinct locations in first-seen order.
    pub fn locations(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for loc in self.entries.iter().filter_map(|e| e.location.as_ref()) {
            if !seen.contains(loc) {
                seen.push(loc.clone());
            }
        }
        seen
    }
}

/// Descending score order with NaN sorted last. `-0.0` and `0.0` compare equal.
fn descending(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => b.partial_cmp(&a).unwrap_or(std::cmp::Ordering::Equal),
    }
}
