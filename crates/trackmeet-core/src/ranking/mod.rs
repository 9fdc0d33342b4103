//! Scoring a finished session and ranking the results.

mod activity;
mod classifier;
mod leaderboard;

pub use activity::{ActivityType, ScoreSource, ScoreUnit};
pub use classifier::{classify, PerformanceClassifier, Thresholds, Tier};
pub use leaderboard::{Leaderboard, LeaderboardEntry, RankedEntry};
