use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::ActivityType;

/// Ordered performance category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Beginner,
    Intermediate,
    Advanced,
    Elite,
}

impl Tier {
    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Beginner => "Beginner",
            Tier::Intermediate => "Intermediate",
            Tier::Advanced => "Advanced",
            Tier::Elite => "Elite",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(Tier::Beginner),
            "Intermediate" => Ok(Tier::Intermediate),
            "Advanced" => Ok(Tier::Advanced),
            "Elite" => Ok(Tier::Elite),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// Lower edges of the Intermediate, Advanced and Elite tiers, in the
/// activity's native unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub beginner: f64,
    pub intermediate: f64,
    pub advanced: f64,
}

impl Thresholds {
    pub const fn new(beginner: f64, intermediate: f64, advanced: f64) -> Self {
        Self {
            beginner,
            intermediate,
            advanced,
        }
    }

    /// Built-in table per activity.
    pub fn default_for(activity: ActivityType) -> Self {
        match activity {
            ActivityType::Running => Self::new(7.0, 12.0, 17.0),
            ActivityType::PushUps => Self::new(30.0, 60.0, 90.0),
            ActivityType::SitUps => Self::new(40.0, 80.0, 120.0),
            ActivityType::HighJump => Self::new(130.0, 160.0, 190.0),
            ActivityType::LongJump => Self::new(350.0, 450.0, 550.0),
            ActivityType::ShuttleRun => Self::new(4.0, 6.0, 8.0),
            ActivityType::EnduranceRun => Self::new(1000.0, 2000.0, 3000.0),
        }
    }

    /// All three edges finite and non-decreasing.
    pub fn is_ordered(&self) -> bool {
        [self.beginner, self.intermediate, self.advanced]
            .iter()
            .all(|t| t.is_finite())
            && self.beginner <= self.intermediate
            && self.intermediate <= self.advanced
    }
}

/// Map `score` to a tier. Each edge belongs to the higher tier. A NaN score
/// compares below everything and lands in `Beginner`.
pub fn classify(score: f64, thresholds: &Thresholds) -> Tier {
    if score >= thresholds.advanced {
        Tier::Elite
    } else if score >= thresholds.intermediate {
        Tier::Advanced
    } else if score >= thresholds.beginner {
        Tier::Intermediate
    } else {
        Tier::Beginner
    }
}

/// Per-activity threshold table.
///
/// Built once from defaults plus configured overrides; classification reads
/// the table and nothing else.
#[derive(Debug, Clone, Default)]
pub struct PerformanceClassifier {
    overrides: HashMap<ActivityType, Thresholds>,
}

impl PerformanceClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overrides(overrides: HashMap<ActivityType, Thresholds>) -> Self {
        Self { overrides }
    }

    pub fn thresholds(&self, activity: ActivityType) -> Thresholds {
        self.overrides
            .get(&activity)
            .copied()
            .unwrap_or_else(|| Thresholds::default_for(activity))
    }

    pub fn classify(&self, score: f64, activity: ActivityType) -> Tier {
        classify(score, &self.thresholds(activity))
    }
}
