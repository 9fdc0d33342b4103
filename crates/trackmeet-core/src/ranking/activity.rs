use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Every scored activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityType {
    Running,
    PushUps,
    SitUps,
    HighJump,
    LongJump,
    ShuttleRun,
    EnduranceRun,
}

/// Native unit of an activity's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreUnit {
    Km,
    M,
    Reps,
    Cm,
    Laps,
}

/// Where a finished session's raw score comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreSource {
    /// Accumulated GPS distance, expressed in the given unit.
    Distance(ScoreUnit),
    /// Count of `record_rep` calls.
    Reps(ScoreUnit),
    /// Best value passed to `record_measurement`.
    Measurement(ScoreUnit),
}

impl ScoreSource {
    pub fn unit(self) -> ScoreUnit {
        match self {
            ScoreSource::Distance(u) | ScoreSource::Reps(u) | ScoreSource::Measurement(u) => u,
        }
    }
}

impl ActivityType {
    pub const ALL: [ActivityType; 7] = [
        ActivityType::Running,
        ActivityType::PushUps,
        ActivityType::SitUps,
        ActivityType::HighJump,
        ActivityType::LongJump,
        ActivityType::ShuttleRun,
        ActivityType::EnduranceRun,
    ];

    pub fn slug(self) -> &'static str {
        match self {
            ActivityType::Running => "running",
            ActivityType::PushUps => "push-ups",
            ActivityType::SitUps => "sit-ups",
            ActivityType::HighJump => "high-jump",
            ActivityType::LongJump => "long-jump",
            ActivityType::ShuttleRun => "shuttle-run",
            ActivityType::EnduranceRun => "endurance-run",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            ActivityType::Running => "Running",
            ActivityType::PushUps => "Push-ups",
            ActivityType::SitUps => "Sit-ups",
            ActivityType::HighJump => "High Jump",
            ActivityType::LongJump => "Long Jump",
            ActivityType::ShuttleRun => "Shuttle Run",
            ActivityType::EnduranceRun => "Endurance Run",
        }
    }

    pub fn score_source(self) -> ScoreSource {
        match self {
            ActivityType::Running => ScoreSource::Distance(ScoreUnit::Km),
            ActivityType::EnduranceRun => ScoreSource::Distance(ScoreUnit::M),
            ActivityType::PushUps | ActivityType::SitUps => ScoreSource::Reps(ScoreUnit::Reps),
            ActivityType::ShuttleRun => ScoreSource::Reps(ScoreUnit::Laps),
            ActivityType::HighJump | ActivityType::LongJump => {
                ScoreSource::Measurement(ScoreUnit::Cm)
            }
        }
    }

    pub fn unit(self) -> ScoreUnit {
        self.score_source().unit()
    }

    /// Whether the session needs the location source.
    pub fn tracks_distance(self) -> bool {
        matches!(self.score_source(), ScoreSource::Distance(_))
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for ActivityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        ActivityType::ALL
            .into_iter()
            .find(|a| a.slug() == needle || a.slug().replace('-', "") == needle)
            .ok_or_else(|| format!("unknown activity: {s}"))
    }
}

impl ScoreUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            ScoreUnit::Km => "km",
            ScoreUnit::M => "m",
            ScoreUnit::Reps => "reps",
            ScoreUnit::Cm => "cm",
            ScoreUnit::Laps => "laps",
        }
    }
}

impl fmt::Display for ScoreUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "km" => Ok(ScoreUnit::Km),
            "m" => Ok(ScoreUnit::M),
            "reps" => Ok(ScoreUnit::Reps),
            "cm" => Ok(ScoreUnit::Cm),
            "laps" => Ok(ScoreUnit::Laps),
            other => Err(format!("unknown score unit: {other}")),
        }
    }
}
