//! # Trackmeet Core Library
//!
//! This library provides the activity session engine behind Trackmeet: it turns
//! periodic location fixes and clock ticks into a live workout session and
//! classifies the result for leaderboard ranking. The CLI binary is a thin
//! layer over the same library.
//!
//! ## Architecture
//!
//! - **Session Engine**: A wall-clock-based state machine that requires the
//!   caller to forward ticks (`tick()`) and location fixes (`on_fix()`)
//! - **Geo**: Haversine distance accumulation over consecutive fixes
//! - **Ranking**: Per-activity tier thresholds and stable leaderboard ordering
//! - **Driver**: A single-task tokio loop hosting one session
//! - **Storage**: SQLite persistence for finished sessions and leaderboards,
//!   TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Core session state machine
//! - [`DistanceAccumulator`]: Monotonic distance from GPS fixes
//! - [`PerformanceClassifier`]: Score to [`Tier`] mapping
//! - [`Leaderboard`]: Ranked, classified entries
//! - [`Database`]: Session and leaderboard persistence
//! - [`Config`]: Application configuration management

pub mod clock;
pub mod driver;
pub mod error;
pub mod events;
pub mod geo;
pub mod ranking;
pub mod session;
pub mod storage;

pub use clock::{Clock, ClockTicker, ManualClock, ManualTicker, SystemClock};
pub use driver::{Command, SessionDriver, SharedTicker, TokioClock};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, SourceError};
pub use events::Event;
pub use geo::{haversine_m, DistanceAccumulator, GeoFix, GeoSampleSource, Permission, ReplaySource};
pub use ranking::{
    classify, ActivityType, Leaderboard, LeaderboardEntry, PerformanceClassifier, RankedEntry,
    ScoreUnit, Thresholds, Tier,
};
pub use session::{
    EngineSettings, LiveMetrics, SessionEngine, SessionPhase, SessionRepository, SessionSummary,
    MAX_TICK_INTERVAL_MS,
};
pub use storage::{Config, Database};
