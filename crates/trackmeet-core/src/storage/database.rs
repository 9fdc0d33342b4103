//! SQLite-based session storage and leaderboard persistence.
//!
//! Provides persistent storage for:
//! - Finished session summaries
//! - Leaderboard entries (one per subject per activity)

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::ranking::{ActivityType, Leaderboard, LeaderboardEntry, ScoreUnit, Tier};
use crate::session::{SessionRepository, SessionSummary};

/// A persisted session summary with its row id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub id: i64,
    #[serde(flatten)]
    pub summary: SessionSummary,
}

/// A persisted leaderboard entry for one activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardRow {
    pub id: i64,
    pub activity: ActivityType,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

/// SQLite database for finished sessions and leaderboards.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open the database at `~/.config/trackmeet/trackmeet.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("trackmeet.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> std::result::Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS sessions (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id      TEXT NOT NULL UNIQUE,
                activity        TEXT NOT NULL,
                started_at      TEXT NOT NULL,
                finished_at     TEXT NOT NULL,
                elapsed_seconds INTEGER NOT NULL,
                distance_m      REAL NOT NULL,
                rep_count       INTEGER,
                avg_speed_kmh   REAL NOT NULL,
                pace_min_per_km REAL NOT NULL,
                stamina_percent REAL NOT NULL,
                score           REAL NOT NULL,
                score_unit      TEXT NOT NULL,
                tier            TEXT NOT NULL,
                media_ref       TEXT
            );

            CREATE TABLE IF NOT EXISTS leaderboard (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                activity    TEXT NOT NULL,
                subject_id  TEXT NOT NULL,
                score       REAL NOT NULL,
                score_unit  TEXT NOT NULL,
                tier        TEXT NOT NULL,
                location    TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_activity ON sessions(activity);
            CREATE UNIQUE INDEX IF NOT EXISTS idx_leaderboard_subject ON leaderboard(activity, subject_id);",
        )?;
        Ok(())
    }

    /// Record a finished session.
    ///
    /// # Errors
    /// Returns an error if the insert fails (including a duplicate session id).
    pub fn record_session(&self, summary: &SessionSummary) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO sessions (session_id, activity, started_at, finished_at, elapsed_seconds,
                distance_m, rep_count, avg_speed_kmh, pace_min_per_km, stamina_percent,
                score, score_unit, tier, media_ref)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                summary.session_id,
                summary.activity_type.slug(),
                summary.started_at.to_rfc3339(),
                summary.finished_at.to_rfc3339(),
                summary.elapsed_seconds,
                summary.distance_meters,
                summary.rep_count,
                summary.average_speed_kmh,
                summary.pace_min_per_km,
                summary.stamina_percent,
                summary.derived_score,
                summary.score_unit.as_str(),
                summary.tier.as_str(),
                summary.media_ref,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<StoredSession>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, activity, started_at, finished_at, elapsed_seconds, distance_m,
                    rep_count, avg_speed_kmh, pace_min_per_km, stamina_percent, score,
                    score_unit, tier, media_ref
             FROM sessions ORDER BY id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], session_columns)?;

        let mut out = Vec::new();
        for row in rows {
            let raw = row?;
            out.push(raw.decode()?);
        }
        Ok(out)
    }

    /// Store `entry` for `activity`, replacing the subject's previous entry.
    /// The replacement gets a fresh row id, so it sorts after older entries
    /// with an equal score.
    pub fn submit_entry(&mut self, activity: ActivityType, entry: &LeaderboardEntry) -> Result<i64> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM leaderboard WHERE activity = ?1 AND subject_id = ?2",
            params![activity.slug(), entry.subject_id],
        )?;
        tx.execute(
            "INSERT INTO leaderboard (activity, subject_id, score, score_unit, tier, location)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                activity.slug(),
                entry.subject_id,
                entry.display_score,
                entry.score_unit.as_str(),
                entry.tier.as_str(),
                entry.location,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    /// Rebuild the leaderboard for `activity` in submission order.
    pub fn leaderboard(&self, activity: ActivityType) -> Result<Leaderboard> {
        let mut stmt = self.conn.prepare(
            "SELECT id, activity, subject_id, score, score_unit, tier, location
             FROM leaderboard WHERE activity = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![activity.slug()], |row| {
            Ok(RawEntry {
                id: row.get(0)?,
                activity: row.get(1)?,
                subject_id: row.get(2)?,
                score: row.get(3)?,
                score_unit: row.get(4)?,
                tier: row.get(5)?,
                location: row.get(6)?,
            })
        })?;

        let mut board = Leaderboard::new(activity);
        for row in rows {
            board.submit(row?.decode()?.entry);
        }
        Ok(board)
    }
}

impl SessionRepository for Database {
    fn save_summary(&mut self, summary: &SessionSummary) -> Result<i64> {
        self.record_session(summary)
    }
}

struct RawSession {
    id: i64,
    session_id: String,
    activity: String,
    started_at: String,
    finished_at: String,
    elapsed_seconds: u64,
    distance_m: f64,
    rep_count: Option<u32>,
    avg_speed_kmh: f64,
    pace_min_per_km: f64,
    stamina_percent: f64,
    score: f64,
    score_unit: String,
    tier: String,
    media_ref: Option<String>,
}

fn session_columns(row: &Row<'_>) -> rusqlite::Result<RawSession> {
    Ok(RawSession {
        id: row.get(0)?,
        session_id: row.get(1)?,
        activity: row.get(2)?,
        started_at: row.get(3)?,
        finished_at: row.get(4)?,
        elapsed_seconds: row.get(5)?,
        distance_m: row.get(6)?,
        rep_count: row.get(7)?,
        avg_speed_kmh: row.get(8)?,
        pace_min_per_km: row.get(9)?,
        stamina_percent: row.get(10)?,
        score: row.get(11)?,
        score_unit: row.get(12)?,
        tier: row.get(13)?,
        media_ref: row.get(14)?,
    })
}

impl RawSession {
    fn decode(self) -> std::result::Result<StoredSession, DatabaseError> {
        let corrupt = |message: String| DatabaseError::CorruptRow {
            table: "sessions",
            message,
        };
        Ok(StoredSession {
            id: self.id,
            summary: SessionSummary {
                session_id: self.session_id,
                activity_type: self.activity.parse().map_err(corrupt)?,
                started_at: parse_time(&self.started_at).map_err(corrupt)?,
                finished_at: parse_time(&self.finished_at).map_err(corrupt)?,
                elapsed_seconds: self.elapsed_seconds,
                distance_meters: self.distance_m,
                rep_count: self.rep_count,
                average_speed_kmh: self.avg_speed_kmh,
                pace_min_per_km: self.pace_min_per_km,
                stamina_percent: self.stamina_percent,
                derived_score: self.score,
                score_unit: self.score_unit.parse::<ScoreUnit>().map_err(corrupt)?,
                tier: self.tier.parse::<Tier>().map_err(corrupt)?,
                media_ref: self.media_ref,
            },
        })
    }
}

struct RawEntry {
    id: i64,
    activity: String,
    subject_id: String,
    score: f64,
    score_unit: String,
    tier: String,
    location: Option<String>,
}

impl RawEntry {
    fn decode(self) -> std::result::Result<LeaderboardRow, DatabaseError> {
        let corrupt = |message: String| DatabaseError::CorruptRow {
            table: "leaderboard",
            message,
        };
        Ok(LeaderboardRow {
            id: self.id,
            activity: self.activity.parse().map_err(corrupt)?,
            entry: LeaderboardEntry {
                subject_id: self.subject_id,
                display_score: self.score,
                score_unit: self.score_unit.parse::<ScoreUnit>().map_err(corrupt)?,
                tier: self.tier.parse::<Tier>().map_err(corrupt)?,
                location: self.location,
            },
        })
    }
}

fn parse_time(s: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("bad timestamp '{s}': {e}"))
}
