use std::path::{Path, PathBuf};

use clap::Subcommand;
use serde::Serialize;
use tracing::{debug, info};
use trackmeet_core::{
    ActivityType, Clock, Config, Database, Event, GeoFix, ManualClock, ManualTicker, RankedEntry,
    ReplaySource, SessionEngine, SessionSummary, SystemClock, MAX_TICK_INTERVAL_MS,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Replay a recorded track (JSON array of fixes) through the engine
    Replay {
        /// Track file: `[{"latitude":..,"longitude":..,"captured_at_ms":..}, ...]`
        track: Option<PathBuf>,
        /// Activity slug (e.g. "running", "push-ups")
        #[arg(long)]
        activity: ActivityType,
        /// Repetitions to record for rep-scored activities
        #[arg(long, default_value_t = 0)]
        reps: u32,
        /// Measured attempt (repeatable); the best one is scored
        #[arg(long = "measure")]
        measurements: Vec<f64>,
        /// Subject to submit the result for
        #[arg(long)]
        subject: Option<String>,
        /// Location tag for the leaderboard entry
        #[arg(long)]
        location: Option<String>,
        /// Persist the session (and the entry, with --subject)
        #[arg(long)]
        save: bool,
    },
}

#[derive(Serialize)]
struct ReplayOutput {
    summary: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    row_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    standing: Option<RankedEntry>,
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Replay {
            track,
            activity,
            reps,
            measurements,
            subject,
            location,
            save,
        } => {
            let fixes = match &track {
                Some(path) => load_track(path)?,
                None => Vec::new(),
            };
            let config = Config::load_or_default();
            let summary = replay(&config, activity, &fixes, reps, &measurements)?;

            let mut output = ReplayOutput {
                summary,
                row_id: None,
                standing: None,
            };
            if save {
                let mut db = Database::open()?;
                output.row_id = Some(db.record_session(&output.summary)?);
                if let Some(subject) = subject {
                    let entry = output.summary.to_entry(subject.clone(), location.clone());
                    db.submit_entry(activity, &entry)?;
                    output.standing = db
                        .leaderboard(activity)?
                        .ranked(location.as_deref())
                        .into_iter()
                        .find(|r| r.entry.subject_id == subject);
                }
            }
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

fn load_track(path: &Path) -> Result<Vec<GeoFix>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read track {}: {e}", path.display()))?;
    let mut fixes: Vec<GeoFix> = serde_json::from_str(&content)?;
    fixes.sort_by_key(|f| f.captured_at_ms);
    Ok(fixes)
}

/// Drive one session over `fixes` on a manual clock.
///
/// The countdown ends at the first fix. Ticks fire every tick interval up to
/// each fix's capture time, and the session stops at the last fix.
fn replay(
    config: &Config,
    activity: ActivityType,
    fixes: &[GeoFix],
    reps: u32,
    measurements: &[f64],
) -> Result<SessionSummary, Box<dyn std::error::Error>> {
    let settings = config.engine_settings();
    let interval = settings.tick_interval_ms.clamp(1, MAX_TICK_INTERVAL_MS);
    let countdown_ms = u64::from(settings.countdown_ticks).saturating_mul(interval);

    let active_at = fixes
        .first()
        .map_or_else(|| SystemClock.now_ms(), |f| f.captured_at_ms);
    let clock = ManualClock::new(active_at.saturating_sub(countdown_ms));
    let mut engine = SessionEngine::new(ReplaySource::granted(), ManualTicker::new(), clock.clone())
        .with_settings(settings)
        .with_classifier(config.classifier());

    engine.start(activity)?;
    for _ in 0..settings.countdown_ticks {
        clock.advance(interval);
        engine.tick();
    }

    let mut next_tick = clock.now_ms().checked_add(interval);
    for fix in fixes {
        while let Some(at) = next_tick.filter(|at| *at <= fix.captured_at_ms) {
            clock.set(at);
            engine.tick();
            next_tick = at.checked_add(interval);
        }
        clock.set(fix.captured_at_ms.max(clock.now_ms()));
        engine.on_fix(*fix);
    }
    debug!(fixes = fixes.len(), "track replayed");

    for _ in 0..reps {
        engine.record_rep()?;
    }
    for value in measurements {
        engine.record_measurement(*value)?;
    }

    match engine.stop()? {
        Event::SessionFinished { summary } => {
            info!(session_id = %summary.session_id, tier = %summary.tier, "replay finished");
            Ok(summary)
        }
        other => Err(format!("unexpected event after stop: {other:?}").into()),
    }
}
