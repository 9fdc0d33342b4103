//! Session engine implementation.
//!
//! The engine is a wall-clock-based state machine. It owns no threads and no
//! timers: the host forwards each ticker tick to [`SessionEngine::tick`] and
//! each location fix to [`SessionEngine::on_fix`], in arrival order.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Preparing -> Active -> Finished -> Idle
//!            |
//!            +-> Idle (cancel, or source failure)
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut engine = SessionEngine::new(source, ticker, SystemClock);
//! engine.start(ActivityType::Running)?;
//! // On every ticker tick:
//! engine.tick();
//! // On every location fix:
//! engine.on_fix(fix);
//! let finished = engine.stop()?;
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::metrics::{self, CanonicalState, LiveMetrics};
use super::{SessionPhase, SessionRepository, SessionSummary};
use crate::clock::{timestamp, Clock, ClockTicker};
use crate::error::{Result, SessionError};
use crate::events::Event;
use crate::geo::{DistanceAccumulator, GeoFix, GeoSampleSource, Permission, SubscriptionHandle};
use crate::ranking::{ActivityType, PerformanceClassifier, ScoreSource, ScoreUnit};

/// Longest accepted ticker period.
pub const MAX_TICK_INTERVAL_MS: u64 = 60_000;

/// Tunables for a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Ticks spent in `Preparing` before telemetry starts.
    pub countdown_ticks: u32,
    /// Ticker period, clamped to `1..=MAX_TICK_INTERVAL_MS` when armed.
    pub tick_interval_ms: u64,
    pub stamina_decay_per_tick: f64,
    /// Movement filter passed to the location source.
    pub min_distance_m: f64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            countdown_ticks: 3,
            tick_interval_ms: 1000,
            stamina_decay_per_tick: 0.2,
            min_distance_m: 1.0,
        }
    }
}

/// The live unit of work. Exists from `Preparing` until it is reset.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    activity: ActivityType,
    phase: SessionPhase,
    countdown_remaining: u32,
    started_at_ms: Option<u64>,
    distance: DistanceAccumulator,
    decay_ticks: u64,
    metrics: LiveMetrics,
    rep_count: u32,
    best_measurement: Option<f64>,
    media_ref: Option<String>,
    summary: Option<SessionSummary>,
}

impl Session {
    fn new(activity: ActivityType, countdown_ticks: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            activity,
            phase: SessionPhase::Preparing,
            countdown_remaining: countdown_ticks,
            started_at_ms: None,
            distance: DistanceAccumulator::new(),
            decay_ticks: 0,
            metrics: LiveMetrics::initial(),
            rep_count: 0,
            best_measurement: None,
            media_ref: None,
            summary: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn activity(&self) -> ActivityType {
        self.activity
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn countdown_remaining(&self) -> u32 {
        self.countdown_remaining
    }

    pub fn started_at_ms(&self) -> Option<u64> {
        self.started_at_ms
    }

    pub fn distance_m(&self) -> f64 {
        self.distance.total_m()
    }

    pub fn last_fix(&self) -> Option<&GeoFix> {
        self.distance.last_fix()
    }

    pub fn metrics(&self) -> &LiveMetrics {
        &self.metrics
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn best_measurement(&self) -> Option<f64> {
        self.best_measurement
    }

    pub fn media_ref(&self) -> Option<&str> {
        self.media_ref.as_deref()
    }

    fn raw_score(&self) -> f64 {
        match self.activity.score_source() {
            ScoreSource::Distance(ScoreUnit::Km) => self.distance.total_m() / 1000.0,
            ScoreSource::Distance(_) => self.distance.total_m(),
            ScoreSource::Reps(_) => f64::from(self.rep_count),
            ScoreSource::Measurement(_) => self.best_measurement.unwrap_or(0.0),
        }
    }
}

/// Core session engine.
///
/// Operates on wall-clock deltas from `C`. Exactly one session is live at a
/// time. Dropping the engine runs the same teardown as [`SessionEngine::shutdown`].
pub struct SessionEngine<G: GeoSampleSource, T: ClockTicker, C: Clock> {
    source: G,
    ticker: T,
    clock: C,
    classifier: PerformanceClassifier,
    settings: EngineSettings,
    session: Option<Session>,
    subscription: Option<SubscriptionHandle>,
}

impl<G: GeoSampleSource, T: ClockTicker, C: Clock> SessionEngine<G, T, C> {
    pub fn new(source: G, ticker: T, clock: C) -> Self {
        Self {
            source,
            ticker,
            clock,
            classifier: PerformanceClassifier::new(),
            settings: EngineSettings::default(),
            session: None,
            subscription: None,
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_classifier(mut self, classifier: PerformanceClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::Idle)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Latest computed metrics; zeroes with full stamina when idle.
    pub fn metrics(&self) -> LiveMetrics {
        self.session
            .as_ref()
            .map(|s| s.metrics)
            .unwrap_or_else(LiveMetrics::initial)
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.session.as_ref().and_then(|s| s.summary.as_ref())
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn source(&self) -> &G {
        &self.source
    }

    pub fn ticker(&self) -> &T {
        &self.ticker
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn snapshot(&self) -> Event {
        Event::StateSnapshot {
            phase: self.phase(),
            activity: self.session.as_ref().map(|s| s.activity),
            countdown_remaining: self
                .session
                .as_ref()
                .map(|s| s.countdown_remaining)
                .unwrap_or(0),
            metrics: self.metrics(),
            at: self.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a session. Valid only from `Idle`.
    ///
    /// Distance activities request location permission first; a refusal
    /// leaves the engine `Idle`. With a zero-length countdown the session
    /// becomes active immediately.
    pub fn start(&mut self, activity: ActivityType) -> std::result::Result<Event, SessionError> {
        if self.phase() != SessionPhase::Idle {
            return Err(self.reject("start"));
        }

        if activity.tracks_distance() && self.source.request_permission() == Permission::Denied {
            warn!(%activity, "location permission denied; session not started");
            return Err(SessionError::PermissionDenied);
        }

        let session = Session::new(activity, self.settings.countdown_ticks);
        let session_id = session.id.clone();
        self.session = Some(session);
        self.ticker
            .arm(self.settings.tick_interval_ms.clamp(1, MAX_TICK_INTERVAL_MS));
        info!(%session_id, %activity, countdown = self.settings.countdown_ticks, "session preparing");

        if self.settings.countdown_ticks == 0 {
            return self.begin_active();
        }

        Ok(Event::SessionPreparing {
            session_id,
            activity,
            countdown_ticks: self.settings.countdown_ticks,
            at: self.now(),
        })
    }

    /// Handle one ticker tick.
    ///
    /// In `Preparing` this decrements the countdown by one and enters
    /// `Active` at zero. In `Active` it recomputes every derived metric from
    /// canonical state. Ticks arriving while the ticker is disarmed are ignored.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.ticker.is_armed() {
            return None;
        }
        match self.phase() {
            SessionPhase::Preparing => {
                let session = self.session.as_mut()?;
                session.countdown_remaining = session.countdown_remaining.saturating_sub(1);
                let remaining = session.countdown_remaining;
                debug!(remaining, "countdown tick");
                if remaining > 0 {
                    return Some(Event::CountdownTick {
                        remaining,
                        at: self.now(),
                    });
                }
                match self.begin_active() {
                    Ok(event) => Some(event),
                    Err(e) => Some(self.abort(e.to_string())),
                }
            }
            SessionPhase::Active => {
                let now_ms = self.clock.now_ms();
                let decay = self.settings.stamina_decay_per_tick;
                let session = self.session.as_mut()?;
                session.decay_ticks += 1;
                session.metrics = recompute(session, now_ms, decay);
                let metrics = session.metrics;
                debug!(
                    elapsed_s = metrics.elapsed_seconds,
                    distance_m = metrics.distance_meters,
                    "metrics refreshed"
                );
                Some(Event::MetricsUpdated {
                    metrics,
                    at: timestamp(now_ms),
                })
            }
            SessionPhase::Idle | SessionPhase::Finished => None,
        }
    }

    /// Handle one location fix. Fixes are dropped unless the session is
    /// `Active` with a live subscription.
    pub fn on_fix(&mut self, fix: GeoFix) -> Option<Event> {
        if self.subscription.is_none() || self.phase() != SessionPhase::Active {
            debug!(phase = %self.phase(), "dropping fix outside an active subscription");
            return None;
        }
        let session = self.session.as_mut()?;
        let delta_m = session.distance.push(fix)?;
        let total_m = session.distance.total_m();
        debug!(delta_m, total_m, "fix accepted");
        Some(Event::DistanceAdvanced {
            delta_m,
            total_m,
            at: timestamp(fix.captured_at_ms),
        })
    }

    /// Count one repetition for rep-scored activities. Valid only while `Active`.
    pub fn record_rep(&mut self) -> std::result::Result<Event, SessionError> {
        if self.phase() != SessionPhase::Active {
            return Err(self.reject("record a rep"));
        }
        let at = self.now();
        let session = self.active_session_mut("record a rep")?;
        session.rep_count = session.rep_count.saturating_add(1);
        Ok(Event::RepRecorded {
            rep_count: session.rep_count,
            at,
        })
    }

    /// Record one measured attempt (e.g. a jump in cm); the best value is
    /// scored. Non-finite or negative values are ignored.
    pub fn record_measurement(
        &mut self,
        value: f64,
    ) -> std::result::Result<Option<Event>, SessionError> {
        if self.phase() != SessionPhase::Active {
            return Err(self.reject("record a measurement"));
        }
        if !value.is_finite() || value < 0.0 {
            debug!(value, "ignoring unusable measurement");
            return Ok(None);
        }
        // Fold -0.0 into 0.0 so it never reaches a summary or a leaderboard.
        let value = if value == 0.0 { 0.0 } else { value };
        let at = self.now();
        let session = self.active_session_mut("record a measurement")?;
        let best = session.best_measurement.map_or(value, |b| b.max(value));
        session.best_measurement = Some(best);
        Ok(Some(Event::MeasurementRecorded { value, best, at }))
    }

    /// Attach an opaque media-sink reference. Valid while `Active` or `Finished`.
    pub fn attach_media(&mut self, reference: impl Into<String>) -> std::result::Result<(), SessionError> {
        let phase = self.phase();
        if !matches!(phase, SessionPhase::Active | SessionPhase::Finished) {
            return Err(self.reject("attach media"));
        }
        let reference = reference.into();
        if let Some(session) = self.session.as_mut() {
            if let Some(summary) = session.summary.as_mut() {
                summary.media_ref = Some(reference.clone());
            }
            session.media_ref = Some(reference);
        }
        Ok(())
    }

    /// Finish the session. Valid only from `Active`.
    ///
    /// The location subscription and the ticker are released before the final
    /// metrics are frozen, so no later fix or tick can alter them.
    pub fn stop(&mut self) -> std::result::Result<Event, SessionError> {
        if self.phase() != SessionPhase::Active {
            return Err(self.reject("stop"));
        }
        self.teardown();

        let now_ms = self.clock.now_ms();
        let decay = self.settings.stamina_decay_per_tick;
        let classifier = &self.classifier;
        let session = self.session.as_mut().ok_or(SessionError::InvalidTransition {
            action: "stop",
            phase: SessionPhase::Idle,
        })?;

        session.metrics = recompute(session, now_ms, decay);
        session.phase = SessionPhase::Finished;

        let derived_score = session.raw_score();
        let tier = classifier.classify(derived_score, session.activity);
        let metrics = session.metrics;
        let summary = SessionSummary {
            session_id: session.id.clone(),
            activity_type: session.activity,
            started_at: timestamp(session.started_at_ms.unwrap_or(now_ms)),
            finished_at: timestamp(now_ms),
            elapsed_seconds: metrics.elapsed_seconds,
            distance_meters: metrics.distance_meters,
            rep_count: matches!(session.activity.score_source(), ScoreSource::Reps(_))
                .then_some(session.rep_count),
            average_speed_kmh: metrics.average_speed_kmh,
            pace_min_per_km: metrics.pace_min_per_km,
            stamina_percent: metrics.stamina_percent,
            derived_score,
            score_unit: session.activity.unit(),
            tier,
            media_ref: session.media_ref.clone(),
        };
        session.summary = Some(summary.clone());

        info!(
            session_id = %summary.session_id,
            elapsed_s = summary.elapsed_seconds,
            distance_m = summary.distance_meters,
            score = summary.derived_score,
            %tier,
            "session finished"
        );
        Ok(Event::SessionFinished { summary })
    }

    /// Abort the readiness countdown. Valid only from `Preparing`.
    pub fn cancel(&mut self) -> std::result::Result<Event, SessionError> {
        if self.phase() != SessionPhase::Preparing {
            return Err(self.reject("cancel"));
        }
        Ok(self.abort("cancelled during countdown".into()))
    }

    /// Discard the finished session. Valid only from `Finished`.
    pub fn reset(&mut self) -> std::result::Result<Event, SessionError> {
        if self.phase() != SessionPhase::Finished {
            return Err(self.reject("reset"));
        }
        self.session = None;
        info!("session reset");
        Ok(Event::SessionReset { at: self.now() })
    }

    /// Persist the finished summary, then reset.
    ///
    /// If the repository fails the session stays `Finished` so the caller can
    /// try again.
    pub fn archive<R: SessionRepository + ?Sized>(&mut self, repo: &mut R) -> Result<SessionSummary> {
        let summary = match self.summary() {
            Some(summary) if self.phase() == SessionPhase::Finished => summary.clone(),
            _ => return Err(self.reject("archive").into()),
        };
        let id = repo.save_summary(&summary)?;
        debug!(row = id, session_id = %summary.session_id, "summary archived");
        self.reset()?;
        Ok(summary)
    }

    /// Host teardown (e.g. the screen hosting the session went away).
    ///
    /// An active session is finished exactly as by [`stop`](Self::stop); a
    /// countdown is cancelled. Safe to call repeatedly.
    pub fn shutdown(&mut self) -> Option<SessionSummary> {
        match self.phase() {
            SessionPhase::Active => match self.stop() {
                Ok(Event::SessionFinished { summary }) => Some(summary),
                _ => None,
            },
            SessionPhase::Preparing => {
                self.abort("host shut down".into());
                None
            }
            SessionPhase::Idle | SessionPhase::Finished => {
                self.teardown();
                None
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn begin_active(&mut self) -> std::result::Result<Event, SessionError> {
        let activity = match self.session.as_ref() {
            Some(s) => s.activity,
            None => return Err(self.reject("activate")),
        };
        if activity.tracks_distance() {
            let handle = self.source.subscribe(self.settings.min_distance_m)?;
            self.subscription = Some(handle);
        }

        let now_ms = self.clock.now_ms();
        let session = self.active_session_mut("activate")?;
        session.phase = SessionPhase::Active;
        session.countdown_remaining = 0;
        if session.started_at_ms.is_none() {
            session.started_at_ms = Some(now_ms);
        }
        session.distance = DistanceAccumulator::new();
        session.decay_ticks = 0;
        session.metrics = LiveMetrics::initial();
        let session_id = session.id.clone();

        info!(%session_id, %activity, "session active");
        Ok(Event::SessionStarted {
            session_id,
            started_at: timestamp(now_ms),
        })
    }

    /// Release the subscription and stop the ticker. Idempotent.
    fn teardown(&mut self) {
        if let Some(handle) = self.subscription.take() {
            self.source.unsubscribe(handle);
        }
        if self.ticker.is_armed() {
            self.ticker.disarm();
        }
    }

    fn abort(&mut self, reason: String) -> Event {
        self.teardown();
        self.session = None;
        warn!(%reason, "session aborted");
        Event::SessionAborted {
            reason,
            at: self.now(),
        }
    }

    fn reject(&self, action: &'static str) -> SessionError {
        let phase = self.phase();
        warn!(action, %phase, "invalid transition ignored");
        SessionError::InvalidTransition { action, phase }
    }

    fn active_session_mut(&mut self, action: &'static str) -> std::result::Result<&mut Session, SessionError> {
        let phase = self.phase();
        self.session
            .as_mut()
            .ok_or(SessionError::InvalidTransition { action, phase })
    }

    fn now(&self) -> chrono::DateTime<chrono::Utc> {
        timestamp(self.clock.now_ms())
    }
}

impl<G: GeoSampleSource, T: ClockTicker, C: Clock> Drop for SessionEngine<G, T, C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn recompute(session: &Session, now_ms: u64, decay_per_tick: f64) -> LiveMetrics {
    metrics::compute(&CanonicalState {
        distance_m: session.distance.total_m(),
        started_at_ms: session.started_at_ms.unwrap_or(now_ms),
        now_ms,
        decay_ticks: session.decay_ticks,
        decay_per_tick,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{ManualClock, ManualTicker};
    use crate::geo::ReplaySource;
    use crate::ranking::Tier;
    use crate::session::MemoryRepository;

    type TestEngine = SessionEngine<ReplaySource, ManualTicker, ManualClock>;

    fn engine_with(source: ReplaySource, countdown: u32) -> (TestEngine, ReplaySource, ManualTicker, ManualClock) {
        let ticker = ManualTicker::new();
        let clock = ManualClock::new(1_000_000);
        let engine = SessionEngine::new(source.clone(), ticker.clone(), clock.clone()).with_settings(
            EngineSettings {
                countdown_ticks: countdown,
                ..EngineSettings::default()
            },
        );
        (engine, source, ticker, clock)
    }

    fn active_running() -> (TestEngine, ReplaySource, ManualTicker, ManualClock) {
        let (mut engine, source, ticker, clock) = engine_with(ReplaySource::granted(), 0);
        engine.start(ActivityType::Running).unwrap();
        (engine, source, ticker, clock)
    }

    #[test]
    fn countdown_ticks_down_then_activates() {
        let (mut engine, source, ticker, clock) = engine_with(ReplaySource::granted(), 3);
        assert!(matches!(
            engine.start(ActivityType::Running),
            Ok(Event::SessionPreparing { countdown_ticks: 3, .. })
        ));
        assert_eq!(engine.phase(), SessionPhase::Preparing);
        assert_eq!(ticker.interval_ms(), Some(1000));
        assert!(!source.is_subscribed());

        clock.advance(1000);
        assert!(matches!(engine.tick(), Some(Event::CountdownTick { remaining: 2, .. })));
        clock.advance(1000);
        assert!(matches!(engine.tick(), Some(Event::CountdownTick { remaining: 1, .. })));
        clock.advance(1000);
        assert!(matches!(engine.tick(), Some(Event::SessionStarted { .. })));

        assert_eq!(engine.phase(), SessionPhase::Active);
        assert!(source.is_subscribed());
        assert_eq!(source.min_distance_m(), Some(1.0));
        let session = engine.session().unwrap();
        assert_eq!(session.started_at_ms(), Some(1_003_000));
        assert_eq!(session.distance_m(), 0.0);
        assert_eq!(session.metrics().stamina_percent, 100.0);
    }

    #[test]
    fn permission_denied_keeps_idle() {
        let (mut engine, source, ticker, _) = engine_with(ReplaySource::denied(), 3);
        assert_eq!(
            engine.start(ActivityType::Running),
            Err(SessionError::PermissionDenied)
        );
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert_eq!(ticker.arm_calls(), 0);
        assert_eq!(source.subscribe_calls(), 0);
    }

    #[test]
    fn rep_activities_skip_location() {
        let (mut engine, source, _, _) = engine_with(ReplaySource::denied(), 0);
        engine.start(ActivityType::PushUps).unwrap();
        assert_eq!(engine.phase(), SessionPhase::Active);
        assert_eq!(source.subscribe_calls(), 0);
    }

    #[test]
    fn subscribe_failure_aborts_to_idle() {
        let source = ReplaySource::granted();
        source.fail_subscribe("watcher unavailable");
        let (mut engine, _, ticker, _) = engine_with(source, 1);
        engine.start(ActivityType::Running).unwrap();

        assert!(matches!(engine.tick(), Some(Event::SessionAborted { .. })));
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(!ticker.is_armed());
    }

    #[test]
    fn invalid_transitions_leave_state_unchanged() {
        let (mut engine, _, _, _) = engine_with(ReplaySource::granted(), 2);
        assert!(matches!(
            engine.stop(),
            Err(SessionError::InvalidTransition { action: "stop", phase: SessionPhase::Idle })
        ));
        assert!(engine.reset().is_err());

        engine.start(ActivityType::Running).unwrap();
        assert!(matches!(
            engine.start(ActivityType::Running),
            Err(SessionError::InvalidTransition { action: "start", phase: SessionPhase::Preparing })
        ));
        assert!(engine.stop().is_err());
        assert_eq!(engine.phase(), SessionPhase::Preparing);
    }

    #[test]
    fn cancel_during_countdown_returns_to_idle() {
        let (mut engine, source, ticker, _) = engine_with(ReplaySource::granted(), 3);
        engine.start(ActivityType::Running).unwrap();
        engine.tick();
        assert!(matches!(engine.cancel(), Ok(Event::SessionAborted { .. })));
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert!(!ticker.is_armed());
        assert!(!source.is_subscribed());
        assert_eq!(engine.tick(), None);
    }

    #[test]
    fn first_fix_adds_no_distance() {
        let (mut engine, _, _, clock) = active_running();
        assert_eq!(engine.on_fix(GeoFix::new(0.0, 0.0, clock.now_ms())), None);
        clock.advance(5_000);
        match engine.stop() {
            Ok(Event::SessionFinished { summary }) => assert_eq!(summary.distance_meters, 0.0),
            other => panic!("expected SessionFinished, got {other:?}"),
        }
    }

    #[test]
    fn skipped_ticks_do_not_drift() {
        let (mut engine, _, _, clock) = active_running();
        clock.advance(1_000);
        engine.tick();
        assert_eq!(engine.metrics().elapsed_seconds, 1);

        // Two ticks missed; the next one still reads the wall clock.
        clock.advance(3_400);
        engine.tick();
        assert_eq!(engine.metrics().elapsed_seconds, 4);
    }

    #[test]
    fn stamina_decays_per_active_tick() {
        let (mut engine, _, _, clock) = active_running();
        for _ in 0..10 {
            clock.advance(1_000);
            engine.tick();
        }
        assert!((engine.metrics().stamina_percent - 98.0).abs() < 1e-9);
    }

    #[test]
    fn stop_releases_sources_before_freezing() {
        let (mut engine, source, ticker, clock) = active_running();
        engine.on_fix(GeoFix::new(0.0, 0.0, clock.now_ms()));
        engine.on_fix(GeoFix::new(0.0, 0.001, clock.now_ms()));
        engine.stop().unwrap();

        assert!(!source.is_subscribed());
        assert!(!ticker.is_armed());
        let frozen = engine.summary().unwrap().distance_meters;

        assert_eq!(engine.on_fix(GeoFix::new(0.0, 0.01, clock.now_ms())), None);
        clock.advance(10_000);
        assert_eq!(engine.tick(), None);
        assert_eq!(engine.session().unwrap().distance_m(), frozen);
    }

    #[test]
    fn stop_twice_is_reported_not_fatal() {
        let (mut engine, source, ticker, _) = active_running();
        engine.stop().unwrap();
        assert!(matches!(
            engine.stop(),
            Err(SessionError::InvalidTransition { phase: SessionPhase::Finished, .. })
        ));
        assert_eq!(engine.phase(), SessionPhase::Finished);
        assert_eq!(source.unsubscribe_calls(), 1);
        assert_eq!(ticker.disarm_calls(), 1);
    }

    #[test]
    fn reps_and_measurements_score_their_activities() {
        let (mut engine, _, _, clock) = engine_with(ReplaySource::granted(), 0);
        engine.start(ActivityType::PushUps).unwrap();
        for _ in 0..61 {
            engine.record_rep().unwrap();
        }
        clock.advance(60_000);
        let Ok(Event::SessionFinished { summary }) = engine.stop() else {
            panic!("stop failed");
        };
        assert_eq!(summary.rep_count, Some(61));
        assert_eq!(summary.derived_score, 61.0);
        assert_eq!(summary.tier, Tier::Advanced);
        engine.reset().unwrap();

        engine.start(ActivityType::HighJump).unwrap();
        engine.record_measurement(120.0).unwrap();
        engine.record_measurement(f64::NAN).unwrap();
        engine.record_measurement(165.0).unwrap();
        engine.record_measurement(150.0).unwrap();
        let Ok(Event::SessionFinished { summary }) = engine.stop() else {
            panic!("stop failed");
        };
        assert_eq!(summary.derived_score, 165.0);
        assert_eq!(summary.rep_count, None);
        assert_eq!(summary.tier, Tier::Advanced);
    }

    #[test]
    fn negative_zero_measurement_scores_as_zero() {
        let (mut engine, _, _, _) = engine_with(ReplaySource::granted(), 0);
        engine.start(ActivityType::LongJump).unwrap();
        engine.record_measurement(-0.0).unwrap();
        let Ok(Event::SessionFinished { summary }) = engine.stop() else {
            panic!("stop failed");
        };
        assert_eq!(summary.derived_score, 0.0);
        assert!(summary.derived_score.is_sign_positive());
    }

    #[test]
    fn media_reference_reaches_summary() {
        let (mut engine, _, _, _) = active_running();
        assert!(engine.attach_media("videos/abc.mp4").is_ok());
        engine.stop().unwrap();
        assert_eq!(engine.summary().unwrap().media_ref.as_deref(), Some("videos/abc.mp4"));
        engine.attach_media("videos/def.mp4").unwrap();
        assert_eq!(engine.summary().unwrap().media_ref.as_deref(), Some("videos/def.mp4"));
    }

    #[test]
    fn archive_persists_then_resets() {
        let (mut engine, _, _, _) = active_running();
        let mut repo = MemoryRepository::default();
        assert!(engine.archive(&mut repo).is_err());

        engine.stop().unwrap();
        let summary = engine.archive(&mut repo).unwrap();
        assert_eq!(repo.saved, vec![summary]);
        assert_eq!(engine.phase(), SessionPhase::Idle);
    }

    #[test]
    fn shutdown_while_active_finishes_session() {
        let (mut engine, source, ticker, _) = active_running();
        assert!(engine.shutdown().is_some());
        assert_eq!(engine.phase(), SessionPhase::Finished);
        assert!(!source.is_subscribed());
        assert!(!ticker.is_armed());
        assert!(engine.shutdown().is_none());
    }

    #[test]
    fn dropping_engine_releases_subscription() {
        let (engine, source, ticker, _) = active_running();
        assert!(source.is_subscribed());
        drop(engine);
        assert!(!source.is_subscribed());
        assert!(!ticker.is_armed());
    }

    #[test]
    fn snapshot_reports_phase() {
        let (engine, _, _, _) = engine_with(ReplaySource::granted(), 3);
        match engine.snapshot() {
            Event::StateSnapshot { phase, activity, metrics, .. } => {
                assert_eq!(phase, SessionPhase::Idle);
                assert_eq!(activity, None);
                assert_eq!(metrics.stamina_percent, 100.0);
            }
            other => panic!("Expected StateSnapshot, got {other:?}"),
        }
    }
}
