//! Cooperative async host loop for a session.
//!
//! [`SessionDriver`] runs the engine on a single task. It multiplexes host
//! commands, location fixes and the ticker interval with `tokio::select!`.
//! Everything executes on the caller's task, so fixes and ticks are applied one
//! at a time in the order they are received. No extra task is spawned.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::clock::{Clock, ClockTicker, SystemClock};
use crate::error::SessionError;
use crate::events::Event;
use crate::geo::{GeoFix, GeoSampleSource};
use crate::ranking::{ActivityType, PerformanceClassifier};
use crate::session::{
    EngineSettings, SessionEngine, SessionPhase, SessionSummary, MAX_TICK_INTERVAL_MS,
};

/// Host requests delivered to a running driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Stop,
    Cancel,
    RecordRep,
    RecordMeasurement(f64),
    AttachMedia(String),
}

/// Clock backed by tokio's time source, so paused-time tests control it.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    base_ms: u64,
    base: Instant,
}

impl TokioClock {
    /// A clock reading `base_ms` now.
    pub fn new(base_ms: u64) -> Self {
        Self {
            base_ms,
            base: Instant::now(),
        }
    }

    /// A clock anchored at the current wall-clock time.
    pub fn from_system() -> Self {
        Self::new(SystemClock.now_ms())
    }
}

impl Clock for TokioClock {
    fn now_ms(&self) -> u64 {
        self.base_ms
            .saturating_add(self.base.elapsed().as_millis() as u64)
    }
}

/// Ticker state shared between the engine and the driver loop. The engine
/// arms and disarms it; the driver turns that into a tokio interval.
#[derive(Debug, Clone, Default)]
pub struct SharedTicker {
    interval_ms: Rc<Cell<Option<u64>>>,
}

impl SharedTicker {
    pub fn interval_ms(&self) -> Option<u64> {
        self.interval_ms.get()
    }
}

impl ClockTicker for SharedTicker {
    fn arm(&mut self, interval_ms: u64) {
        self.interval_ms
            .set(Some(interval_ms.clamp(1, MAX_TICK_INTERVAL_MS)));
    }

    fn disarm(&mut self) {
        self.interval_ms.set(None);
    }

    fn is_armed(&self) -> bool {
        self.interval_ms.get().is_some()
    }
}

pub struct SessionDriver<G: GeoSampleSource, C: Clock> {
    engine: SessionEngine<G, SharedTicker, C>,
    ticker: SharedTicker,
    events: Option<mpsc::UnboundedSender<Event>>,
}

impl<G: GeoSampleSource, C: Clock> SessionDriver<G, C> {
    pub fn new(source: G, clock: C, settings: EngineSettings) -> Self {
        let ticker = SharedTicker::default();
        let engine = SessionEngine::new(source, ticker.clone(), clock).with_settings(settings);
        Self {
            engine,
            ticker,
            events: None,
        }
    }

    pub fn with_classifier(mut self, classifier: PerformanceClassifier) -> Self {
        self.engine = self.engine.with_classifier(classifier);
        self
    }

    /// Forward every engine event to `tx`.
    pub fn with_events(mut self, tx: mpsc::UnboundedSender<Event>) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn engine(&self) -> &SessionEngine<G, SharedTicker, C> {
        &self.engine
    }

    /// Run one session to completion.
    ///
    /// Returns the summary once the session finishes, or `None` if it went
    /// back to `Idle` (cancelled, or the source failed). Closing the command
    /// channel counts as host teardown and finishes an active session. A
    /// closed fix channel is a signal gap and changes nothing else.
    pub async fn run(
        &mut self,
        activity: ActivityType,
        mut fixes: mpsc::UnboundedReceiver<GeoFix>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) -> Result<Option<SessionSummary>, SessionError> {
        let started = self.engine.start(activity)?;
        self.emit(started);

        let mut interval: Option<(u64, Interval)> = None;
        let mut fixes_open = true;

        loop {
            match self.engine.phase() {
                SessionPhase::Finished => return Ok(self.engine.summary().cloned()),
                SessionPhase::Idle => return Ok(None),
                SessionPhase::Preparing | SessionPhase::Active => {}
            }
            sync_interval(&mut interval, self.ticker.interval_ms());

            tokio::select! {
                biased;

                cmd = commands.recv() => match cmd {
                    Some(cmd) => self.apply(cmd),
                    None => {
                        debug!("command channel closed; tearing down session");
                        if let Some(summary) = self.engine.shutdown() {
                            self.emit(Event::SessionFinished { summary });
                        }
                    }
                },
                fix = fixes.recv(), if fixes_open => match fix {
                    Some(fix) => {
                        if let Some(event) = self.engine.on_fix(fix) {
                            self.emit(event);
                        }
                    }
                    None => fixes_open = false,
                },
                _ = next_tick(&mut interval) => {
                    if let Some(event) = self.engine.tick() {
                        self.emit(event);
                    }
                }
            }
        }
    }

    fn apply(&mut self, cmd: Command) {
        let result = match cmd {
            Command::Stop => self.engine.stop().map(Some),
            Command::Cancel => self.engine.cancel().map(Some),
            Command::RecordRep => self.engine.record_rep().map(Some),
            Command::RecordMeasurement(value) => self.engine.record_measurement(value),
            Command::AttachMedia(reference) => self.engine.attach_media(reference).map(|()| None),
        };
        // Rejections are already logged by the engine.
        if let Ok(Some(event)) = result {
            self.emit(event);
        }
    }

    fn emit(&self, event: Event) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }
}

fn sync_interval(slot: &mut Option<(u64, Interval)>, wanted: Option<u64>) {
    let current = slot.as_ref().map(|(ms, _)| *ms);
    if current == wanted {
        return;
    }
    *slot = wanted.map(|ms| {
        let period = Duration::from_millis(ms);
        let now = Instant::now();
        let mut iv = interval_at(now.checked_add(period).unwrap_or(now), period);
        iv.set_missed_tick_behavior(MissedTickBehavior::Skip);
        (ms, iv)
    });
}

async fn next_tick(slot: &mut Option<(u64, Interval)>) {
    match slot {
        Some((_, iv)) => {
            iv.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
