//! Time sources for the session engine.
//!
//! The engine never reads the platform clock directly. Elapsed time comes from
//! a [`Clock`], and the periodic refresh is owned by a [`ClockTicker`] that
//! the engine arms and disarms. The host delivers each tick by calling
//! `SessionEngine::tick()`.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use chrono::{DateTime, Utc};

/// Wall-clock source in epoch milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Scheduling source for periodic refresh.
///
/// Implementations only track whether ticks should be produced and at what
/// interval. `disarm` must be idempotent.
pub trait ClockTicker {
    fn arm(&mut self, interval_ms: u64);
    fn disarm(&mut self);
    fn is_armed(&self) -> bool;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Settable clock shared between the engine and its driver.
///
/// Clones observe the same instant, so a test can keep one handle and move
/// the other into the engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.set(self.now.get().saturating_add(delta_ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

/// Ticker whose state is visible through clones.
///
/// Records every arm/disarm so tests can assert teardown happened.
#[derive(Debug, Clone, Default)]
pub struct ManualTicker {
    inner: Rc<RefCell<TickerState>>,
}

#[derive(Debug, Default)]
struct TickerState {
    interval_ms: Option<u64>,
    arm_calls: u32,
    disarm_calls: u32,
}

impl ManualTicker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interval requested by the last `arm`, or `None` while disarmed.
    pub fn interval_ms(&self) -> Option<u64> {
        self.inner.borrow().interval_ms
    }

    pub fn arm_calls(&self) -> u32 {
        self.inner.borrow().arm_calls
    }

    pub fn disarm_calls(&self) -> u32 {
        self.inner.borrow().disarm_calls
    }
}

impl ClockTicker for ManualTicker {
    fn arm(&mut self, interval_ms: u64) {
        let mut state = self.inner.borrow_mut();
        state.interval_ms = Some(interval_ms.max(1));
        state.arm_calls += 1;
    }

    fn disarm(&mut self) {
        let mut state = self.inner.borrow_mut();
        state.interval_ms = None;
        state.disarm_calls += 1;
    }

    fn is_armed(&self) -> bool {
        self.inner.borrow().interval_ms.is_some()
    }
}

/// Convert epoch milliseconds to a UTC timestamp, clamping out-of-range values
/// to the epoch.
pub fn timestamp(ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
