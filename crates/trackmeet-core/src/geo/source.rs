use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Outcome of a location permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Granted,
    Denied,
}

/// Opaque token returned by [`GeoSampleSource::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionHandle(pub u64);

/// Push-based stream of geolocation fixes.
///
/// The source only manages permission and the subscription lifecycle. Fixes
/// themselves are delivered by the host to `SessionEngine::on_fix` in arrival
/// order. `unsubscribe` must have fully released the platform watcher by the
/// time it returns; platforms with asynchronous removal wait for it inside the
/// implementation.
pub trait GeoSampleSource {
    fn request_permission(&mut self) -> Permission;

    /// Begin watching. `min_distance_m` is the platform's movement filter.
    fn subscribe(&mut self, min_distance_m: f64) -> Result<SubscriptionHandle, SourceError>;

    fn unsubscribe(&mut self, handle: SubscriptionHandle);
}

/// In-process source used for track replay and tests.
///
/// Clones share state, so a caller can keep a probe after moving the source
/// into an engine.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    inner: Rc<RefCell<ReplayState>>,
}

#[derive(Debug, Default)]
struct ReplayState {
    denied: bool,
    fail_subscribe: Option<String>,
    next_handle: u64,
    active: Option<SubscriptionHandle>,
    min_distance_m: Option<f64>,
    subscribe_calls: u32,
    unsubscribe_calls: u32,
}

impl ReplaySource {
    /// A source that grants permission.
    pub fn granted() -> Self {
        Self::default()
    }

    /// A source whose permission request is refused.
    pub fn denied() -> Self {
        let source = Self::default();
        source.inner.borrow_mut().denied = true;
        source
    }

    /// Make the next `subscribe` calls fail with `reason`.
    pub fn fail_subscribe(&self, reason: impl Into<String>) {
        self.inner.borrow_mut().fail_subscribe = Some(reason.into());
    }

    pub fn active_subscription(&self) -> Option<SubscriptionHandle> {
        self.inner.borrow().active
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.borrow().active.is_some()
    }

    pub fn min_distance_m(&self) -> Option<f64> {
        self.inner.borrow().min_distance_m
    }

    pub fn subscribe_calls(&self) -> u32 {
        self.inner.borrow().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> u32 {
        self.inner.borrow().unsubscribe_calls
    }
}

impl GeoSampleSource for ReplaySource {
    fn request_permission(&mut self) -> Permission {
        if self.inner.borrow().denied {
            Permission::Denied
        } else {
            Permission::Granted
        }
    }

    fn subscribe(&mut self, min_distance_m: f64) -> Result<SubscriptionHandle, SourceError> {
        let mut state = self.inner.borrow_mut();
        state.subscribe_calls += 1;
        if let Some(reason) = state.fail_subscribe.clone() {
            return Err(SourceError::Unavailable(reason));
        }
        state.next_handle += 1;
        let handle = SubscriptionHandle(state.next_handle);
        state.active = Some(handle);
        state.min_distance_m = Some(min_distance_m);
        Ok(handle)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        let mut state = self.inner.borrow_mut();
        state.unsubscribe_calls += 1;
        if state.active == Some(handle) {
            state.active = None;
        }
    }
}
