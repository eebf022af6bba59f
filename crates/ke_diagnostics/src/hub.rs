//! Ring-buffered event stream with synchronous fan-out.

use std::collections::{HashSet, VecDeque};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::event::{DiagnosticEvent, Level};

type SubscriberFn = Box<dyn FnMut(&DiagnosticEvent) + Send>;

/// Opaque unsubscribe token returned by [`DiagnosticHub::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberToken(u64);

struct HubInner {
    capacity: usize,
    enabled: bool,
    ring: VecDeque<DiagnosticEvent>,
    subscribers: Vec<(u64, SubscriberFn)>,
    pending_removal: HashSet<u64>,
    next_token: u64,
}

/// Bounded ring buffer of [`DiagnosticEvent`]s with subscriber fan-out.
///
/// The hub is a cheap cloneable handle; every subsystem that emits holds
/// one. Fan-out is synchronous and in subscription order; a subscriber
/// that panics is logged at warning level and retained.
///
/// When the buffer is full the oldest event is evicted. A disabled hub
/// drops events on emission but keeps its subscription surface working.
#[derive(Clone)]
pub struct DiagnosticHub {
    inner: Arc<Mutex<HubInner>>,
}

impl DiagnosticHub {
    pub fn new(capacity: usize, enabled: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HubInner {
                capacity: capacity.max(1),
                enabled,
                ring: VecDeque::new(),
                subscribers: Vec::new(),
                pending_removal: HashSet::new(),
                next_token: 1,
            })),
        }
    }

    /// Append one event and fan it out to all subscribers.
    pub fn emit_fast(
        &self,
        category: &str,
        name: &str,
        tick: u64,
        value: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        self.emit_with_level(Level::Info, category, name, tick, value, metadata);
    }

    pub fn emit_with_level(
        &self,
        level: Level,
        category: &str,
        name: &str,
        tick: u64,
        value: serde_json::Value,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) {
        let event = {
            let mut inner = self.inner.lock();
            if !inner.enabled {
                return;
            }
            let event = DiagnosticEvent::new(category, name, tick, level, value, metadata);
            if inner.ring.len() >= inner.capacity {
                inner.ring.pop_front();
            }
            inner.ring.push_back(event.clone());
            event
        };
        self.fan_out(&event);
    }

    /// Subscribe a callback; it observes events in emission order.
    pub fn subscribe(&self, callback: impl FnMut(&DiagnosticEvent) + Send + 'static) -> SubscriberToken {
        let mut inner = self.inner.lock();
        let token = inner.next_token;
        inner.next_token += 1;
        inner.subscribers.push((token, Box::new(callback)));
        SubscriberToken(token)
    }

    /// Remove a subscriber. Idempotent.
    pub fn unsubscribe(&self, token: SubscriberToken) {
        let mut inner = self.inner.lock();
        let before = inner.subscribers.len();
        inner.subscribers.retain(|(id, _)| *id != token.0);
        if inner.subscribers.len() == before {
            // Possibly taken out for an in-flight fan-out; remove on merge.
            inner.pending_removal.insert(token.0);
        }
    }

    /// A copy of matching events, most recent first, capped by `limit`.
    pub fn snapshot(
        &self,
        limit: Option<usize>,
        category: Option<&str>,
        name: Option<&str>,
    ) -> Vec<DiagnosticEvent> {
        let inner = self.inner.lock();
        let mut events: Vec<DiagnosticEvent> = inner
            .ring
            .iter()
            .rev()
            .filter(|event| category.map_or(true, |category| event.category == category))
            .filter(|event| name.map_or(true, |name| event.name == name))
            .cloned()
            .collect();
        if let Some(limit) = limit {
            events.truncate(limit);
        }
        events
    }

    /// The last `limit` events in chronological order (for crash bundles).
    pub fn recent_events(&self, limit: usize) -> Vec<DiagnosticEvent> {
        let inner = self.inner.lock();
        let skip = inner.ring.len().saturating_sub(limit);
        inner.ring.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().ring.is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    // Invoke subscribers without holding the lock, so a callback may
    // subscribe, unsubscribe or emit without deadlocking. Callbacks that
    // panic are logged and kept.
    fn fan_out(&self, event: &DiagnosticEvent) {
        let mut subscribers = std::mem::take(&mut self.inner.lock().subscribers);
        for (token, callback) in &mut subscribers {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(event)));
            if result.is_err() {
                ke_log::warn!(
                    "diagnostics subscriber {token} panicked on {:?}; subscriber retained",
                    event.name
                );
            }
        }
        let mut inner = self.inner.lock();
        // Callbacks may have subscribed new entries in the meantime.
        let added = std::mem::take(&mut inner.subscribers);
        subscribers.extend(added);
        let removed = std::mem::take(&mut inner.pending_removal);
        subscribers.retain(|(token, _)| !removed.contains(token));
        inner.subscribers = subscribers;
    }
}
