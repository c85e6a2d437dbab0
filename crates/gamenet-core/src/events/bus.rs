//! The [`EventBus`] implementation.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A subscriber callback.
///
/// Identity is the `Arc` allocation: subscribing a clone of the same `Arc`
/// twice for one event is a no-op, while two separately created closures
/// are distinct subscribers even if their code is identical.
pub type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// Identifies the owner of a group of subscriptions (e.g. one UI panel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Creates a fresh, unique owner id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OwnerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct Subscription<A> {
    callback: Callback<A>,
    owner: Option<OwnerId>,
}

struct BusState<E, A> {
    /// Dispatch index: event id → subscriptions in subscription order.
    by_event: HashMap<E, Vec<Subscription<A>>>,
    /// Reverse index for bulk teardown: owner → event ids it subscribed to.
    by_owner: HashMap<OwnerId, Vec<E>>,
    /// Events published with `publish_deferred`, waiting for `drain_once`.
    deferred: VecDeque<(E, A)>,
}

impl<E, A> Default for BusState<E, A> {
    fn default() -> Self {
        Self {
            by_event: HashMap::new(),
            by_owner: HashMap::new(),
            deferred: VecDeque::new(),
        }
    }
}

/// Publish/subscribe bus keyed by event id `E`, delivering arguments `A`.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use gamenet_core::events::{Callback, EventBus, OwnerId};
///
/// let bus: EventBus<&'static str, u32> = EventBus::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let h = Arc::clone(&hits);
/// let cb: Callback<u32> = Arc::new(move |v: &u32| { h.fetch_add(*v as usize, Ordering::SeqCst); });
///
/// let panel = OwnerId::new();
/// bus.subscribe("score", cb, Some(panel));
/// bus.publish_deferred("score", 5);
/// assert_eq!(hits.load(Ordering::SeqCst), 0); // not yet delivered
/// bus.drain_once();
/// assert_eq!(hits.load(Ordering::SeqCst), 5);
///
/// bus.unsubscribe_by_target(panel);
/// assert_eq!(bus.subscriber_count(&"score"), 0);
/// ```
pub struct EventBus<E, A> {
    state: Mutex<BusState<E, A>>,
}

impl<E, A> EventBus<E, A>
where
    E: Eq + Hash + Clone,
{
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BusState::default()),
        }
    }

    /// Registers `callback` for `event`, optionally owned by `owner`.
    ///
    /// Returns `false` (and changes nothing) if the same callback is already
    /// registered for `event`.
    pub fn subscribe(&self, event: E, callback: Callback<A>, owner: Option<OwnerId>) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let subscriptions = state.by_event.entry(event.clone()).or_default();
        if subscriptions
            .iter()
            .any(|s| same_callback(&s.callback, &callback))
        {
            return false;
        }
        subscriptions.push(Subscription { callback, owner });

        if let Some(owner) = owner {
            let events = state.by_owner.entry(owner).or_default();
            if !events.contains(&event) {
                events.push(event);
            }
        }
        true
    }

    /// Removes one callback from `event`.  Returns `true` if it was found.
    pub fn unsubscribe(&self, event: &E, callback: &Callback<A>) -> bool {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(subscriptions) = state.by_event.get_mut(event) else {
            return false;
        };
        let Some(index) = subscriptions
            .iter()
            .position(|s| same_callback(&s.callback, callback))
        else {
            return false;
        };
        let removed = subscriptions.remove(index);

        // Keep the owner index in step: drop `event` from the owner's list
        // only if the owner has no other callback left on it.
        if let Some(owner) = removed.owner {
            let still_owned = subscriptions.iter().any(|s| s.owner == Some(owner));
            if !still_owned {
                remove_owner_event(&mut state.by_owner, owner, event);
            }
        }
        if subscriptions.is_empty() {
            state.by_event.remove(event);
        }
        true
    }

    /// Removes every callback registered for `event`.  Returns how many.
    pub fn unsubscribe_by_event_id(&self, event: &E) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(subscriptions) = state.by_event.remove(event) else {
            return 0;
        };
        for owner in subscriptions.iter().filter_map(|s| s.owner) {
            remove_owner_event(&mut state.by_owner, owner, event);
        }
        subscriptions.len()
    }

    /// Removes every callback owned by `owner`, across all event ids.
    /// Returns how many were removed.
    pub fn unsubscribe_by_target(&self, owner: OwnerId) -> usize {
        let mut guard = self.state.lock();
        let state = &mut *guard;

        let Some(events) = state.by_owner.remove(&owner) else {
            return 0;
        };
        let mut removed = 0;
        for event in events {
            if let Some(subscriptions) = state.by_event.get_mut(&event) {
                let before = subscriptions.len();
                subscriptions.retain(|s| s.owner != Some(owner));
                removed += before - subscriptions.len();
                if subscriptions.is_empty() {
                    state.by_event.remove(&event);
                }
            }
        }
        removed
    }

    /// Synchronously invokes every callback registered for `event`, in
    /// subscription order, on the calling thread.  Returns how many ran.
    pub fn publish_immediate(&self, event: &E, args: &A) -> usize {
        let callbacks: Vec<Callback<A>> = {
            let state = self.state.lock();
            match state.by_event.get(event) {
                Some(subscriptions) => subscriptions
                    .iter()
                    .map(|s| Arc::clone(&s.callback))
                    .collect(),
                None => return 0,
            }
        };
        for callback in &callbacks {
            callback(args);
        }
        callbacks.len()
    }

    /// Queues `event` for delivery by the next [`drain_once`](Self::drain_once).
    pub fn publish_deferred(&self, event: E, args: A) {
        self.state.lock().deferred.push_back((event, args));
    }

    /// Delivers every event queued at the moment of the call, in FIFO order.
    /// Returns how many events were delivered.
    ///
    /// Events deferred by callbacks during this drain wait for the next one,
    /// so a callback that re-publishes cannot make a tick loop forever.
    pub fn drain_once(&self) -> usize {
        let batch = std::mem::take(&mut self.state.lock().deferred);
        let count = batch.len();
        for (event, args) in batch {
            self.publish_immediate(&event, &args);
        }
        count
    }

    /// Number of callbacks registered for `event`.
    pub fn subscriber_count(&self, event: &E) -> usize {
        self.state.lock().by_event.get(event).map_or(0, Vec::len)
    }

    /// Number of deferred events waiting for the next drain.
    pub fn pending_count(&self) -> usize {
        self.state.lock().deferred.len()
    }

    /// Event ids `owner` currently holds subscriptions on.
    pub fn owned_events(&self, owner: OwnerId) -> Vec<E> {
        self.state
            .lock()
            .by_owner
            .get(&owner)
            .cloned()
            .unwrap_or_default()
    }
}

impl<E, A> Default for EventBus<E, A>
where
    E: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<E, A> fmt::Debug for EventBus<E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("EventBus")
            .field("event_ids", &state.by_event.len())
            .field("owners", &state.by_owner.len())
            .field("deferred", &state.deferred.len())
            .finish()
    }
}

fn same_callback<A>(a: &Callback<A>, b: &Callback<A>) -> bool {
    // Compare data pointers only; vtable pointers are not guaranteed unique.
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

fn remove_owner_event<E: PartialEq>(
    by_owner: &mut HashMap<OwnerId, Vec<E>>,
    owner: OwnerId,
    event: &E,
) {
    if let Some(events) = by_owner.get_mut(&owner) {
        events.retain(|e| e != event);
        if events.is_empty() {
            by_owner.remove(&owner);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
