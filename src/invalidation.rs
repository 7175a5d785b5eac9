//! Invalidation Channel Binding
//!
//! Ties a region cache to the broadcast channel named after it. The binding
//! moves `Unsubscribed -> Subscribed -> Detached` and never back; the listener
//! it registers applies peer invalidations to the local store and drops
//! everything this member published itself.

use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::cache::CacheStore;
use crate::cluster::{
    ChannelSubsystem, Delivery, InvalidationMessage, ListenerId, Membership, MessageListener,
};

/// Lifecycle of a channel binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingState {
    Unsubscribed,
    Subscribed,
    Detached,
}

// == Listener Gate ==
/// Shared flag telling a listener whether its binding is still subscribed.
///
/// Closed on detach so deliveries already in flight are dropped too.
#[derive(Debug, Clone, Default)]
pub struct ListenerGate(Arc<AtomicBool>);

impl ListenerGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn open(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn close(&self) {
        self.0.store(false, Ordering::Release);
    }
}

struct Subscription<M> {
    channels: Arc<dyn ChannelSubsystem<M>>,
    id: ListenerId,
}

enum Slot<M> {
    Unsubscribed,
    Subscribed(Subscription<M>),
    Detached,
}

// == Channel Binding ==
/// Scoped subscription to one named channel.
///
/// Dropping the binding detaches the listener.
pub struct ChannelBinding<M> {
    name: String,
    slot: Mutex<Slot<M>>,
    gate: ListenerGate,
}

impl<M> ChannelBinding<M> {
    /// A binding that never subscribed. Publishing through it is a no-op.
    pub fn unsubscribed(name: &str) -> Self {
        Self {
            name: name.to_string(),
            slot: Mutex::new(Slot::Unsubscribed),
            gate: ListenerGate::new(),
        }
    }

    /// Registers `listener` on the channel `name`.
    ///
    /// `gate` must be the gate the listener checks; it is opened here and
    /// closed on detach.
    pub fn subscribe(
        name: &str,
        channels: Arc<dyn ChannelSubsystem<M>>,
        listener: Arc<dyn MessageListener<M>>,
        gate: ListenerGate,
    ) -> Self {
        gate.open();
        let id = channels.subscribe(name, listener);
        info!("Region '{}' subscribed to invalidation channel (listener {})", name, id);

        Self {
            name: name.to_string(),
            slot: Mutex::new(Slot::Subscribed(Subscription { channels, id })),
            gate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BindingState {
        match &*self.slot.lock() {
            Slot::Unsubscribed => BindingState::Unsubscribed,
            Slot::Subscribed(_) => BindingState::Subscribed,
            Slot::Detached => BindingState::Detached,
        }
    }

    /// Publishes `message` if subscribed. Best effort; returns whether it was
    /// handed to the channel subsystem.
    pub fn publish(&self, message: M) -> bool {
        let channels = match &*self.slot.lock() {
            Slot::Subscribed(subscription) => Arc::clone(&subscription.channels),
            _ => return false,
        };
        channels.publish(&self.name, message);
        true
    }

    /// Closes the listener gate without unsubscribing.
    ///
    /// Called under the store lock, a delivery that has not yet applied its
    /// change will see the gate closed once it takes that lock.
    pub fn close_gate(&self) {
        self.gate.close();
    }

    // == Detach ==
    /// Removes the listener from the channel. Only a subscribed binding
    /// changes state; returns whether it did.
    pub fn detach(&self) -> bool {
        let subscription = {
            let mut slot = self.slot.lock();
            match std::mem::replace(&mut *slot, Slot::Detached) {
                Slot::Subscribed(subscription) => subscription,
                other => {
                    *slot = other;
                    return false;
                }
            }
        };

        self.gate.close();
        if !subscription.channels.unsubscribe(&self.name, subscription.id) {
            warn!(
                "Listener {} for region '{}' was already gone from the channel",
                subscription.id, self.name
            );
        }
        info!("Region '{}' detached from invalidation channel", self.name);
        true
    }
}

impl<M> Drop for ChannelBinding<M> {
    fn drop(&mut self) {
        self.detach();
    }
}

impl<M> fmt::Debug for ChannelBinding<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelBinding")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

// == Invalidation Listener ==
/// Applies peer invalidations to a local store.
pub struct InvalidationListener<K, V, Ver, H: ?Sized> {
    region: String,
    store: Arc<Mutex<CacheStore<K, V, Ver>>>,
    membership: Arc<H>,
    gate: ListenerGate,
}

impl<K, V, Ver, H> InvalidationListener<K, V, Ver, H>
where
    H: Membership + ?Sized,
{
    pub fn new(
        region: &str,
        store: Arc<Mutex<CacheStore<K, V, Ver>>>,
        membership: Arc<H>,
        gate: ListenerGate,
    ) -> Self {
        Self {
            region: region.to_string(),
            store,
            membership,
            gate,
        }
    }
}

impl<K, V, Ver, H> MessageListener<InvalidationMessage<K, Ver>>
    for InvalidationListener<K, V, Ver, H>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync,
    V: Clone + Send + Sync,
    Ver: Clone + Send + Sync,
    H: Membership + ?Sized,
{
    fn on_message(&self, delivery: &dyn Delivery<InvalidationMessage<K, Ver>>) {
        if !self.gate.is_open() {
            trace!("Region '{}' is detached, dropping delivery", self.region);
            return;
        }

        // Own writes are already applied; decide before touching the payload
        if delivery.publishing_member() == self.membership.local_member() {
            trace!("Region '{}' ignoring self-published invalidation", self.region);
            return;
        }

        let message = match delivery.payload() {
            Ok(message) => message,
            Err(err) => {
                warn!("Region '{}' ignoring invalidation: {}", self.region, err);
                return;
            }
        };

        let mut store = self.store.lock();
        // Detach may have closed the gate while this delivery was decoding
        if !self.gate.is_open() {
            trace!("Region '{}' detached mid-delivery, dropping it", self.region);
            return;
        }
        let dropped = match message {
            InvalidationMessage::Single { key, version } => {
                let removed = usize::from(store.invalidate(&key, version.as_ref()));
                debug!("Region '{}' invalidated {:?} ({} removed)", self.region, key, removed);
                removed
            }
            InvalidationMessage::Timestamp { cutoff_ms } => {
                let removed = store.remove_written_before(cutoff_ms);
                debug!(
                    "Region '{}' dropped {} entries written before {}",
                    self.region, removed, cutoff_ms
                );
                removed
            }
            InvalidationMessage::Clear => {
                let removed = store.clear();
                debug!("Region '{}' cleared by peer ({} removed)", self.region, removed);
                removed
            }
        };
        store.record_invalidations(dropped);
    }
}
