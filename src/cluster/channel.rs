//! Invalidation messages and the broadcast channel interface.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cluster::MemberId;
use crate::error::Result;

/// Invalidation broadcast to every member caching the same region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvalidationMessage<K, Ver> {
    /// Drop one key; `version` is the version the publisher wrote, if any
    Single { key: K, version: Option<Ver> },
    /// Drop every entry written before `cutoff_ms` (Unix milliseconds)
    Timestamp { cutoff_ms: u64 },
    /// Drop everything
    Clear,
}

impl<K, Ver> InvalidationMessage<K, Ver> {
    pub fn single(key: K) -> Self {
        Self::Single { key, version: None }
    }

    pub fn versioned(key: K, version: Ver) -> Self {
        Self::Single {
            key,
            version: Some(version),
        }
    }
}

/// Registration handle returned by `ChannelSubsystem::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One message as delivered by the transport.
///
/// The origin and the payload are read separately so a listener can drop a
/// delivery without ever decoding it.
pub trait Delivery<M> {
    fn publishing_member(&self) -> MemberId;

    /// Decodes the payload; fails with `CacheError::MalformedPayload` when the
    /// transport carried something unrecognizable.
    fn payload(&self) -> Result<M>;
}

/// Callback registered with the channel subsystem.
///
/// May be invoked on a transport-owned thread, concurrently with callers and
/// with other deliveries.
pub trait MessageListener<M>: Send + Sync {
    fn on_message(&self, delivery: &dyn Delivery<M>);
}

/// Named broadcast channels.
///
/// Publishing is best effort: no delivery guarantee, no acknowledgment.
/// Messages reach every subscriber of a name, the publisher's own process
/// included, tagged with the publishing member.
pub trait ChannelSubsystem<M>: Send + Sync {
    fn subscribe(&self, name: &str, listener: Arc<dyn MessageListener<M>>) -> ListenerId;

    fn publish(&self, name: &str, message: M);

    /// Returns false if `id` was not subscribed to `name`.
    fn unsubscribe(&self, name: &str, id: ListenerId) -> bool;
}

/// Delivery of an already-decoded message.
#[derive(Debug, Clone)]
pub struct Envelope<M> {
    pub origin: MemberId,
    pub message: M,
}

impl<M: Clone> Delivery<M> for Envelope<M> {
    fn publishing_member(&self) -> MemberId {
        self.origin
    }

    fn payload(&self) -> Result<M> {
        Ok(self.message.clone())
    }
}
