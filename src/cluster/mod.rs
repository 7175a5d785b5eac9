//! Cluster Module
//!
//! Interfaces to the collaborators a region cache talks to: cluster membership,
//! named map configuration and the broadcast channel subsystem. `local` holds
//! an in-process implementation of all three.

mod channel;
pub mod local;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ConfigLookup;

pub use channel::{
    ChannelSubsystem, Delivery, Envelope, InvalidationMessage, ListenerId, MessageListener,
};

/// Identity of one cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for MemberId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Live view of the local member's identity.
pub trait Membership: Send + Sync {
    /// Queried on every use; implementations must reflect the current view.
    fn local_member(&self) -> MemberId;
}

/// Handle onto the cluster a region cache runs in.
pub trait ClusterHandle<M>: Membership {
    /// Looks up the named map configuration for `name`.
    fn find_map_config(&self, name: &str) -> ConfigLookup;

    /// Channel subsystem used to broadcast invalidations.
    fn channels(&self) -> Arc<dyn ChannelSubsystem<M>>;
}
