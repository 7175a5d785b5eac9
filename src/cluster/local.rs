//! In-Process Cluster
//!
//! A channel hub shared by several members living in one process, plus a
//! per-member `ClusterHandle` over it. Deliveries run synchronously on the
//! publisher's thread.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::cluster::{
    ChannelSubsystem, ClusterHandle, Envelope, ListenerId, MemberId, Membership, MessageListener,
};
use crate::config::{ConfigLookup, MapConfig};

type Subscribers<M> = Vec<(ListenerId, Arc<dyn MessageListener<M>>)>;

// == Hub ==
/// Name -> subscriber table shared by every member of an in-process cluster.
pub struct InProcessHub<M> {
    topics: RwLock<HashMap<String, Subscribers<M>>>,
}

impl<M> InProcessHub<M>
where
    M: Clone + Send + Sync + 'static,
{
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            topics: RwLock::new(HashMap::new()),
        })
    }

    pub fn subscriber_count(&self, name: &str) -> usize {
        self.topics.read().get(name).map_or(0, Vec::len)
    }

    fn subscribe(&self, name: &str, listener: Arc<dyn MessageListener<M>>) -> ListenerId {
        let id = ListenerId::random();
        self.topics
            .write()
            .entry(name.to_string())
            .or_default()
            .push((id, listener));
        debug!("Listener {} subscribed to '{}'", id, name);
        id
    }

    fn unsubscribe(&self, name: &str, id: ListenerId) -> bool {
        let mut topics = self.topics.write();
        let Some(subscribers) = topics.get_mut(name) else {
            return false;
        };
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        let removed = subscribers.len() != before;
        if subscribers.is_empty() {
            topics.remove(name);
        }
        if removed {
            debug!("Listener {} unsubscribed from '{}'", id, name);
        }
        removed
    }

    fn deliver(&self, name: &str, origin: MemberId, message: M) {
        // Snapshot so listeners may (un)subscribe while being called
        let subscribers: Vec<Arc<dyn MessageListener<M>>> = self
            .topics
            .read()
            .get(name)
            .map(|subs| subs.iter().map(|(_, listener)| Arc::clone(listener)).collect())
            .unwrap_or_default();

        trace!(
            "Delivering message on '{}' from {} to {} subscriber(s)",
            name,
            origin,
            subscribers.len()
        );
        for listener in subscribers {
            let envelope = Envelope {
                origin,
                message: message.clone(),
            };
            listener.on_message(&envelope);
        }
    }
}

// == Member Channels ==
/// A member's view of the hub: publishes are tagged with the member's current
/// identity.
struct MemberChannels<M> {
    hub: Arc<InProcessHub<M>>,
    member: Arc<RwLock<MemberId>>,
}

impl<M> ChannelSubsystem<M> for MemberChannels<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn subscribe(&self, name: &str, listener: Arc<dyn MessageListener<M>>) -> ListenerId {
        self.hub.subscribe(name, listener)
    }

    fn publish(&self, name: &str, message: M) {
        let origin = *self.member.read();
        self.hub.deliver(name, origin, message);
    }

    fn unsubscribe(&self, name: &str, id: ListenerId) -> bool {
        self.hub.unsubscribe(name, id)
    }
}

// == Cluster Handle ==
/// One member of an in-process cluster.
pub struct InProcessCluster<M> {
    hub: Arc<InProcessHub<M>>,
    member: Arc<RwLock<MemberId>>,
    map_configs: HashMap<String, MapConfig>,
    default_map_config: MapConfig,
    lite: bool,
}

impl<M> InProcessCluster<M>
where
    M: Clone + Send + Sync + 'static,
{
    /// Joins `hub` as a new member with a random identity. Names without a
    /// dedicated map configuration get the one loaded from the environment.
    pub fn join(hub: Arc<InProcessHub<M>>) -> Self {
        Self {
            hub,
            member: Arc::new(RwLock::new(MemberId::random())),
            map_configs: HashMap::new(),
            default_map_config: MapConfig::from_env(),
            lite: false,
        }
    }

    pub fn with_map_config(mut self, name: &str, config: MapConfig) -> Self {
        self.map_configs.insert(name.to_string(), config);
        self
    }

    /// Configuration returned for names without a dedicated entry.
    pub fn with_default_map_config(mut self, config: MapConfig) -> Self {
        self.default_map_config = config;
        self
    }

    /// Lite members cannot serve configuration lookups.
    pub fn lite(mut self) -> Self {
        self.lite = true;
        self
    }

    /// Takes a fresh identity, as after leaving and rejoining the cluster.
    pub fn rejoin(&self) -> MemberId {
        let id = MemberId::random();
        *self.member.write() = id;
        id
    }
}

impl<M> Membership for InProcessCluster<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn local_member(&self) -> MemberId {
        *self.member.read()
    }
}

impl<M> ClusterHandle<M> for InProcessCluster<M>
where
    M: Clone + Send + Sync + 'static,
{
    fn find_map_config(&self, name: &str) -> ConfigLookup {
        if self.lite {
            return ConfigLookup::Unsupported;
        }
        let config = self
            .map_configs
            .get(name)
            .copied()
            .unwrap_or(self.default_map_config);
        ConfigLookup::Found(config)
    }

    fn channels(&self) -> Arc<dyn ChannelSubsystem<M>> {
        Arc::new(MemberChannels {
            hub: Arc::clone(&self.hub),
            member: Arc::clone(&self.member),
        })
    }
}
