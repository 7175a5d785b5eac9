//! TTL Cleanup Task
//!
//! Background task that periodically purges expired entries from a region
//! cache. Reads already treat expired entries as absent; the sweep only bounds
//! how long they occupy memory.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::region::LocalRegionCache;

/// Spawns a task that calls `cache.cleanup()` every `interval`.
///
/// # Returns
/// A JoinHandle the owner aborts on shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(LocalRegionCache::<String, String>::new("users", None, None, false)?);
/// let cleanup_handle = spawn_cleanup_task(Arc::clone(&cache), Duration::from_secs(1));
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<K, V, Ver>(
    cache: Arc<LocalRegionCache<K, V, Ver>>,
    interval: Duration,
) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    Ver: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            "Starting TTL cleanup for region '{}' every {:?}",
            cache.name(),
            interval
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = cache.cleanup();
            if removed > 0 {
                info!(
                    "TTL cleanup: removed {} expired entries from '{}'",
                    removed,
                    cache.name()
                );
            } else {
                debug!("TTL cleanup: no expired entries in '{}'", cache.name());
            }
        }
    })
}
