use anyhow::Result;
use async_trait::async_trait;

use crate::domain::event::ClipboardEvent;

/// The poll driver's view of the hub connection.
///
/// Only the operations the poll driver needs: pushing events and consulting
/// the dedup cache. The push-channel consumer lives on the concrete client
/// because it owns the socket type.
#[async_trait]
pub trait RemoteSyncTrait: Send + Sync {
    async fn push(&self, event: &ClipboardEvent) -> Result<()>;

    fn is_cached(&self, id: &str) -> bool;

    fn cache(&self, id: &str);

    fn prune_cache(&self);
}
