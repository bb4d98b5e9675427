//! Per-domain remote collection contract.

use crate::model::record::{CollectionScope, DomainRecord, RecordPatch};
use crate::remote::{RemoteResult, Subscription};
use async_trait::async_trait;
use std::sync::Arc;

/// Receives the full ordered result set for a scope on every change.
pub type SnapshotCallback<T> = Arc<dyn Fn(Vec<T>) + Send + Sync>;

/// Push-based remote collection for one domain.
#[async_trait]
pub trait RemoteCollection<T: DomainRecord>: Send + Sync {
    /// Opens a listener for `scope`.
    ///
    /// The callback may fire before this call returns (initial snapshot).
    /// Cancelling the returned handle must stop further callbacks.
    fn subscribe_by_scope(
        &self,
        scope: &CollectionScope,
        on_snapshot: SnapshotCallback<T>,
    ) -> RemoteResult<Subscription>;

    /// Writes a new record; the datastore assigns `id` when it is empty.
    async fn create(&self, record: T) -> RemoteResult<()>;

    async fn update(&self, id: &str, patch: RecordPatch) -> RemoteResult<()>;

    async fn delete(&self, id: &str) -> RemoteResult<()>;
}
