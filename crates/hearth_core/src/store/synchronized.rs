//! Generic store mirroring one remote collection into observable state.
//!
//! # Responsibility
//! - Own the single live listener for one collection and scope.
//! - Replace `records` wholesale on every pushed snapshot.
//! - Forward create/update/delete to the collaborator without splicing
//!   local state.
//!
//! # Invariants
//! - At most one live listener handle exists at any time.
//! - A new scope cancels the previous handle before the new listener opens.
//! - Snapshots from a cancelled listener never reach `records`.
//! - A failed mutation leaves `records` exactly as it was.

use crate::error::{CoreError, CoreResult};
use crate::model::record::{CollectionScope, DomainRecord, RecordPatch};
use crate::remote::{RemoteCollection, RemoteResult, SnapshotCallback, Subscription};
use crate::store::state::StoreState;
use log::{debug, info, warn};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

struct ActiveListener {
    scope: CollectionScope,
    handle: Subscription,
}

/// Object-safe view of a store used by the family data coordinator.
pub trait ScopedStore: Send + Sync {
    fn collection(&self) -> &'static str;

    /// Whether the scope must carry a budget period id.
    fn period_scoped(&self) -> bool;

    fn subscribe(&self, scope: CollectionScope) -> CoreResult<()>;

    fn clear(&self);

    fn current_scope(&self) -> Option<CollectionScope>;
}

/// Mirror of one remote collection.
pub struct SynchronizedStore<T: DomainRecord> {
    remote: Arc<dyn RemoteCollection<T>>,
    state: Arc<watch::Sender<StoreState<T>>>,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<ActiveListener>>,
}

impl<T: DomainRecord> SynchronizedStore<T> {
    pub fn new(remote: Arc<dyn RemoteCollection<T>>) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            remote,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> StoreState<T> {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Vec<T> {
        self.state.borrow().records.clone()
    }

    /// Receiver notified on every state replacement.
    pub fn watch(&self) -> watch::Receiver<StoreState<T>> {
        self.state.subscribe()
    }

    pub fn current_scope(&self) -> Option<CollectionScope> {
        lock(&self.active)
            .as_ref()
            .map(|listener| listener.scope.clone())
    }

    pub fn is_subscribed(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Opens the listener for `scope`, replacing any previous one.
    ///
    /// # Errors
    /// - `InvalidArgument` when the scope lacks a family (or period for
    ///   period-scoped collections).
    /// - `Subscription` when the collaborator cannot open the listener;
    ///   `error` is set and `loading` keeps its last value.
    pub fn subscribe(&self, scope: CollectionScope) -> CoreResult<()> {
        if let Err(err) = scope.validate_for::<T>() {
            return Err(self.record_failure("subscribe", CoreError::invalid_argument(err.to_string())));
        }

        let mut active = lock(&self.active);
        let previous = active.take();
        let keep_records = previous
            .as_ref()
            .is_some_and(|listener| listener.scope == scope);
        if let Some(listener) = previous {
            debug!(
                "event=store_unsubscribe module=store status=ok collection={} scope={}",
                T::COLLECTION,
                listener.scope
            );
            listener.handle.cancel();
        }

        let generation = self.generation.clone();
        let mut current = 0;
        self.state.send_modify(|state| {
            current = generation.fetch_add(1, Ordering::SeqCst) + 1;
            state.start_listening(keep_records);
        });

        let callback = snapshot_callback(self.state.clone(), self.generation.clone(), current);
        match self.remote.subscribe_by_scope(&scope, callback) {
            Ok(handle) => {
                info!(
                    "event=store_subscribe module=store status=ok collection={} scope={}",
                    T::COLLECTION,
                    scope
                );
                *active = Some(ActiveListener { scope, handle });
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=store_subscribe module=store status=error collection={} scope={} error_code=subscription_failed",
                    T::COLLECTION,
                    scope
                );
                let message = err.message;
                self.state.send_modify(|state| {
                    state.error = Some(message.clone());
                });
                Err(CoreError::Subscription(message))
            }
        }
    }

    /// Cancels any live listener and empties `records`. Idempotent.
    pub fn clear(&self) {
        let previous = lock(&self.active).take();
        let generation = self.generation.clone();
        self.state.send_modify(|state| {
            generation.fetch_add(1, Ordering::SeqCst);
            state.reset();
        });
        if let Some(listener) = previous {
            info!(
                "event=store_clear module=store status=ok collection={} scope={}",
                T::COLLECTION,
                listener.scope
            );
            listener.handle.cancel();
        }
    }

    /// Writes a new record. Visible only once a snapshot contains it.
    pub async fn create(&self, record: T) -> CoreResult<()> {
        if let Err(err) = record.validate() {
            return Err(self.record_failure("create", CoreError::invalid_argument(err.to_string())));
        }
        if let Some(scope) = self.current_scope() {
            if record.meta().family_id != scope.family_id {
                return Err(self.record_failure(
                    "create",
                    CoreError::invalid_argument("familyId does not match the active family"),
                ));
            }
        }

        self.run_mutation("create", self.remote.create(record)).await
    }

    pub async fn update(&self, id: &str, patch: RecordPatch) -> CoreResult<()> {
        if id.trim().is_empty() {
            return Err(self.record_failure("update", CoreError::invalid_argument("id is required")));
        }
        if let Err(err) = patch.validate() {
            return Err(self.record_failure("update", CoreError::invalid_argument(err.to_string())));
        }
        if let Err(message) = self.check_patched(id, &patch) {
            return Err(self.record_failure("update", CoreError::invalid_argument(message)));
        }

        self.run_mutation("update", self.remote.update(id, patch)).await
    }

    pub async fn delete(&self, id: &str) -> CoreResult<()> {
        if id.trim().is_empty() {
            return Err(self.record_failure("delete", CoreError::invalid_argument("id is required")));
        }

        self.run_mutation("delete", self.remote.delete(id)).await
    }

    async fn run_mutation(
        &self,
        op: &'static str,
        call: impl Future<Output = RemoteResult<()>>,
    ) -> CoreResult<()> {
        self.state.send_modify(StoreState::begin_mutation);
        match call.await {
            Ok(()) => {
                self.state.send_modify(|state| state.end_mutation(None));
                debug!(
                    "event=store_mutation module=store status=ok collection={} op={}",
                    T::COLLECTION,
                    op
                );
                Ok(())
            }
            Err(err) => {
                let err = CoreError::from(err);
                let message = err.to_string();
                self.state
                    .send_modify(|state| state.end_mutation(Some(message)));
                warn!(
                    "event=store_mutation module=store status=error collection={} op={} error_code={}",
                    T::COLLECTION,
                    op,
                    err.code()
                );
                Err(err)
            }
        }
    }

    /// Validates the record `patch` would produce, when `id` is in the latest
    /// snapshot. Unknown ids are left to the collaborator.
    fn check_patched(&self, id: &str, patch: &RecordPatch) -> Result<(), String> {
        let state = self.state.borrow();
        let Some(current) = state.records.iter().find(|record| record.meta().id == id) else {
            return Ok(());
        };
        let patched = patch
            .apply_to(current)
            .map_err(|err| format!("update does not fit {}: {err}", T::COLLECTION))?;
        patched.validate().map_err(|err| err.to_string())
    }

    fn record_failure(&self, op: &'static str, err: CoreError) -> CoreError {
        let message = err.to_string();
        self.state.send_modify(|state| state.error = Some(message));
        warn!(
            "event=store_{} module=store status=error collection={} error_code={}",
            op,
            T::COLLECTION,
            err.code()
        );
        err
    }
}

impl<T: DomainRecord> ScopedStore for SynchronizedStore<T> {
    fn collection(&self) -> &'static str {
        T::COLLECTION
    }

    fn period_scoped(&self) -> bool {
        T::PERIOD_SCOPED
    }

    fn subscribe(&self, scope: CollectionScope) -> CoreResult<()> {
        SynchronizedStore::subscribe(self, scope)
    }

    fn clear(&self) {
        SynchronizedStore::clear(self)
    }

    fn current_scope(&self) -> Option<CollectionScope> {
        SynchronizedStore::current_scope(self)
    }
}

fn snapshot_callback<T: DomainRecord>(
    state: Arc<watch::Sender<StoreState<T>>>,
    generation: Arc<AtomicU64>,
    expected: u64,
) -> SnapshotCallback<T> {
    Arc::new(move |records: Vec<T>| {
        let delivered = state.send_if_modified(|current| {
            if generation.load(Ordering::SeqCst) != expected {
                return false;
            }
            current.apply_snapshot(records);
            true
        });
        if !delivered {
            debug!(
                "event=store_snapshot module=store status=skip collection={} reason=stale_listener",
                T::COLLECTION
            );
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
