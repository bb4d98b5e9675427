use crate::memory::{generate_id, lock, FailurePlan, MemoryOp};
use crate::model::record::{CollectionScope, DomainRecord, RecordPatch};
use crate::remote::{RemoteCollection, RemoteError, RemoteResult, SnapshotCallback, Subscription};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

struct Listener<T> {
    scope: CollectionScope,
    callback: SnapshotCallback<T>,
}

struct Inner<T> {
    records: BTreeMap<String, T>,
    listeners: HashMap<u64, Listener<T>>,
    next_listener: u64,
}

/// One collection held in memory.
pub struct MemoryCollection<T: DomainRecord> {
    inner: Arc<Mutex<Inner<T>>>,
    failures: FailurePlan,
}

impl<T: DomainRecord> Default for MemoryCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DomainRecord> MemoryCollection<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                records: BTreeMap::new(),
                listeners: HashMap::new(),
                next_listener: 0,
            })),
            failures: FailurePlan::default(),
        }
    }

    /// Makes the next `op` call fail with `message`.
    pub fn fail_next(&self, op: MemoryOp, message: impl Into<String>) {
        self.failures.arm(op, message);
    }

    /// Writes a record directly, as another device would.
    pub fn seed(&self, mut record: T) -> String {
        if record.meta().id.is_empty() {
            record.meta_mut().id = generate_id();
        }
        let id = record.meta().id.clone();
        lock(&self.inner).records.insert(id.clone(), record);
        self.broadcast();
        id
    }

    pub fn records(&self) -> Vec<T> {
        lock(&self.inner).records.values().cloned().collect()
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    fn broadcast(&self) {
        let deliveries: Vec<(SnapshotCallback<T>, Vec<T>)> = {
            let inner = lock(&self.inner);
            inner
                .listeners
                .values()
                .map(|listener| {
                    (
                        listener.callback.clone(),
                        snapshot(&inner.records, &listener.scope),
                    )
                })
                .collect()
        };
        for (callback, records) in deliveries {
            callback(records);
        }
    }
}

/// Records in `scope`, ordered by creation time then id.
fn snapshot<T: DomainRecord>(records: &BTreeMap<String, T>, scope: &CollectionScope) -> Vec<T> {
    let mut matching: Vec<T> = records
        .values()
        .filter(|record| scope.contains(*record))
        .cloned()
        .collect();
    matching.sort_by(|a, b| {
        (a.meta().created_at, &a.meta().id).cmp(&(b.meta().created_at, &b.meta().id))
    });
    matching
}

#[async_trait]
impl<T: DomainRecord> RemoteCollection<T> for MemoryCollection<T> {
    fn subscribe_by_scope(
        &self,
        scope: &CollectionScope,
        on_snapshot: SnapshotCallback<T>,
    ) -> RemoteResult<Subscription> {
        self.failures.check(MemoryOp::Subscribe)?;

        let (id, initial) = {
            let mut inner = lock(&self.inner);
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(
                id,
                Listener {
                    scope: scope.clone(),
                    callback: on_snapshot.clone(),
                },
            );
            (id, snapshot(&inner.records, scope))
        };
        on_snapshot(initial);

        let inner = Arc::downgrade(&self.inner);
        Ok(Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        }))
    }

    async fn create(&self, record: T) -> RemoteResult<()> {
        self.failures.check(MemoryOp::Create)?;
        self.seed(record);
        Ok(())
    }

    async fn update(&self, id: &str, patch: RecordPatch) -> RemoteResult<()> {
        self.failures.check(MemoryOp::Update)?;
        {
            let mut inner = lock(&self.inner);
            let current = inner
                .records
                .get(id)
                .ok_or_else(|| RemoteError::new(format!("{} `{id}` not found", T::COLLECTION)))?;
            let updated = patch
                .apply_to(current)
                .map_err(|err| RemoteError::new(format!("rejected update: {err}")))?;
            inner.records.insert(id.to_string(), updated);
        }
        self.broadcast();
        Ok(())
    }

    async fn delete(&self, id: &str) -> RemoteResult<()> {
        self.failures.check(MemoryOp::Delete)?;
        let removed = lock(&self.inner).records.remove(id).is_some();
        if removed {
            self.broadcast();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryCollection;
    use crate::memory::MemoryOp;
    use crate::model::domains::Note;
    use crate::model::record::{CollectionScope, DomainRecord, RecordMeta, RecordPatch};
    use crate::remote::{RemoteCollection, SnapshotCallback};
    use std::sync::{Arc, Mutex};

    fn note(family: &str, title: &str, created_at: i64) -> Note {
        let mut meta = RecordMeta::new(family, "u1");
        meta.created_at = created_at;
        Note {
            meta,
            title: title.to_string(),
            body: String::new(),
            pinned: false,
        }
    }

    fn recorder() -> (SnapshotCallback<Note>, Arc<Mutex<Vec<Vec<String>>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: SnapshotCallback<Note> = Arc::new(move |records: Vec<Note>| {
            sink.lock()
                .expect("sink lock")
                .push(records.into_iter().map(|note| note.title).collect());
        });
        (callback, seen)
    }

    #[tokio::test]
    async fn snapshots_are_scoped_and_ordered() {
        let collection = MemoryCollection::new();
        collection.seed(note("f1", "second", 20));
        collection.seed(note("f2", "other family", 5));
        collection.seed(note("f1", "first", 10));

        let (callback, seen) = recorder();
        let _handle = collection
            .subscribe_by_scope(&CollectionScope::family("f1"), callback)
            .expect("subscribe should succeed");

        let seen = seen.lock().expect("seen lock");
        assert_eq!(seen.as_slice(), &[vec!["first".to_string(), "second".to_string()]]);
    }

    #[tokio::test]
    async fn cancelled_listener_stops_receiving() {
        let collection = MemoryCollection::new();
        let (callback, seen) = recorder();
        let handle = collection
            .subscribe_by_scope(&CollectionScope::family("f1"), callback)
            .expect("subscribe should succeed");
        handle.cancel();
        assert_eq!(collection.listener_count(), 0);

        collection
            .create(note("f1", "late", 1))
            .await
            .expect("create should succeed");
        assert_eq!(seen.lock().expect("seen lock").len(), 1);
    }

    #[tokio::test]
    async fn update_rewrites_fields_and_failures_are_one_shot() {
        let collection = MemoryCollection::new();
        let id = collection.seed(note("f1", "draft", 1));

        collection.fail_next(MemoryOp::Update, "offline");
        let err = collection
            .update(&id, RecordPatch::new().set("pinned", true))
            .await
            .expect_err("armed update should fail");
        assert_eq!(err.message, "offline");

        collection
            .update(&id, RecordPatch::new().set("pinned", true))
            .await
            .expect("second update should succeed");
        let stored = collection.records();
        assert!(stored[0].pinned);
        assert_eq!(stored[0].meta().id, id);
    }
}
