use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::Utc;
use serde_json::Value as JsonValue;

use tastemark_events::{ChangeEvent, EventBus, InMemoryEventBus, Subscription};

use super::r#trait::{DocumentStore, Filter, Precondition, StoreError, WriteBatch, WriteOp};

type Collections = HashMap<String, BTreeMap<String, JsonValue>>;
type CommitHook = Box<dyn FnOnce() + Send>;

/// In-memory document store for tests/dev.
///
/// Batches are staged against a private overlay and only merged once every
/// precondition held, so a failed batch leaves no trace. Fault injection hooks
/// simulate an unreachable backend, and `before_next_commit` lets a test slip
/// a competing write in between another writer's reads and its commit.
pub struct InMemoryDocumentStore {
    collections: RwLock<Collections>,
    feed: Arc<InMemoryEventBus<ChangeEvent>>,
    failing_commits: AtomicUsize,
    failing_reads: AtomicBool,
    next_commit_hook: Mutex<Option<CommitHook>>,
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("collections", &self.collections)
            .field("failing_commits", &self.failing_commits)
            .field("failing_reads", &self.failing_reads)
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            feed: Arc::new(InMemoryEventBus::new()),
            failing_commits: AtomicUsize::new(0),
            failing_reads: AtomicBool::new(false),
            next_commit_hook: Mutex::new(None),
        }
    }
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Make the next `n` commits fail with `Unavailable` before touching data.
    pub fn fail_next_commits(&self, n: usize) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_commit(&self) {
        self.fail_next_commits(1);
    }

    /// Make every read fail with `Unavailable` until switched back off.
    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    /// Run `hook` at the start of the next commit, before that commit looks
    /// at any data. Writes made by the hook land first.
    pub fn before_next_commit(&self, hook: impl FnOnce() + Send + 'static) {
        if let Ok(mut slot) = self.next_commit_hook.lock() {
            *slot = Some(Box::new(hook));
        }
    }

    /// Number of documents in a collection.
    pub fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .map(|c| c.get(collection).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn check_reads(&self) -> Result<(), StoreError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        Ok(())
    }

    fn run_commit_hook(&self) {
        let hook = self.next_commit_hook.lock().ok().and_then(|mut slot| slot.take());
        if let Some(hook) = hook {
            hook();
        }
    }

    fn take_injected_commit_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

fn check_precondition(
    precondition: Precondition,
    current: Option<&JsonValue>,
    collection: &str,
    key: &str,
) -> Result<(), StoreError> {
    match (precondition, current) {
        (Precondition::Absent, Some(_)) => Err(StoreError::Precondition(format!(
            "{collection}/{key} already exists"
        ))),
        (Precondition::Exists | Precondition::FieldIs { .. }, None) => Err(StoreError::Precondition(format!(
            "{collection}/{key} does not exist"
        ))),
        (Precondition::FieldIs { field, value }, Some(doc)) if doc.get(field) != Some(&JsonValue::Bool(value)) => {
            Err(StoreError::Precondition(format!("{collection}/{key}: {field} is no longer {value}")))
        }
        _ => Ok(()),
    }
}

fn incremented(
    mut doc: JsonValue,
    field: &str,
    delta: i64,
    collection: &str,
    key: &str,
) -> Result<JsonValue, StoreError> {
    let object = doc.as_object_mut().ok_or_else(|| {
        StoreError::InvalidWrite(format!("{collection}/{key} is not an object"))
    })?;

    let current = match object.get(field) {
        None | Some(JsonValue::Null) => 0,
        Some(v) => v.as_u64().ok_or_else(|| {
            StoreError::InvalidWrite(format!("{collection}/{key}.{field} is not a counter"))
        })?,
    };
    let next = if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    };
    object.insert(field.to_string(), JsonValue::from(next));
    Ok(doc)
}

impl DocumentStore for InMemoryDocumentStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<JsonValue>, StoreError> {
        self.check_reads()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(collections.get(collection).and_then(|c| c.get(key)).cloned())
    }

    fn query(&self, collection: &str, filter: &Filter) -> Result<Vec<JsonValue>, StoreError> {
        self.check_reads()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.run_commit_hook();
        if self.take_injected_commit_failure() {
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }

        let ops = batch.into_ops();
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        // Stage: final state of every touched document (None = deleted).
        let mut staged: HashMap<(String, String), Option<JsonValue>> = HashMap::new();
        let mut order: Vec<(String, String)> = Vec::new();

        for op in &ops {
            let slot = (op.collection().to_string(), op.key().to_string());
            let current = match staged.get(&slot) {
                Some(v) => v.clone(),
                None => collections.get(&slot.0).and_then(|c| c.get(&slot.1)).cloned(),
            };

            let next = match op {
                WriteOp::Put { collection, key, document, precondition } => {
                    check_precondition(*precondition, current.as_ref(), collection, key)?;
                    Some(document.clone())
                }
                WriteOp::Delete { collection, key, precondition } => {
                    check_precondition(*precondition, current.as_ref(), collection, key)?;
                    None
                }
                WriteOp::Increment { collection, key, field, delta } => {
                    let doc = current.ok_or_else(|| {
                        StoreError::Precondition(format!("{collection}/{key} does not exist"))
                    })?;
                    Some(incremented(doc, field, *delta, collection, key)?)
                }
                WriteOp::Assert { collection, key, precondition } => {
                    check_precondition(*precondition, current.as_ref(), collection, key)?;
                    continue;
                }
            };

            if !staged.contains_key(&slot) {
                order.push(slot.clone());
            }
            staged.insert(slot, next);
        }

        let now = Utc::now();
        let mut changes = Vec::with_capacity(order.len());
        for slot in order {
            let Some(next) = staged.remove(&slot) else { continue };
            let (collection, key) = slot;
            let docs = collections.entry(collection.clone()).or_default();
            match next {
                Some(doc) => {
                    docs.insert(key.clone(), doc);
                    changes.push(ChangeEvent::upserted(collection, key, now));
                }
                None => {
                    if docs.remove(&key).is_some() {
                        changes.push(ChangeEvent::deleted(collection, key, now));
                    }
                }
            }
        }
        tracing::debug!(ops = ops.len(), changes = changes.len(), "committed write batch");

        // Published before the write lock is released: the feed follows
        // commit order and a batch's changes stay together.
        if let Err(err) = self.feed.publish_all(changes) {
            tracing::warn!(error = %err, "change feed publish failed");
        }
        drop(collections);
        Ok(())
    }

    fn subscribe(&self) -> Subscription<ChangeEvent> {
        self.feed.subscribe()
    }
}
