//! In-process collection store.

use crate::error::{PagerError, Result};
use crate::subscriptions::{
    ChildEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
};
use crate::types::{Record, RecordKey};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, trace};

use super::{QueryCallback, RangeQuery, RemoteCollection};

/// In-memory collection store.
///
/// Children are kept per path in insertion order; ordering is computed per
/// query from the requested `order_by` field. Queries normally complete
/// synchronously on the calling thread. After `hold_queries`, they are
/// parked until `release_queries`, which completes them on the releasing
/// thread against the data present at that moment.
pub struct MemoryCollection {
    /// Children by path.
    paths: RwLock<HashMap<String, Vec<Record>>>,

    /// Live subscriptions.
    subscriptions: SubscriptionManager,

    /// Counter for `push` keys.
    next_push: AtomicU64,

    /// Paths that reject queries and subscriptions.
    denied: RwLock<HashSet<String>>,

    /// Failures handed to the next queries, in order.
    injected_failures: Mutex<VecDeque<PagerError>>,

    /// Parked queries while holding is enabled.
    held: Mutex<Option<Vec<(RangeQuery, QueryCallback)>>>,

    /// Every query received, in arrival order.
    query_log: Mutex<Vec<RangeQuery>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self {
            paths: RwLock::new(HashMap::new()),
            subscriptions: SubscriptionManager::new(),
            next_push: AtomicU64::new(1),
            denied: RwLock::new(HashSet::new()),
            injected_failures: Mutex::new(VecDeque::new()),
            held: Mutex::new(None),
            query_log: Mutex::new(Vec::new()),
        }
    }

    // --- Data ---

    /// Add a child under `path` and notify subscribers whose window it enters.
    ///
    /// An existing child with the same key has its value replaced silently.
    pub fn insert(&self, path: &str, record: Record) {
        let mut paths = self.paths.write();
        let children = paths.entry(path.to_string()).or_default();

        if let Some(existing) = children.iter_mut().find(|c| c.key == record.key) {
            existing.value = record.value;
            return;
        }

        trace!(path, key = %record.key, "insert");
        children.push(record);
        let children = &*children;
        if let Some(inserted) = children.last() {
            self.subscriptions.broadcast_inserted(path, children, inserted);
        }
    }

    /// Add a child under a generated key. Keys increase with every push.
    pub fn push(&self, path: &str, value: serde_json::Value) -> RecordKey {
        let n = self.next_push.fetch_add(1, Ordering::SeqCst);
        let key = RecordKey(format!("p{n:012}"));
        self.insert(path, Record::new(key.clone(), value));
        key
    }

    /// Number of children under `path`.
    pub fn len(&self, path: &str) -> usize {
        self.paths.read().get(path).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, path: &str) -> bool {
        self.len(path) == 0
    }

    /// Children under `path` in insertion order.
    pub fn children(&self, path: &str) -> Vec<Record> {
        self.paths.read().get(path).cloned().unwrap_or_default()
    }

    // --- Failure injection ---

    /// Make the next query fail with `error`. Calls queue up.
    pub fn fail_next_query(&self, error: PagerError) {
        self.injected_failures.lock().push_back(error);
    }

    /// Revoke access to `path`: queries and new subscriptions fail, and
    /// existing subscriptions are cancelled.
    pub fn deny_path(&self, path: &str) {
        self.denied.write().insert(path.to_string());
        self.subscriptions.cancel_path(path, "permission denied");
    }

    pub fn allow_path(&self, path: &str) {
        self.denied.write().remove(path);
    }

    // --- Deferred delivery ---

    /// Park incoming queries until `release_queries` is called.
    pub fn hold_queries(&self) {
        let mut held = self.held.lock();
        if held.is_none() {
            *held = Some(Vec::new());
        }
    }

    /// Complete every parked query on the calling thread and stop holding.
    /// Returns how many queries were released.
    pub fn release_queries(&self) -> usize {
        let parked = self.held.lock().take().unwrap_or_default();
        let count = parked.len();
        for (query, on_complete) in parked {
            let result = self.execute(&query);
            on_complete(result);
        }
        count
    }

    /// Number of queries currently parked.
    pub fn held_count(&self) -> usize {
        self.held.lock().as_ref().map_or(0, Vec::len)
    }

    /// Every query received so far.
    pub fn queries(&self) -> Vec<RangeQuery> {
        self.query_log.lock().clone()
    }

    /// Number of active subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.subscription_count()
    }

    fn check_access(&self, path: &str) -> Result<()> {
        if self.denied.read().contains(path) {
            return Err(PagerError::PermissionDenied(path.to_string()));
        }
        Ok(())
    }

    fn execute(&self, query: &RangeQuery) -> Result<Vec<Record>> {
        self.check_access(&query.path)?;
        if let Some(error) = self.injected_failures.lock().pop_front() {
            return Err(error);
        }

        let paths = self.paths.read();
        let result = match paths.get(&query.path) {
            Some(children) => query.apply(children),
            None => Vec::new(),
        };
        debug!(path = %query.path, returned = result.len(), "range query");
        Ok(result)
    }
}

impl Default for MemoryCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteCollection for MemoryCollection {
    fn range_query(&self, query: RangeQuery, on_complete: QueryCallback) {
        self.query_log.lock().push(query.clone());

        {
            let mut held = self.held.lock();
            if let Some(parked) = held.as_mut() {
                trace!(path = %query.path, "query held");
                parked.push((query, on_complete));
                return;
            }
        }

        let result = self.execute(&query);
        on_complete(result);
    }

    fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle> {
        self.check_access(&config.path)?;

        // Inserts broadcast under the write lock, so holding the read lock
        // keeps the replay and the first live event in order.
        let paths = self.paths.read();
        let replay = config.replay_existing;
        let window = RangeQuery::new(config.path.clone(), config.order_by.clone())
            .limit_to_last(Some(config.limit));
        let handle = self.subscriptions.subscribe(config);

        if replay {
            let children = paths
                .get(&window.path)
                .map(|c| window.apply(c))
                .unwrap_or_default();
            for record in children {
                if !self.subscriptions.send_to(handle.id, ChildEvent::Added { record }) {
                    self.subscriptions.unsubscribe(handle.id);
                    return Err(PagerError::SubscriptionDropped);
                }
            }
        }
        self.subscriptions.mark_caught_up(handle.id);

        Ok(handle)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use serde_json::json;
    use std::time::Duration;

    fn seeded(count: usize) -> MemoryCollection {
        let collection = MemoryCollection::new();
        for i in 1..=count {
            collection.push("/m", json!({ "t": i }));
        }
        collection
    }

    fn run(collection: &MemoryCollection, query: RangeQuery) -> Result<Vec<Record>> {
        let (tx, rx) = unbounded();
        collection.range_query(
            query,
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        rx.recv_timeout(Duration::from_millis(100)).unwrap()
    }

    #[test]
    fn test_push_and_query() {
        let collection = seeded(5);
        assert_eq!(collection.len("/m"), 5);

        let result = run(&collection, RangeQuery::new("/m", "t").limit_to_last(Some(3))).unwrap();
        let keys: Vec<f64> = result
            .iter()
            .map(|r| r.order_key("t").unwrap().value())
            .collect();
        assert_eq!(keys, vec![3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_missing_path_is_empty() {
        let collection = MemoryCollection::new();
        let result = run(&collection, RangeQuery::new("/nothing", "t")).unwrap();
        assert!(result.is_empty());
        assert!(collection.is_empty("/nothing"));
    }

    #[test]
    fn test_injected_failure_applies_once() {
        let collection = seeded(2);
        collection.fail_next_query(PagerError::QueryFailed("network".into()));

        let first = run(&collection, RangeQuery::new("/m", "t"));
        assert_eq!(first, Err(PagerError::QueryFailed("network".into())));

        let second = run(&collection, RangeQuery::new("/m", "t")).unwrap();
        assert_eq!(second.len(), 2);
    }

    #[test]
    fn test_denied_path() {
        let collection = seeded(2);
        collection.deny_path("/m");

        let result = run(&collection, RangeQuery::new("/m", "t"));
        assert!(matches!(result, Err(PagerError::PermissionDenied(_))));
        assert!(collection
            .subscribe(SubscriptionConfig::last_one("/m", "t"))
            .is_err());

        collection.allow_path("/m");
        assert!(run(&collection, RangeQuery::new("/m", "t")).is_ok());
    }

    #[test]
    fn test_held_queries_complete_on_release() {
        let collection = seeded(3);
        collection.hold_queries();

        let (tx, rx) = unbounded();
        collection.range_query(
            RangeQuery::new("/m", "t"),
            Box::new(move |result| {
                let _ = tx.send(result);
            }),
        );
        assert_eq!(collection.held_count(), 1);
        assert!(rx.try_recv().is_err());

        // Data added while held is visible at release time
        collection.push("/m", json!({ "t": 4 }));
        assert_eq!(collection.release_queries(), 1);

        let result = rx.recv_timeout(Duration::from_millis(100)).unwrap().unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(collection.queries().len(), 1);
    }

    #[test]
    fn test_subscribe_replays_newest_child() {
        let collection = seeded(3);
        let handle = collection
            .subscribe(SubscriptionConfig::last_one("/m", "t"))
            .unwrap();

        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        match event {
            ChildEvent::Added { record } => assert_eq!(record.value["t"], 3),
            other => panic!("Expected Added, got {:?}", other),
        }

        collection.push("/m", json!({ "t": 4 }));
        let removed = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert!(matches!(removed, ChildEvent::Removed { .. }));
        let added = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        match added {
            ChildEvent::Added { record } => assert_eq!(record.value["t"], 4),
            other => panic!("Expected Added, got {:?}", other),
        }
    }

    #[test]
    fn test_subscribe_without_replay() {
        let collection = seeded(3);
        let config = SubscriptionConfig {
            replay_existing: false,
            ..SubscriptionConfig::last_one("/m", "t")
        };
        let handle = collection.subscribe(config).unwrap();
        assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_deny_cancels_subscription() {
        let collection = seeded(1);
        let config = SubscriptionConfig {
            replay_existing: false,
            ..SubscriptionConfig::last_one("/m", "t")
        };
        let handle = collection.subscribe(config).unwrap();

        collection.deny_path("/m");
        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(
            event,
            ChildEvent::Cancelled {
                reason: "permission denied".into()
            }
        );
        assert_eq!(collection.subscription_count(), 0);
    }
}
