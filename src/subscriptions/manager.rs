//! Subscription manager for broadcasting child events.

use crate::types::Record;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use super::types::{ChildEvent, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId};

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<ChildEvent>,
    /// Whether the initial window replay is complete.
    caught_up: bool,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: ChildEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(crossbeam_channel::TrySendError::Full(_)) => false,
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => false,
        }
    }

    fn watches(&self, path: &str) -> bool {
        self.caught_up && self.config.path == path
    }

    /// Events caused by `inserted` joining `children` (which already contains it).
    fn window_changes(&self, children: &[Record], inserted: &Record) -> Vec<ChildEvent> {
        let order_by = self.config.order_by.as_str();
        let limit = self.config.limit;
        let position = inserted.position(order_by);

        let newer = children
            .iter()
            .filter(|c| c.position(order_by) > position)
            .count();
        if newer >= limit {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(2);
        if children.len() > limit {
            let mut ranked: Vec<&Record> = children.iter().collect();
            ranked.sort_by_key(|c| std::cmp::Reverse(c.position(order_by)));
            if let Some(evicted) = ranked.get(limit) {
                events.push(ChildEvent::Removed {
                    record: (*evicted).clone(),
                });
            }
        }
        events.push(ChildEvent::Added {
            record: inserted.clone(),
        });
        events
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    /// Create a new subscription manager.
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a new subscription.
    ///
    /// The subscription receives no broadcasts until `mark_caught_up` is
    /// called, which leaves room to replay the current window first.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        debug!(id = id.0, path = %config.path, limit = config.limit, "subscribe");

        let subscription = Subscription {
            config,
            sender,
            caught_up: false,
        };
        self.subscriptions.write().insert(id, subscription);

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up. Unknown IDs are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            debug!(id = id.0, "unsubscribe");
            // Send dropped event (best effort)
            let _ = sub.sender.try_send(ChildEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    /// Mark a subscription as caught up (finished window replay).
    /// Returns false if the subscription no longer exists.
    pub fn mark_caught_up(&self, id: SubscriptionId) -> bool {
        match self.subscriptions.write().get_mut(&id) {
            Some(sub) => {
                sub.caught_up = true;
                true
            }
            None => false,
        }
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Send an event directly to a subscription (for replay).
    /// Returns false if the subscription is gone or its buffer is full.
    pub fn send_to(&self, id: SubscriptionId, event: ChildEvent) -> bool {
        let subs = self.subscriptions.read();
        if let Some(sub) = subs.get(&id) {
            sub.try_send(event)
        } else {
            false
        }
    }

    // --- Broadcasting ---

    /// Broadcast the insertion of `inserted` under `path`.
    ///
    /// `children` is the full child set of `path` after the insertion. Each
    /// subscription only hears about it if the child lands in its window.
    pub fn broadcast_inserted(&self, path: &str, children: &[Record], inserted: &Record) {
        self.broadcast(|sub| {
            if sub.watches(path) {
                sub.window_changes(children, inserted)
            } else {
                Vec::new()
            }
        });
    }

    /// Cancel every subscription on `path`, telling subscribers why.
    pub fn cancel_path(&self, path: &str, reason: &str) {
        let mut subs = self.subscriptions.write();
        let cancelled: Vec<SubscriptionId> = subs
            .iter()
            .filter(|(_, sub)| sub.config.path == path)
            .map(|(id, _)| *id)
            .collect();

        for id in cancelled {
            if let Some(sub) = subs.remove(&id) {
                debug!(id = id.0, path, reason, "subscription cancelled");
                let _ = sub.sender.try_send(ChildEvent::Cancelled {
                    reason: reason.to_string(),
                });
            }
        }
    }

    /// Internal broadcast helper. Drops subscribers that fail to receive.
    fn broadcast<F>(&self, events_for: F)
    where
        F: Fn(&Subscription) -> Vec<ChildEvent>,
    {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                for event in events_for(sub) {
                    if !sub.try_send(event) {
                        to_remove.push(*id);
                        break;
                    }
                }
            }
        }

        // Remove dropped subscriptions
        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(id = id.0, "dropping slow subscriber");
                    // Try to notify about the drop (might fail, that's ok)
                    let _ = sub.sender.try_send(ChildEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn child(key: &str, t: f64) -> Record {
        Record::new(key, json!({ "t": t }))
    }

    fn caught_up(manager: &SubscriptionManager, config: SubscriptionConfig) -> SubscriptionHandle {
        let handle = manager.subscribe(config);
        assert!(manager.mark_caught_up(handle.id));
        handle
    }

    #[test]
    fn test_subscribe_unsubscribe() {
        let manager = SubscriptionManager::new();

        let handle = manager.subscribe(SubscriptionConfig::last_one("/m", "t"));
        assert_eq!(manager.subscription_count(), 1);

        manager.unsubscribe(handle.id);
        assert_eq!(manager.subscription_count(), 0);

        // Second unsubscribe is a no-op
        manager.unsubscribe(handle.id);
        assert_eq!(manager.subscription_count(), 0);

        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(
            event,
            ChildEvent::Dropped {
                reason: DropReason::Unsubscribed
            }
        );
    }

    #[test]
    fn test_newest_child_enters_window() {
        let manager = SubscriptionManager::new();
        let handle = caught_up(&manager, SubscriptionConfig::last_one("/m", "t"));

        let children = vec![child("a", 1.0), child("b", 2.0)];
        manager.broadcast_inserted("/m", &children, &children[1]);

        let removed = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(removed, ChildEvent::Removed { record: child("a", 1.0) });
        let added = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(added, ChildEvent::Added { record: child("b", 2.0) });
    }

    #[test]
    fn test_older_child_outside_window() {
        let manager = SubscriptionManager::new();
        let handle = caught_up(&manager, SubscriptionConfig::last_one("/m", "t"));

        let children = vec![child("a", 5.0), child("b", 2.0)];
        manager.broadcast_inserted("/m", &children, &children[1]);

        assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_other_path_not_notified() {
        let manager = SubscriptionManager::new();
        let handle = caught_up(&manager, SubscriptionConfig::last_one("/m", "t"));

        let children = vec![child("a", 1.0)];
        manager.broadcast_inserted("/other", &children, &children[0]);

        assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_not_caught_up_doesnt_receive() {
        let manager = SubscriptionManager::new();
        let handle = manager.subscribe(SubscriptionConfig::last_one("/m", "t"));

        let children = vec![child("a", 1.0)];
        manager.broadcast_inserted("/m", &children, &children[0]);

        assert!(handle.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_drop_slow_subscriber() {
        let manager = SubscriptionManager::new();
        let config = SubscriptionConfig {
            buffer_size: 2,
            ..SubscriptionConfig::last_one("/m", "t")
        };
        let _handle = caught_up(&manager, config);

        let mut children = Vec::new();
        for i in 0..10 {
            children.push(child(&format!("c{i}"), i as f64));
            let inserted = children[i].clone();
            manager.broadcast_inserted("/m", &children, &inserted);
        }

        assert_eq!(manager.subscription_count(), 0);
    }

    #[test]
    fn test_cancel_path() {
        let manager = SubscriptionManager::new();
        let handle = caught_up(&manager, SubscriptionConfig::last_one("/m", "t"));
        let _other = caught_up(&manager, SubscriptionConfig::last_one("/n", "t"));

        manager.cancel_path("/m", "permission denied");

        assert_eq!(manager.subscription_count(), 1);
        let event = handle.recv_timeout(Duration::from_millis(100)).unwrap();
        assert!(matches!(event, ChildEvent::Cancelled { .. }));
    }
}
