//! Subscription types for live collection updates.

use crate::types::Record;
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Collection path to watch.
    pub path: String,

    /// Child field that orders the watched window.
    pub order_by: String,

    /// Size of the watched window: the last `limit` children by order.
    /// Default: 1
    pub limit: usize,

    /// Max buffered events before dropping subscriber.
    /// Default: 1000
    pub buffer_size: usize,

    /// Deliver the children already in the window as `Added` events
    /// right after subscribing.
    /// Default: true
    pub replay_existing: bool,
}

impl SubscriptionConfig {
    /// Watch the newest child of `path`.
    pub fn last_one(path: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order_by: order_by.into(),
            ..Default::default()
        }
    }
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            order_by: String::new(),
            limit: 1,
            buffer_size: 1000,
            replay_existing: true,
        }
    }
}

/// Events emitted by subscriptions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChildEvent {
    /// A child entered the watched window.
    Added { record: Record },

    /// A child inside the window changed its value.
    Changed { record: Record },

    /// A child left the window.
    Removed { record: Record },

    /// A child moved within the window.
    Moved { record: Record },

    /// The remote side cancelled the subscription.
    Cancelled { reason: String },

    /// Subscription was dropped locally.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<ChildEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<ChildEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<ChildEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<ChildEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
