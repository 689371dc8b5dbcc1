//! Remote ordered collections.
//!
//! The paginator talks to its backing store only through the
//! [`RemoteCollection`] trait: single-shot range queries completed through a
//! callback, and standing subscriptions on the newest children of a path.
//! [`MemoryCollection`] is an in-process implementation with failure
//! injection and deferred query delivery.

mod memory;
mod query;

pub use memory::MemoryCollection;
pub use query::RangeQuery;

use crate::error::Result;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionId};
use crate::types::Record;

/// Completion callback of a range query. Receives the matching children in
/// ascending order, or the transport failure.
pub type QueryCallback = Box<dyn FnOnce(Result<Vec<Record>>) + Send + 'static>;

/// Transport seam between the paginator and the store holding the data.
pub trait RemoteCollection: Send + Sync {
    /// Run a single-shot range query. The callback is invoked exactly once,
    /// on whatever thread the transport completes the query on.
    fn range_query(&self, query: RangeQuery, on_complete: QueryCallback);

    /// Start watching a window of the newest children of a path.
    fn subscribe(&self, config: SubscriptionConfig) -> Result<SubscriptionHandle>;

    /// Stop a subscription. Unknown IDs are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
