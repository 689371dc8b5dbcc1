//! Subscription system for live collection updates.
//!
//! A subscription watches a window of the last `limit` children of a path,
//! ordered by a child field. It receives:
//! - `Added` when a child enters the window
//! - `Removed` when a child is pushed out of it
//! - `Cancelled` when the remote side revokes access
//!
//! Subscriptions use bounded buffers; a slow subscriber is dropped.
//!
//! # Example
//!
//! ```ignore
//! let manager = SubscriptionManager::new();
//!
//! let handle = manager.subscribe(SubscriptionConfig::last_one("/messages", "created"));
//! manager.mark_caught_up(handle.id);
//!
//! loop {
//!     match handle.recv() {
//!         Ok(ChildEvent::Added { record }) => println!("New child: {:?}", record),
//!         Ok(ChildEvent::Dropped { .. }) | Ok(ChildEvent::Cancelled { .. }) => break,
//!         Ok(_) => {}
//!         Err(_) => break,
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{ChildEvent, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId};
