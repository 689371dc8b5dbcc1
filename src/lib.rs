//! # Pageable
//!
//! Cursor-based pagination over a remote ordered collection, with children
//! added to the collection appearing at the head of the list in real time.
//!
//! ## Core Concepts
//!
//! - **Collections**: Remote child sets ordered by a numeric field, reached
//!   through the [`RemoteCollection`] trait
//! - **Pages**: Batches fetched newest-first, one child larger than the page
//!   so consecutive pages share a boundary child
//! - **Cursor**: Where the next older page ends
//! - **Live inserts**: A standing subscription on the newest child, paused
//!   while a page is in flight
//!
//! ## Example
//!
//! ```ignore
//! use pageable::{MemoryCollection, Pageable, Paginator, PagerConfig, Record};
//!
//! struct Message { created: f64, text: String }
//!
//! impl Pageable for Message {
//!     fn order_key(&self) -> f64 { self.created }
//! }
//!
//! let collection = Arc::new(MemoryCollection::new());
//! let (events_tx, events) = crossbeam_channel::unbounded();
//!
//! let pager = Paginator::spawn(
//!     collection,
//!     PagerConfig::new("/messages", "created", 20),
//!     |record: &Record| Message {
//!         created: record.value["created"].as_f64().unwrap_or_default(),
//!         text: record.value["text"].as_str().unwrap_or_default().to_string(),
//!     },
//!     events_tx,
//! )?;
//!
//! // Renderer scrolled to row 18 of 20: fetch the next page
//! pager.on_scrolled(20, 18)?;
//! ```

pub mod collection;
pub mod config;
pub mod error;
pub mod pager;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use collection::{MemoryCollection, QueryCallback, RangeQuery, RemoteCollection};
pub use config::{FetchErrorPolicy, PagerConfig};
pub use error::{PagerError, Result};
pub use pager::{
    merge_page, near_end, Cursor, ListChange, MergeOutcome, PageListener, PagerEvent, Paginator,
    PagingState,
};
pub use subscriptions::{
    ChildEvent, DropReason, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
pub use types::*;
