//! Paginated, live-updating view of a remote collection.
//!
//! A [`Paginator`] keeps a newest-first list of items in sync with a
//! [`RemoteCollection`](crate::RemoteCollection):
//! - the first page is loaded when the paginator starts
//! - older pages are appended at the tail when the renderer scrolls near
//!   the end of the list
//! - children added to the collection appear at the head
//!
//! # Example
//!
//! ```ignore
//! let pager = Paginator::spawn(
//!     collection,
//!     PagerConfig::new("/messages", "created", 20),
//!     |record: &Record| Message::from_record(record),
//!     events_tx,
//! )?;
//!
//! // From the renderer's scroll callback
//! pager.on_scrolled(row_count, last_visible_row)?;
//! ```

mod actor;
mod listener;
mod merge;
mod state;

pub use listener::{ListChange, PageListener, PagerEvent};
pub use merge::{merge_page, MergeOutcome};
pub use state::{near_end, Cursor, PagingState};

use crate::collection::RemoteCollection;
use crate::config::PagerConfig;
use crate::error::{PagerError, Result};
use crate::types::{Pageable, Record};
use actor::{Command, PagerActor};
use crossbeam_channel::{bounded, unbounded, Sender};
use parking_lot::RwLock;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Handle to a running paginator.
///
/// Dropping the handle stops the worker and detaches the live subscription.
pub struct Paginator<T> {
    items: Arc<RwLock<Vec<T>>>,
    mailbox: Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl<T> Paginator<T>
where
    T: Pageable + Send + Sync + 'static,
{
    /// Start a paginator and request the first page.
    ///
    /// `convert` maps each child to an item; it must be pure. `listener`
    /// is called on the worker thread.
    pub fn spawn<C, F, L>(
        collection: Arc<C>,
        config: PagerConfig,
        convert: F,
        listener: L,
    ) -> Result<Self>
    where
        C: RemoteCollection + 'static,
        F: Fn(&Record) -> T + Send + 'static,
        L: PageListener + 'static,
    {
        config.validate()?;

        let (mailbox, inbox) = unbounded();
        let items = Arc::new(RwLock::new(Vec::new()));
        let actor = PagerActor::new(
            collection,
            config,
            convert,
            Box::new(listener),
            Arc::clone(&items),
        );

        let worker = thread::Builder::new()
            .name("pager".to_string())
            .spawn(move || actor.run(inbox))
            .map_err(|e| PagerError::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            items,
            mailbox,
            worker: Some(worker),
        })
    }

    /// Report the renderer's scroll position. Requests the next page when
    /// `last_visible_index` is within the configured threshold of
    /// `visible_count` and no fetch is outstanding.
    pub fn on_scrolled(&self, visible_count: usize, last_visible_index: usize) -> Result<()> {
        self.send(Command::Scrolled {
            visible_count,
            last_visible_index,
        })
    }

    /// Request the next page regardless of scroll position.
    pub fn load_more(&self) -> Result<()> {
        self.send(Command::LoadMore)
    }

    /// Number of materialized items.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    /// Run `f` against the current items without copying them.
    pub fn with_items<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.read())
    }

    /// Current cursor and flags.
    pub fn state(&self) -> Result<PagingState> {
        let (reply, response) = bounded(1);
        self.send(Command::State(reply))?;
        response.recv().map_err(|_| PagerError::Disconnected)
    }

    /// Wait until the worker has handled every message sent before this
    /// call, including fetch completions already delivered to it.
    pub fn sync(&self) -> Result<()> {
        let (reply, response) = bounded(1);
        self.send(Command::Sync(reply))?;
        response.recv().map_err(|_| PagerError::Disconnected)
    }

    fn send(&self, command: Command) -> Result<()> {
        if self.worker.is_none() {
            return Err(PagerError::Disconnected);
        }
        self.mailbox
            .send(command)
            .map_err(|_| PagerError::Disconnected)
    }
}

impl<T> Paginator<T> {
    /// Stop the worker and detach the live subscription. Safe to call more
    /// than once.
    pub fn destroy(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.mailbox.send(Command::Shutdown);
            let _ = worker.join();
        }
    }
}

impl<T: Clone> Paginator<T> {
    /// Snapshot of the current items, newest first.
    pub fn items(&self) -> Vec<T> {
        self.items.read().clone()
    }
}

impl<T> Drop for Paginator<T> {
    fn drop(&mut self) {
        self.destroy();
    }
}
