//! Paginator outcome notifications.

use crate::error::PagerError;
use crossbeam_channel::Sender;

/// How the item list changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListChange {
    /// `count` items were inserted starting at `index`.
    Inserted { index: usize, count: usize },
}

/// Receives paginator outcomes. Called on the paginator's worker thread.
///
/// Every method defaults to a no-op.
pub trait PageListener: Send {
    /// The first page came back empty.
    fn list_is_empty(&mut self) {}

    /// The list gained its first items, or a live insert arrived.
    fn list_is_not_empty(&mut self) {}

    /// A query failed or the live subscription was lost.
    fn database_error(&mut self, _error: &PagerError) {}

    /// A load-more fetch was issued.
    fn loading_more_started(&mut self) {}

    /// A load-more fetch added items at the tail.
    fn loading_more_finished(&mut self) {}

    /// The item list changed. Listeners that redraw everything can ignore
    /// the payload.
    fn list_changed(&mut self, _change: ListChange) {}
}

/// Listener outcomes as values, for forwarding to another thread.
#[derive(Clone, Debug, PartialEq)]
pub enum PagerEvent {
    ListIsEmpty,
    ListIsNotEmpty,
    DatabaseError(PagerError),
    LoadingMoreStarted,
    LoadingMoreFinished,
    ListChanged(ListChange),
}

/// Forwards every outcome into a channel. Send failures are ignored: a
/// receiver that went away simply stops observing.
impl PageListener for Sender<PagerEvent> {
    fn list_is_empty(&mut self) {
        let _ = self.send(PagerEvent::ListIsEmpty);
    }

    fn list_is_not_empty(&mut self) {
        let _ = self.send(PagerEvent::ListIsNotEmpty);
    }

    fn database_error(&mut self, error: &PagerError) {
        let _ = self.send(PagerEvent::DatabaseError(error.clone()));
    }

    fn loading_more_started(&mut self) {
        let _ = self.send(PagerEvent::LoadingMoreStarted);
    }

    fn loading_more_finished(&mut self) {
        let _ = self.send(PagerEvent::LoadingMoreFinished);
    }

    fn list_changed(&mut self, change: ListChange) {
        let _ = self.send(PagerEvent::ListChanged(change));
    }
}

/// Discards every outcome.
impl PageListener for () {}
