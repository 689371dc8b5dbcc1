//! Cursor and paging flags.

use crate::types::Boundary;

/// Where the next older page begins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Cursor {
    /// No boundary known: before the first page arrives, while a page is
    /// in flight, or after a failed fetch dropped it.
    #[default]
    Unknown,
    /// The next page ends at this child (inclusive).
    Known(Boundary),
    /// The oldest child has been loaded.
    Exhausted,
}

impl Cursor {
    pub fn boundary(&self) -> Option<&Boundary> {
        match self {
            Cursor::Known(boundary) => Some(boundary),
            _ => None,
        }
    }

    /// Take a known boundary, leaving `Unknown` behind.
    /// Other states are left untouched.
    pub fn take_known(&mut self) -> Option<Boundary> {
        match std::mem::take(self) {
            Cursor::Known(boundary) => Some(boundary),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// Paging flags owned by the paginator.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PagingState {
    pub cursor: Cursor,
    /// A load-more fetch is outstanding.
    pub loading: bool,
    /// The next live `Added` event is a replay of data already merged.
    pub suspend_live_insert: bool,
}

impl PagingState {
    pub fn is_last_page(&self) -> bool {
        self.cursor == Cursor::Exhausted
    }

    /// Whether a scroll report should request the next page.
    pub fn wants_more(
        &self,
        visible_count: usize,
        last_visible_index: usize,
        threshold: usize,
    ) -> bool {
        !self.loading
            && !self.is_last_page()
            && near_end(visible_count, last_visible_index, threshold)
    }
}

/// Whether the last visible row is within `threshold` rows of the end.
pub fn near_end(visible_count: usize, last_visible_index: usize, threshold: usize) -> bool {
    last_visible_index.saturating_add(threshold) >= visible_count
}
