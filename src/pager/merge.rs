//! Page merge.
//!
//! Every fetch asks for one child more than a page. The oldest child of the
//! batch is the overlap with the next older page: it is held back and its
//! position becomes the cursor, so the next fetch (which ends at that child
//! inclusively) returns it as its newest entry. When a batch comes back
//! short, the held-back child is the oldest in the collection and is kept.

use super::state::Cursor;
use crate::types::{Boundary, Pageable, Record};
use tracing::debug;

/// Result of merging one batch into the item list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Index of the first merged item.
    pub index: usize,
    /// Number of items merged.
    pub added: usize,
    /// The list was empty before the merge.
    pub was_empty: bool,
    /// Cursor for the next older page.
    pub cursor: Cursor,
}

/// Merge `batch` (ascending, as returned by a `limit_to_last` query) into
/// the descending `items` list at `at`.
///
/// `page_len` is `None` for a single unbounded page.
pub fn merge_page<T, F>(
    items: &mut Vec<T>,
    batch: &[Record],
    at: usize,
    page_len: Option<usize>,
    convert: &F,
) -> MergeOutcome
where
    T: Pageable,
    F: Fn(&Record) -> T,
{
    let was_empty = items.is_empty();
    let at = at.min(items.len());

    debug!(batch = batch.len(), at, "merging page");

    let Some(page_len) = page_len else {
        let merged = batch.iter().rev().map(convert);
        let before = items.len();
        items.splice(at..at, merged);
        return MergeOutcome {
            index: at,
            added: items.len() - before,
            was_empty,
            cursor: Cursor::Exhausted,
        };
    };

    let Some((sentinel, newer)) = batch.split_first() else {
        return MergeOutcome {
            index: at,
            added: 0,
            was_empty,
            cursor: Cursor::Exhausted,
        };
    };

    let sentinel_item = convert(sentinel);
    items.splice(at..at, newer.iter().rev().map(convert));
    let mut added = newer.len();

    let cursor = if added < page_len {
        items.push(sentinel_item);
        added += 1;
        Cursor::Exhausted
    } else {
        Cursor::Known(Boundary::at_record(
            sentinel_item.order_key(),
            sentinel.key.clone(),
        ))
    };

    debug!(added, ?cursor, "page merged");

    MergeOutcome {
        index: at,
        added,
        was_empty,
        cursor,
    }
}
