//! Range queries over an ordered child set.

use crate::types::{Boundary, Position, Record};

/// A single-shot range query: children of `path` ordered ascending by
/// `order_by`, optionally bounded above by `end_at` and truncated to the
/// last `limit_to_last` children.
#[derive(Clone, Debug, PartialEq)]
pub struct RangeQuery {
    pub path: String,
    pub order_by: String,
    pub limit_to_last: Option<usize>,
    pub end_at: Option<Boundary>,
}

impl RangeQuery {
    pub fn new(path: impl Into<String>, order_by: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            order_by: order_by.into(),
            limit_to_last: None,
            end_at: None,
        }
    }

    pub fn limit_to_last(mut self, limit: Option<usize>) -> Self {
        self.limit_to_last = limit;
        self
    }

    pub fn end_at(mut self, boundary: Boundary) -> Self {
        self.end_at = Some(boundary);
        self
    }

    /// Evaluate the query against a child set in any order.
    ///
    /// The result is ascending: the oldest child comes first.
    pub fn apply(&self, children: &[Record]) -> Vec<Record> {
        let mut matched: Vec<(Position, &Record)> = children
            .iter()
            .map(|c| (c.position(&self.order_by), c))
            .filter(|(pos, _)| self.end_at.as_ref().map_or(true, |end| end.includes(pos)))
            .collect();
        matched.sort_by(|a, b| a.0.cmp(&b.0));

        let skip = match self.limit_to_last {
            Some(limit) => matched.len().saturating_sub(limit),
            None => 0,
        };
        matched
            .into_iter()
            .skip(skip)
            .map(|(_, record)| record.clone())
            .collect()
    }
}
