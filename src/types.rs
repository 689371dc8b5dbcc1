//! Core types shared by the collection transport and the paginator.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Numeric sort value of a child, read from the `order_by` field.
///
/// Wraps an `f64` with a total order (`f64::total_cmp`) so it can be used
/// as a sort key and compared for equality in tests.
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct OrderKey(pub f64);

impl OrderKey {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl PartialEq for OrderKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderKey {}

impl PartialOrd for OrderKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Debug for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey({})", self.0)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<f64> for OrderKey {
    fn from(value: f64) -> Self {
        OrderKey(value)
    }
}

/// Key of a child node under a collection path.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordKey(pub String);

impl RecordKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({})", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordKey {
    fn from(value: &str) -> Self {
        RecordKey(value.to_string())
    }
}

impl From<String> for RecordKey {
    fn from(value: String) -> Self {
        RecordKey(value)
    }
}

/// One child of a remote collection, as delivered by the transport.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Child key, unique within its path.
    pub key: RecordKey,
    /// JSON value of the child.
    pub value: serde_json::Value,
}

impl Record {
    pub fn new(key: impl Into<RecordKey>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Numeric value of `field`, if the child has one.
    pub fn order_key(&self, field: &str) -> Option<OrderKey> {
        self.value.get(field).and_then(|v| v.as_f64()).map(OrderKey)
    }

    /// Position of this child in the collection ordered by `field`.
    ///
    /// Children without a numeric value sort first, ties are broken by key.
    pub fn position(&self, field: &str) -> Position {
        Position {
            order: self.order_key(field),
            key: self.key.clone(),
        }
    }
}

/// Sort position of a child: its order key, then its record key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub order: Option<OrderKey>,
    pub key: RecordKey,
}

/// Inclusive upper bound for a range query.
///
/// `record` narrows the bound among children sharing the same order key;
/// when it is `None` every child with that order key is included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Boundary {
    pub order: OrderKey,
    pub record: Option<RecordKey>,
}

impl Boundary {
    pub fn at(order: impl Into<OrderKey>) -> Self {
        Self {
            order: order.into(),
            record: None,
        }
    }

    pub fn at_record(order: impl Into<OrderKey>, record: RecordKey) -> Self {
        Self {
            order: order.into(),
            record: Some(record),
        }
    }

    /// Whether a child at `position` lies at or before this boundary.
    pub fn includes(&self, position: &Position) -> bool {
        match position.order {
            None => true,
            Some(order) => match order.cmp(&self.order) {
                Ordering::Less => true,
                Ordering::Greater => false,
                Ordering::Equal => match &self.record {
                    Some(record) => position.key <= *record,
                    None => true,
                },
            },
        }
    }
}

/// Domain objects materialized by the paginator must expose their order key.
pub trait Pageable {
    fn order_key(&self) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_key_total_order() {
        let mut keys = vec![OrderKey(3.0), OrderKey(-1.5), OrderKey(0.0), OrderKey(2.25)];
        keys.sort();
        assert_eq!(
            keys,
            vec![OrderKey(-1.5), OrderKey(0.0), OrderKey(2.25), OrderKey(3.0)]
        );
    }

    #[test]
    fn test_record_order_key() {
        let record = Record::new("a", json!({"created": 42, "text": "hi"}));
        assert_eq!(record.order_key("created"), Some(OrderKey(42.0)));
        assert_eq!(record.order_key("text"), None);
        assert_eq!(record.order_key("missing"), None);
    }

    #[test]
    fn test_missing_order_sorts_first() {
        let with = Record::new("a", json!({"t": 1})).position("t");
        let without = Record::new("b", json!({})).position("t");
        assert!(without < with);
    }

    #[test]
    fn test_boundary_tie_breaking() {
        let bound = Boundary::at_record(5.0, RecordKey::from("m"));
        let pos = |key: &str, t: f64| Record::new(key, json!({ "t": t })).position("t");

        assert!(bound.includes(&pos("z", 4.0)));
        assert!(bound.includes(&pos("a", 5.0)));
        assert!(bound.includes(&pos("m", 5.0)));
        assert!(!bound.includes(&pos("n", 5.0)));
        assert!(!bound.includes(&pos("a", 6.0)));

        assert!(Boundary::at(5.0).includes(&pos("zzz", 5.0)));
    }
}
