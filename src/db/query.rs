//! Collection queries.
//!
//! Filter and ordering semantics follow Firestore: a document missing a
//! filtered or ordered field never matches, and ties are broken by
//! document ID.

use serde_json::Value;
use std::cmp::Ordering;

use crate::db::store::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Dotted field path
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Query over a single collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new(collection: &str) -> Self {
        Self {
            collection: collection.to_string(),
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value.into())
    }

    pub fn where_gte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::GreaterThanOrEqual, value.into())
    }

    pub fn where_lte(self, field: &str, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::LessThanOrEqual, value.into())
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn filter(mut self, field: &str, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op,
            value,
        });
        self
    }

    /// Whether a document's fields satisfy every filter (and have the order-by field).
    pub fn matches(&self, fields: &Value) -> bool {
        let filters_match = self.filters.iter().all(|filter| {
            let Some(actual) = field_at(fields, &filter.field) else {
                return false;
            };
            match (filter.op, compare_values(actual, &filter.value)) {
                (FilterOp::Eq, Some(ord)) => ord == Ordering::Equal,
                (FilterOp::GreaterThanOrEqual, Some(ord)) => ord != Ordering::Less,
                (FilterOp::LessThanOrEqual, Some(ord)) => ord != Ordering::Greater,
                (_, None) => false,
            }
        });

        let has_order_field = match &self.order_by {
            Some((field, _)) => field_at(fields, field).is_some(),
            None => true,
        };

        filters_match && has_order_field
    }

    /// Filter, sort and truncate a candidate set of documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = Snapshot>) -> Vec<Snapshot> {
        let mut matched: Vec<Snapshot> = docs
            .into_iter()
            .filter(|doc| self.matches(&doc.fields))
            .collect();

        matched.sort_by(|a, b| {
            let by_field = match &self.order_by {
                Some((field, direction)) => {
                    let ord = match (field_at(&a.fields, field), field_at(&b.fields, field)) {
                        (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                        _ => Ordering::Equal,
                    };
                    match direction {
                        Direction::Ascending => ord,
                        Direction::Descending => ord.reverse(),
                    }
                }
                None => Ordering::Equal,
            };
            by_field.then_with(|| a.id.cmp(&b.id))
        });

        if let Some(limit) = self.limit {
            matched.truncate(limit as usize);
        }
        matched
    }
}

/// Look up a dotted path; explicit nulls count as absent.
fn field_at<'a>(doc: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(doc, |current, segment| current.get(segment))
        .filter(|value| !value.is_null())
}

/// Compare two values of the same kind; mixed kinds are incomparable.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        _ => None,
    }
}
