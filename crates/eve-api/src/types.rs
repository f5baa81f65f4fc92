use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One domain record, keyed by field name.
pub type Item = Map<String, Value>;

pub const ID_FIELD: &str = "_id";
pub const ETAG_FIELD: &str = "_etag";
pub const LINKS_FIELD: &str = "_links";
pub const STATUS_FIELD: &str = "_status";

/// Fields owned by the server; never part of a computed update diff.
pub const RESERVED_FIELDS: [&str; 6] = [
    LINKS_FIELD,
    ID_FIELD,
    ETAG_FIELD,
    "_created",
    "_updated",
    STATUS_FIELD,
];

/// Result of a mock query: the matched items plus their count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub total: usize,
    pub items: Vec<Item>,
}

impl Cursor {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            total: items.len(),
            items,
        }
    }
}

/// Query output. Mock endpoints produce a [`Cursor`]; HTTP endpoints hand back the raw
/// response document untouched.
#[derive(Clone, Debug, PartialEq)]
pub enum QueryResult {
    Cursor(Cursor),
    Document(Value),
}

impl QueryResult {
    /// Items regardless of backend. Documents are read the Eve way (`_items`), or as a bare
    /// array.
    pub fn items(&self) -> Vec<Item> {
        match self {
            Self::Cursor(cursor) => cursor.items.clone(),
            Self::Document(document) => document
                .get("_items")
                .or(Some(document))
                .and_then(Value::as_array)
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|value| value.as_object().cloned())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Total count: cursor total, Eve `_meta.total`, or the number of items on the page.
    pub fn total(&self) -> usize {
        match self {
            Self::Cursor(cursor) => cursor.total,
            Self::Document(document) => document
                .pointer("/_meta/total")
                .and_then(Value::as_u64)
                .map(|total| total as usize)
                .unwrap_or_else(|| self.items().len()),
        }
    }
}

/// An item is persisted when it carries a truthy `_id`.
pub fn has_identity(item: &Item) -> bool {
    match item.get(ID_FIELD) {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(id)) => !id.is_empty(),
        Some(Value::Number(id)) => id.as_f64() != Some(0.0),
        Some(_) => true,
    }
}

/// Overwrites `target` keys with the ones in `source`.
pub fn merge_into(target: &mut Item, source: &Item) {
    for (key, value) in source {
        target.insert(key.clone(), value.clone());
    }
}

/// Merges a response body into `target` when the body is an object.
pub fn merge_value_into(target: &mut Item, source: Option<&Value>) {
    if let Some(Value::Object(fields)) = source {
        merge_into(target, fields);
    }
}

/// Item minus the reserved fields.
pub fn strip_reserved(item: &Item) -> Item {
    item.iter()
        .filter(|(key, _)| !RESERVED_FIELDS.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// `_links.self.href`, the canonical item URL.
pub fn self_href(item: &Item) -> Option<&str> {
    item.get(LINKS_FIELD)?.get("self")?.get("href")?.as_str()
}

/// True when every criteria key is present in `item` with a matching value. Objects match
/// partially, everything else by equality.
pub fn matches(item: &Item, criteria: &Item) -> bool {
    criteria.iter().all(|(key, expected)| {
        item.get(key)
            .is_some_and(|actual| value_matches(actual, expected))
    })
}

fn value_matches(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Object(actual), Value::Object(expected)) => matches(actual, expected),
        _ => actual == expected,
    }
}
