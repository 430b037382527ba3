//! Record trait and index values

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Current time in Unix milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A value usable in a collection index
#[derive(Debug, Clone, PartialEq)]
pub enum IndexValue {
    String(String),
    Int(i64),
    Bool(bool),
}

impl From<&str> for IndexValue {
    fn from(s: &str) -> Self {
        IndexValue::String(s.to_string())
    }
}

impl From<String> for IndexValue {
    fn from(s: String) -> Self {
        IndexValue::String(s)
    }
}

impl From<i64> for IndexValue {
    fn from(i: i64) -> Self {
        IndexValue::Int(i)
    }
}

impl From<bool> for IndexValue {
    fn from(b: bool) -> Self {
        IndexValue::Bool(b)
    }
}

/// A persistable record
///
/// Each record type maps to one collection (one JSONL log). `indexed_fields`
/// exposes the fields the store can filter on without deserializing callers'
/// domain knowledge into the store.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Unique record identifier
    fn id(&self) -> &str;

    /// Last update timestamp (Unix milliseconds)
    fn updated_at(&self) -> i64;

    /// Collection this record type lives in
    fn collection_name() -> &'static str;

    /// Fields available to `Store::query`
    fn indexed_fields(&self) -> HashMap<String, IndexValue> {
        HashMap::new()
    }
}
