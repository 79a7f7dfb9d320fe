//! Path writes into instance values
//!
//! Paths address nested JSON values by key; a key that parses as an index
//! addresses an array element when the container is an array. Missing
//! intermediates are created as objects. An array grows by at most one
//! element per write; an index past its end leaves the value unchanged.

use serde_json::{Map, Value};

fn child<'v>(value: &'v mut Value, key: &str) -> Option<&'v mut Value> {
    if let (Some(len), Ok(index)) = (value.as_array().map(Vec::len), key.parse::<usize>()) {
        if index > len {
            tracing::warn!(index, len, "ignoring write past the end of an array");
            return None;
        }
        if let Value::Array(items) = value {
            if index == len {
                items.push(Value::Null);
            }
            return items.get_mut(index);
        }
    }
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    value.as_object_mut().map(|map| map.entry(key).or_insert(Value::Null))
}

fn slot<'v>(root: &'v mut Value, path: &[String]) -> Option<&'v mut Value> {
    let mut current = root;
    for key in path {
        current = child(current, key)?;
    }
    Some(current)
}

/// Set the value at `path`, creating intermediates
///
/// Returns `false` if the path runs past the end of an array.
pub fn set_path(root: &mut Value, path: &[String], value: Value) -> bool {
    match slot(root, path) {
        Some(target) => {
            *target = value;
            true
        }
        None => false,
    }
}

/// Splice the array at `path`
///
/// Bounds are clamped. A missing or non-array target is replaced by `items`.
/// Returns `false` if the path runs past the end of an array.
pub fn splice_path(root: &mut Value, path: &[String], index: usize, delete_count: usize, items: Vec<Value>) -> bool {
    let Some(target) = slot(root, path) else {
        return false;
    };
    match target {
        Value::Array(list) => {
            let start = index.min(list.len());
            let end = start.saturating_add(delete_count).min(list.len());
            list.splice(start..end, items);
        }
        other => *other = Value::Array(items),
    }
    true
}
