//! Dotted-key addressing over the JSON view of the state record.

use serde_json::{Map, Value};

use super::StateError;

/// Split `a.b.c` into segments, rejecting empty keys and empty segments.
pub(super) fn split_key(key: &str) -> Result<Vec<&str>, StateError> {
    let segments: Vec<&str> = key.split('.').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StateError::InvalidKey(key.to_string()));
    }
    Ok(segments)
}

/// Walk `segments` from `root`. `null` leaves count as absent.
pub(super) fn lookup<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments {
        current = current.as_object()?.get(*segment)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

/// Store `value` at `segments`, turning missing or non-mapping
/// intermediates into empty mappings.
pub(super) fn insert(root: &mut Value, segments: &[&str], value: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.to_string(), value);
    }
}
