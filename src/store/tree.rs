// src/store/tree.rs

//! Pure helpers shared by the store backends.

use serde_json::{Map, Value};

use super::StoreError;

const FORBIDDEN_KEY_CHARS: [char; 5] = ['.', '#', '$', '[', ']'];

pub fn check_key(key: &str) -> Result<(), StoreError> {
    if key.is_empty() || key.contains('/') || key.contains(FORBIDDEN_KEY_CHARS) {
        return Err(StoreError::InvalidPath(key.to_string()));
    }
    Ok(())
}

/// Splits a path into validated segments. Empty segments are ignored.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    for segment in &segments {
        check_key(segment).map_err(|_| StoreError::InvalidPath(path.to_string()))?;
    }
    Ok(segments)
}

pub fn join(segments: &[&str]) -> String {
    segments.join("/")
}

/// Canonical stored form: arrays become index-keyed objects, nulls and
/// empty objects disappear. Returns `Null` when nothing is left.
pub fn normalize(value: Value) -> Result<Value, StoreError> {
    match value {
        Value::Array(items) => normalize(Value::Object(
            items
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
        )),
        Value::Object(map) => {
            let mut out = Map::new();
            for (key, child) in map {
                check_key(&key)?;
                let child = normalize(child)?;
                if !child.is_null() {
                    out.insert(key, child);
                }
            }
            Ok(if out.is_empty() {
                Value::Null
            } else {
                Value::Object(out)
            })
        }
        other => Ok(other),
    }
}

/// Inverse of the array flattening in [`normalize`]: objects keyed exactly
/// `0..n-1` read back as arrays.
pub fn denormalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut map: Map<String, Value> =
                map.into_iter().map(|(k, v)| (k, denormalize(v))).collect();
            if is_index_keyed(&map) {
                let len = map.len();
                Value::Array(
                    (0..len)
                        .filter_map(|i| map.remove(&i.to_string()))
                        .collect(),
                )
            } else {
                Value::Object(map)
            }
        }
        other => other,
    }
}

fn is_index_keyed(map: &Map<String, Value>) -> bool {
    !map.is_empty() && (0..map.len()).all(|i| map.contains_key(&i.to_string()))
}

pub fn get_at<'a>(node: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(node, |current, segment| current.get(*segment))
        .filter(|v| !v.is_null())
}

/// Writes a normalized `value` at `segments`, creating parents on the way
/// and pruning parents left empty by a removal.
pub fn set_at(node: &mut Value, segments: &[&str], value: Value) {
    let Some((head, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    if let Value::Object(map) = node {
        let child = map.entry(head.to_string()).or_insert(Value::Null);
        set_at(child, rest, value);
        if child.is_null() {
            map.remove(*head);
        }
    }

    if matches!(node, Value::Object(map) if map.is_empty()) {
        *node = Value::Null;
    }
}

/// Leaf `(path, value)` pairs of a normalized value rooted at `prefix`.
pub fn flatten(value: &Value, prefix: &str) -> Vec<(String, Value)> {
    let mut leaves = Vec::new();
    flatten_into(value, prefix.to_string(), &mut leaves);
    leaves
}

fn flatten_into(value: &Value, path: String, leaves: &mut Vec<(String, Value)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}/{}", path, key)
                };
                flatten_into(child, child_path, leaves);
            }
        }
        leaf => leaves.push((path, leaf.clone())),
    }
}
