//! Dot-delimited JSON paths (`.mcpServers`, `.a.b`, `.`) and deep merge.
//!
//! Only object keys are addressable; there is no array indexing or
//! filtering. Arrays are leaves and are replaced wholesale on merge.
use serde_json::{Map, Value};

/// Split a path into object keys. `.` and the empty string address the
/// root. A missing leading dot is tolerated.
#[must_use]
pub fn parse(jq_path: &str) -> Vec<String> {
    jq_path
        .trim()
        .trim_start_matches('.')
        .split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Value at `path`, if every segment names an object key.
#[must_use]
pub fn get<'a>(value: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |node, key| node.as_object()?.get(key))
}

/// Mutable value at `path`, creating intermediate objects. A non-object
/// met along the way is replaced by an empty object.
pub fn get_or_create<'a>(value: &'a mut Value, path: &[String]) -> &'a mut Value {
    path.iter().fold(value, |node, key| {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        match node {
            Value::Object(map) => map.entry(key.clone()).or_insert(Value::Null),
            other => other,
        }
    })
}

/// Overwrite the value at `path`.
pub fn set(value: &mut Value, path: &[String], new_value: Value) {
    *get_or_create(value, path) = new_value;
}

/// Merge `source` into `target`: objects merge key by key, anything else
/// (arrays included) replaces the target value.
pub fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(t), Value::Object(s)) => {
            for (key, value) in s {
                match t.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        t.insert(key, value);
                    }
                }
            }
        }
        (t, s) => *t = s,
    }
}

/// [`deep_merge`] `source` into the subtree of `target` at `path`.
pub fn merge_at(target: &mut Value, path: &[String], source: Value) {
    let node = get_or_create(target, path);
    if node.is_null() {
        *node = source;
    } else {
        deep_merge(node, source);
    }
}
