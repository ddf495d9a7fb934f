//! Dotted-path access into `serde_json::Value` state.
//!
//! Store slices are addressed by keys like `"config"` or `"profile.flags"`.
//! Writes create missing intermediate objects the way an object-spread
//! update would, so a path is always writable.

use serde_json::{Map, Value};

/// Read the value at a dotted `path`, if every segment exists.
pub fn get_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut cursor = root;
    for segment in path.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor)
}

/// Write `value` at a dotted `path`, creating intermediate objects.
///
/// Non-object values along the path are replaced by fresh objects, so the
/// write always lands.
pub fn set_at(root: &mut Value, path: &str, value: Value) {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (parents, leaf),
        None => ("", path),
    };

    let mut cursor = root;
    if !parents.is_empty() {
        for segment in parents.split('.') {
            cursor = ensure_object(cursor).entry(segment).or_insert(Value::Null);
        }
    }
    ensure_object(cursor).insert(leaf.to_string(), value);
}

/// Shallow-merge `patch` onto `target`.
///
/// When both sides are objects, `patch`'s top-level keys overwrite
/// `target`'s and unmentioned keys survive. Otherwise `target` is replaced
/// by a clone of `patch`.
pub fn shallow_merge(target: &mut Value, patch: &Value) {
    match patch.as_object() {
        Some(fields) if target.is_object() => {
            let merged = ensure_object(target);
            for (key, value) in fields {
                merged.insert(key.clone(), value.clone());
            }
        }
        _ => *target = patch.clone(),
    }
}

fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_at_walks_nested_objects() {
        let state = json!({ "profile": { "flags": { "beta": true } } });

        assert_eq!(get_at(&state, "profile.flags.beta"), Some(&json!(true)));
        assert_eq!(get_at(&state, "profile.flags"), Some(&json!({ "beta": true })));
        assert_eq!(get_at(&state, "profile.missing"), None);
        assert_eq!(get_at(&state, "profile.flags.beta.deeper"), None);
    }

    #[test]
    fn set_at_creates_intermediates() {
        let mut state = json!({});
        set_at(&mut state, "a.b.c", json!(1));

        assert_eq!(state, json!({ "a": { "b": { "c": 1 } } }));
    }

    #[test]
    fn set_at_replaces_scalar_intermediates() {
        let mut state = json!({ "a": 5 });
        set_at(&mut state, "a.b", json!("x"));

        assert_eq!(state, json!({ "a": { "b": "x" } }));
    }

    #[test]
    fn shallow_merge_keeps_unmentioned_keys() {
        let mut value = json!({ "time": "", "isAdmin": false });
        shallow_merge(&mut value, &json!({ "time": "changed" }));

        assert_eq!(value, json!({ "time": "changed", "isAdmin": false }));
    }

    #[test]
    fn shallow_merge_replaces_when_not_objects() {
        let mut value = json!({ "a": 1 });
        shallow_merge(&mut value, &json!(7));
        assert_eq!(value, json!(7));

        let mut scalar = json!(7);
        shallow_merge(&mut scalar, &json!({ "a": 1 }));
        assert_eq!(scalar, json!({ "a": 1 }));
    }
}
