//! Path-addressed reads and writes over the tree.
//!
//! All functions operate on the raw tree value; snapshotting and dispatch
//! are the engine's concern. The tree root is always a map.

use serde_json::{Map, Value};

use crate::error::{Error, MAX_MERGE_DEPTH};

/// Immutable walk to the node at `path`.
pub(crate) fn get_at<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    let mut cur = root;
    for segment in path {
        cur = cur.as_object()?.get(segment)?;
    }
    Some(cur)
}

fn get_at_mut<'a>(root: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    let mut cur = root;
    for segment in path {
        cur = cur.as_object_mut()?.get_mut(segment)?;
    }
    Some(cur)
}

/// Mutable walk to the node at `path`, creating intermediate map nodes.
/// Non-map intermediates are replaced by fresh maps.
fn vivify<'a>(root: &'a mut Value, path: &[String]) -> &'a mut Value {
    let mut cur = root;
    for segment in path {
        if !cur.is_object() {
            *cur = Value::Object(Map::new());
        }
        // Indexing an object auto-inserts Null for a missing key.
        cur = &mut cur[segment.as_str()];
    }
    cur
}

/// Store `value` at `path` and return the value as stored. When both the
/// existing node and `value` are maps the write is a recursive key-wise
/// deep merge: conflicting keys take the new value, other existing keys
/// are preserved. Anything else overwrites. The empty path merges into
/// the root, which must stay a map.
pub(crate) fn set_at(root: &mut Value, path: &[String], value: Value) -> Result<Value, Error> {
    if path.is_empty() && !value.is_object() {
        return Err(Error::RootNotMap);
    }
    let slot = vivify(root, path);
    merge_value(slot, value, 0)?;
    Ok(slot.clone())
}

fn merge_value(dst: &mut Value, src: Value, depth: usize) -> Result<(), Error> {
    if depth > MAX_MERGE_DEPTH {
        return Err(Error::DepthExceeded);
    }
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (key, src_val) in src_map {
                match dst_map.get_mut(&key) {
                    Some(existing) => merge_value(existing, src_val, depth + 1)?,
                    None => {
                        dst_map.insert(key, src_val);
                    }
                }
            }
            Ok(())
        }
        (dst, src) => {
            *dst = src;
            Ok(())
        }
    }
}

/// Delete the terminal key of `path` from its parent map. No-op when the
/// path is absent or empty.
pub(crate) fn erase_at(root: &mut Value, path: &[String]) {
    let Some((leaf, parent)) = path.split_last() else {
        return;
    };
    if let Some(Value::Object(map)) = get_at_mut(root, parent) {
        map.remove(leaf);
    }
}

/// Append `value` to the list at `path`, concatenating when `value` is
/// itself a list. A non-list node is replaced by a fresh list first.
/// Returns the list as it existed before the push (`Null` when there was
/// none).
pub(crate) fn push_at(root: &mut Value, path: &[String], value: Value) -> Value {
    let slot = vivify(root, path);
    let previous = match slot {
        Value::Array(_) => slot.clone(),
        _ => Value::Null,
    };
    let mut list = match std::mem::take(slot) {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    match value {
        Value::Array(items) => list.extend(items),
        other => list.push(other),
    }
    *slot = Value::Array(list);
    previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        datalayer_path::parse_path(path).unwrap()
    }

    fn root() -> Value {
        Value::Object(Map::new())
    }

    #[test]
    fn set_creates_intermediates() {
        let mut tree = root();
        set_at(&mut tree, &segs("a.b.c"), json!("x")).unwrap();
        assert_eq!(tree, json!({"a": {"b": {"c": "x"}}}));
    }

    #[test]
    fn set_merges_maps() {
        let mut tree = root();
        set_at(&mut tree, &segs("a"), json!({"x": 1, "deep": {"k": 1}})).unwrap();
        set_at(&mut tree, &segs("a"), json!({"y": 2, "deep": {"j": 2}})).unwrap();
        assert_eq!(tree, json!({"a": {"x": 1, "deep": {"k": 1, "j": 2}, "y": 2}}));
    }

    #[test]
    fn set_overwrites_scalars_and_lists() {
        let mut tree = root();
        set_at(&mut tree, &segs("a"), json!([1, 2])).unwrap();
        set_at(&mut tree, &segs("a"), json!([3])).unwrap();
        assert_eq!(tree, json!({"a": [3]}));
        set_at(&mut tree, &segs("a"), json!({"k": 1})).unwrap();
        assert_eq!(tree, json!({"a": {"k": 1}}));
    }

    #[test]
    fn set_replaces_non_map_intermediate() {
        let mut tree = root();
        set_at(&mut tree, &segs("a"), json!("scalar")).unwrap();
        set_at(&mut tree, &segs("a.b"), json!(1)).unwrap();
        assert_eq!(tree, json!({"a": {"b": 1}}));
    }

    #[test]
    fn set_returns_stored_value() {
        let mut tree = root();
        set_at(&mut tree, &segs("a"), json!({"x": 1})).unwrap();
        let stored = set_at(&mut tree, &segs("a"), json!({"y": 2})).unwrap();
        assert_eq!(stored, json!({"x": 1, "y": 2}));
    }

    #[test]
    fn root_set_must_be_map() {
        let mut tree = root();
        assert!(matches!(set_at(&mut tree, &[], json!(5)), Err(Error::RootNotMap)));
        set_at(&mut tree, &[], json!({"a": 1})).unwrap();
        assert_eq!(tree, json!({"a": 1}));
    }

    #[test]
    fn merge_depth_guard_fails_loudly() {
        fn nested(depth: usize) -> Value {
            let mut v = json!({"leaf": 1});
            for _ in 0..depth {
                v = json!({"n": v});
            }
            v
        }
        let mut tree = root();
        set_at(&mut tree, &segs("a"), nested(MAX_MERGE_DEPTH + 8)).unwrap();
        let result = set_at(&mut tree, &segs("a"), nested(MAX_MERGE_DEPTH + 8));
        assert!(matches!(result, Err(Error::DepthExceeded)));
    }

    #[test]
    fn erase_is_noop_for_absent_path() {
        let mut tree = root();
        set_at(&mut tree, &segs("a.b"), json!(1)).unwrap();
        erase_at(&mut tree, &segs("a.missing"));
        erase_at(&mut tree, &segs("x.y.z"));
        assert_eq!(tree, json!({"a": {"b": 1}}));
        erase_at(&mut tree, &segs("a.b"));
        assert_eq!(tree, json!({"a": {}}));
    }

    #[test]
    fn push_appends_and_concatenates() {
        let mut tree = root();
        assert_eq!(push_at(&mut tree, &segs("arr"), json!("v1")), json!(null));
        assert_eq!(push_at(&mut tree, &segs("arr"), json!("v2")), json!(["v1"]));
        assert_eq!(
            push_at(&mut tree, &segs("arr"), json!(["v3", "v4"])),
            json!(["v1", "v2"])
        );
        assert_eq!(tree, json!({"arr": ["v1", "v2", "v3", "v4"]}));
    }

    #[test]
    fn push_replaces_non_list() {
        let mut tree = root();
        set_at(&mut tree, &segs("a"), json!("scalar")).unwrap();
        assert_eq!(push_at(&mut tree, &segs("a"), json!(1)), json!(null));
        assert_eq!(tree, json!({"a": [1]}));
    }
}
