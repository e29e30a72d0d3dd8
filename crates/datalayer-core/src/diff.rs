//! Snapshot diffing.
//!
//! Compares two tree snapshots and returns the deduplicated list of
//! dot-paths whose values differ. The result carries paths only; callers
//! re-read current values from the live tree.

use datalayer_util::deep_equal;
use indexmap::IndexSet;
use serde_json::Value;

use datalayer_path::join_path;

/// Changed paths between two snapshots. A one-directional walk runs twice
/// with the operands swapped and the results are unioned, since a single
/// direction misses keys present only in the other operand. Walk order is
/// parent-before-child; callers wanting deepest-first reverse the list.
pub(crate) fn diff_paths(previous: &Value, current: &Value) -> Vec<String> {
    let mut out: IndexSet<String> = IndexSet::new();
    walk(current, Some(previous), &mut Vec::new(), &mut out);
    walk(previous, Some(current), &mut Vec::new(), &mut out);
    out.into_iter().collect()
}

fn walk(side: &Value, other: Option<&Value>, prefix: &mut Vec<String>, out: &mut IndexSet<String>) {
    let Value::Object(map) = side else {
        return;
    };
    for (key, child) in map {
        prefix.push(key.clone());
        let counterpart = other.and_then(Value::as_object).and_then(|m| m.get(key));
        if child.is_object() {
            // Node-level absence is a difference of its own, in addition
            // to the leaf differences found by recursing.
            if counterpart.is_none() {
                out.insert(join_path(prefix));
            }
            walk(child, counterpart, prefix, out);
        } else {
            match counterpart {
                Some(existing) if deep_equal(child, existing) => {}
                _ => {
                    out.insert(join_path(prefix));
                }
            }
        }
        prefix.pop();
    }
}
