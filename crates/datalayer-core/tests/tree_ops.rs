use datalayer_core::{DataLayer, Error};
use serde_json::json;

#[test]
fn set_then_get() {
    let mut layer = DataLayer::new();
    layer.set("a.b", json!("x")).unwrap();
    assert_eq!(layer.get("a.b").unwrap(), Some(json!("x")));
    assert_eq!(layer.get("a").unwrap(), Some(json!({"b": "x"})));
    assert_eq!(layer.get("a.missing").unwrap(), None);
}

#[test]
fn set_merges_maps_instead_of_overwriting() {
    let mut layer = DataLayer::new();
    layer.set("a", json!({"x": 1})).unwrap();
    layer.set("a", json!({"y": 2})).unwrap();
    assert_eq!(layer.get("a").unwrap(), Some(json!({"x": 1, "y": 2})));
}

#[test]
fn set_returns_stored_value() {
    let mut layer = DataLayer::new();
    layer.set("a", json!({"x": 1})).unwrap();
    let stored = layer.set("a", json!({"y": 2})).unwrap();
    assert_eq!(stored, json!({"x": 1, "y": 2}));
}

#[test]
fn root_set_merges_and_rejects_scalars() {
    let mut layer = DataLayer::new();
    layer.set("", json!({"a": 1})).unwrap();
    layer.set("", json!({"b": 2})).unwrap();
    assert_eq!(layer.get("").unwrap(), Some(json!({"a": 1, "b": 2})));
    assert!(matches!(layer.set("", json!(5)), Err(Error::RootNotMap)));
}

#[test]
fn push_appends_then_concatenates() {
    let mut layer = DataLayer::new();
    layer.push("arr", json!("v1")).unwrap();
    layer.push("arr", json!("v2")).unwrap();
    assert_eq!(layer.get("arr").unwrap(), Some(json!(["v1", "v2"])));
    let before = layer.push("arr", json!(["v3", "v4"])).unwrap();
    assert_eq!(before, json!(["v1", "v2"]));
    assert_eq!(layer.get("arr").unwrap(), Some(json!(["v1", "v2", "v3", "v4"])));
}

#[test]
fn push_replaces_non_list_value() {
    let mut layer = DataLayer::new();
    layer.set("k", json!("scalar")).unwrap();
    let before = layer.push("k", json!(1)).unwrap();
    assert_eq!(before, json!(null));
    assert_eq!(layer.get("k").unwrap(), Some(json!([1])));
}

#[test]
fn erase_removes_node_and_tolerates_absence() {
    let mut layer = DataLayer::new();
    layer.set("a.b", json!(1)).unwrap();
    layer.erase("a.missing").unwrap();
    layer.erase("never.there").unwrap();
    assert!(layer.has("a.b").unwrap());
    layer.erase("a.b").unwrap();
    assert!(!layer.has("a.b").unwrap());
    assert_eq!(layer.get("a").unwrap(), Some(json!({})));
}

#[test]
fn empty_predicate() {
    let mut layer = DataLayer::new();
    assert!(layer.empty("missing").unwrap());
    layer.set("n", json!(null)).unwrap();
    layer.set("s", json!("  \t")).unwrap();
    layer.set("m", json!({})).unwrap();
    layer.set("l", json!([])).unwrap();
    layer.set("zero", json!(0)).unwrap();
    layer.set("flag", json!(false)).unwrap();
    assert!(layer.empty("n").unwrap());
    assert!(layer.empty("s").unwrap());
    assert!(layer.empty("m").unwrap());
    assert!(layer.empty("l").unwrap());
    assert!(!layer.empty("zero").unwrap());
    assert!(!layer.empty("flag").unwrap());
}

#[test]
fn get_or_does_not_write() {
    let layer = DataLayer::new();
    assert_eq!(layer.get_or("k", json!("fallback")).unwrap(), json!("fallback"));
    assert!(!layer.has("k").unwrap());
}

#[test]
fn get_or_insert_writes_once() {
    let mut layer = DataLayer::new();
    assert_eq!(layer.get_or_insert("k", json!("v")).unwrap(), json!("v"));
    assert!(layer.has("k").unwrap());
    // Present now, so the second default is ignored.
    assert_eq!(layer.get_or_insert("k", json!("other")).unwrap(), json!("v"));
}

#[test]
fn returned_values_do_not_alias_the_tree() {
    let mut layer = DataLayer::new();
    layer.set("a", json!({"b": [1]})).unwrap();
    let mut copy = layer.get("a").unwrap().unwrap();
    copy["b"][0] = json!(99);
    assert_eq!(layer.get("a.b").unwrap(), Some(json!([1])));
}

#[test]
fn malformed_paths_are_rejected() {
    let mut layer = DataLayer::new();
    assert!(layer.get("a..b").is_err());
    assert!(layer.set(".a", json!(1)).is_err());
    assert!(layer.erase("a.").is_err());
    assert!(matches!(layer.erase(""), Err(Error::RootPath(_))));
    assert!(matches!(layer.push("", json!(1)), Err(Error::RootPath(_))));
}

#[test]
fn failed_merge_rolls_back_to_previous_state() {
    fn nested(depth: usize) -> serde_json::Value {
        let mut v = json!({"leaf": 1});
        for _ in 0..depth {
            v = json!({"n": v});
        }
        v
    }
    let mut layer = DataLayer::new();
    let deep = nested(datalayer_core::MAX_MERGE_DEPTH + 8);
    layer.set("a", deep.clone()).unwrap();
    layer.set("marker", json!("before")).unwrap();
    assert!(matches!(layer.set("a", deep), Err(Error::DepthExceeded)));
    assert_eq!(layer.get("marker").unwrap(), Some(json!("before")));
}
