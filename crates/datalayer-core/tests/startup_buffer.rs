use std::cell::RefCell;
use std::rc::Rc;

use datalayer_core::{DataLayer, FirePayload, Handler, ListenOptions, StartupBuffer};
use serde_json::json;

#[test]
fn buffered_registrations_precede_buffered_triggers() {
    let mut buffer = StartupBuffer::new();
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handler = Handler::new({
        let seen = seen.clone();
        move |_, payload: &FirePayload| {
            if let FirePayload::Event(event) = payload {
                seen.borrow_mut().push(event.payload.get("step").cloned());
            }
            Ok(false)
        }
    });

    // Page code runs against the stand-in before the engine exists.
    buffer.trigger("step", Some(json!({"step": 1})));
    buffer.listen(&["step"], handler, ListenOptions::default());
    buffer.trigger("step", Some(json!({"step": 2})));
    assert!(!buffer.is_empty());

    let mut layer = DataLayer::new();
    layer.adopt(buffer).unwrap();

    // The registration lands first, so both buffered triggers are live
    // deliveries, in their original order.
    assert_eq!(
        seen.borrow().as_slice(),
        [Some(json!(1)), Some(json!(2))]
    );
    assert!(layer.is_triggered("step"));
}

#[test]
fn events_only_buffer_still_populates_the_log() {
    let mut buffer = StartupBuffer::new();
    buffer.trigger("early", Some(json!({"n": 1})));
    buffer.trigger("early", Some(json!({"n": 2})));

    let mut layer = DataLayer::new();
    layer.adopt(buffer).unwrap();

    // Late listeners pick the buffered events up through replay.
    let seen = Rc::new(RefCell::new(Vec::new()));
    let handler = Handler::new({
        let seen = seen.clone();
        move |_, payload: &FirePayload| {
            if let FirePayload::Event(event) = payload {
                seen.borrow_mut().push(event.payload.get("n").cloned());
            }
            Ok(false)
        }
    });
    layer.listen(&["early"], handler, ListenOptions::default()).unwrap();
    assert_eq!(seen.borrow().as_slice(), [Some(json!(1)), Some(json!(2))]);
}

#[test]
fn empty_buffer_is_a_no_op() {
    let buffer = StartupBuffer::new();
    assert!(buffer.is_empty());
    let mut layer = DataLayer::new();
    layer.adopt(buffer).unwrap();
    assert!(!layer.is_triggered("anything"));
}

#[test]
fn buffered_patch_triggers_mutate_the_tree() {
    let mut buffer = StartupBuffer::new();
    buffer.trigger("page.load", Some(json!({"dd": {"page": {"name": "Home"}}})));

    let mut layer = DataLayer::new();
    layer.adopt(buffer).unwrap();
    assert_eq!(layer.get("page.name").unwrap(), Some(json!("Home")));
}
