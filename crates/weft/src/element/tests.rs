use std::rc::Rc;

use super::{
    create_element, create_text_element, ElementKind, EventHandler, PropValue, Props, TEXT_PROP,
};
use crate::error::EngineError;

#[test]
fn create_element_extracts_key_and_ref() {
    let props = Props::new()
        .with("key", "row-3")
        .with("ref", "ignored")
        .with("id", "panel");
    let element = create_element("div", props, Vec::new()).unwrap();

    assert_eq!(element.kind, ElementKind::Host("div".into()));
    assert_eq!(element.key.as_deref(), Some("row-3"));
    assert!(element.props.get("key").is_none());
    assert!(element.props.get("ref").is_none());
    assert_eq!(element.props.str("id"), Some("panel"));
}

#[test]
fn create_element_rejects_empty_tag() {
    let result = create_element("", Props::new(), Vec::new());
    assert!(matches!(result, Err(EngineError::MalformedElement(_))));
}

#[test]
fn create_element_rejects_non_string_key() {
    let props = Props::new().with("key", 7.0);
    let result = create_element("div", props, Vec::new());
    assert!(matches!(result, Err(EngineError::MalformedElement(_))));
}

#[test]
fn create_element_rejects_event_prop_without_handler() {
    let props = Props::new().with("onclick", "not a handler");
    let result = create_element("button", props, Vec::new());
    assert!(matches!(result, Err(EngineError::MalformedElement(_))));
}

#[test]
fn create_text_element_carries_payload() {
    let element = create_text_element("hello");
    assert_eq!(element.kind, ElementKind::Text);
    assert_eq!(element.props.str(TEXT_PROP), Some("hello"));
    assert!(element.children.is_empty());
}

#[test]
fn props_preserve_insertion_order_and_replace_in_place() {
    let mut props = Props::new().with("a", "1").with("b", "2");
    props.set("a", "3");

    let names: Vec<&str> = props.iter().map(|(name, _)| name).collect();
    assert_eq!(names, ["a", "b"]);
    assert_eq!(props.str("a"), Some("3"));
    assert_eq!(props.len(), 2);
}

#[test]
fn props_equality_ignores_order() {
    let left = Props::new().with("a", "1").with("b", true);
    let right = Props::new().with("b", true).with("a", "1");
    assert_eq!(left, right);

    let changed = Props::new().with("a", "2").with("b", true);
    assert_ne!(left, changed);
}

#[test]
fn handler_props_compare_by_identity() {
    let first: EventHandler = Rc::new(|| {});
    let second: EventHandler = Rc::new(|| {});

    assert_eq!(
        PropValue::Handler(first.clone()),
        PropValue::Handler(first.clone())
    );
    assert_ne!(PropValue::Handler(first), PropValue::Handler(second));
}
