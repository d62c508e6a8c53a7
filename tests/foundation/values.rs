//! Integration tests for the Value data model
//!
//! Tests construction, truthiness, the absence sentinel, identifier
//! extraction, and conversions.

use std::sync::Arc;

use verity_foundation::{ID_FIELD, Value};

// =============================================================================
// Construction and extraction
// =============================================================================

#[test]
fn value_nil() {
    let v = Value::Nil;
    assert!(v.is_nil());
    assert!(!v.is_truthy());
    assert!(v.is_absent());
}

#[test]
fn value_bool() {
    assert_eq!(Value::Bool(true).as_bool(), Some(true));
    assert!(!Value::Bool(false).is_truthy());
    assert!(!Value::Bool(false).is_absent());
}

#[test]
fn value_int_and_float() {
    assert_eq!(Value::Int(42).as_int(), Some(42));
    assert_eq!(Value::Int(42).as_float(), None);
    assert_eq!(Value::Float(1.5).as_float(), Some(1.5));
    assert_eq!(Value::Float(1.5).as_number(), Some(1.5));
    assert_eq!(Value::Int(2).as_number(), Some(2.0));
}

#[test]
fn value_string() {
    let v = Value::String(Arc::from("hello"));
    assert_eq!(v.as_str(), Some("hello"));
    // Empty string is still truthy; only nil and false are falsy.
    assert!(Value::from("").is_truthy());
}

#[test]
fn value_zero_is_truthy() {
    assert!(Value::Int(0).is_truthy());
    assert!(Value::Float(0.0).is_truthy());
}

#[test]
fn nan_is_absent_but_other_floats_are_not() {
    assert!(Value::Float(f64::NAN).is_absent());
    assert!(!Value::Float(f64::INFINITY).is_absent());
    assert!(!Value::Float(0.0).is_absent());
}

// =============================================================================
// Composites
// =============================================================================

#[test]
fn map_builder_and_lookup() {
    let user: Value = [("id", Value::from("u-1")), ("age", Value::Int(30))]
        .into_iter()
        .collect();
    let map = user.as_map().unwrap();
    assert_eq!(map.get("age"), Some(&Value::Int(30)));
    assert_eq!(map.get(ID_FIELD), Some(&Value::from("u-1")));
}

#[test]
fn id_extraction_only_applies_to_entity_maps() {
    let user: Value = [("id", Value::from("u-1"))].into_iter().collect();
    assert_eq!(user.id(), Some(&Value::from("u-1")));

    let anonymous: Value = [("name", Value::from("Ada"))].into_iter().collect();
    assert_eq!(anonymous.id(), None);
    assert_eq!(Value::Int(7).id(), None);
}

#[test]
fn vec_builder_preserves_order() {
    let v: Value = [Value::Int(1), Value::Int(2), Value::Int(3)]
        .into_iter()
        .collect();
    let items = v.as_vec().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items.get(0), Some(&Value::Int(1)));
}

// =============================================================================
// Equality
// =============================================================================

#[test]
fn structural_equality_for_maps() {
    let a: Value = [("x", Value::Int(1))].into_iter().collect();
    let b: Value = [("x", Value::Int(1))].into_iter().collect();
    assert_eq!(a, b);
}

#[test]
fn different_types_are_never_equal() {
    assert_ne!(Value::Int(1), Value::Float(1.0));
    assert_ne!(Value::Bool(false), Value::Nil);
}
