//! Property-based tests for the key-case transform.
//!
//! Uses proptest to verify:
//! 1. snake → camel → snake is the identity for single-underscore snake keys.
//! 2. Transforming with the identity mapper preserves any JSON value.
//! 3. Arrays keep their length and element order.
//! 4. Primitive and null values are never altered.

use proptest::prelude::*;
use serde_json::{Map, Number, Value};
use techflow_proto::case::{
    api_to_frontend, camel_to_snake, frontend_to_api, snake_to_camel, transform_keys,
};

/// Strategy for snake_case keys: lowercase alphanumeric segments joined by
/// single underscores, each segment starting with a letter.
fn arb_snake_key() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9]{0,8}", 1..5).prop_map(|segments| segments.join("_"))
}

/// Strategy for arbitrary object keys, including odd casing and underscores.
fn arb_any_key() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{0,12}"
}

/// Strategy for JSON leaves.
fn arb_leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(Number::from(n))),
        "[^\x00]{0,16}".prop_map(Value::String),
    ]
}

/// Strategy for nested JSON values with arbitrary keys.
fn arb_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((arb_any_key(), inner), 0..6).prop_map(|entries| {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

/// Strategy for nested JSON values whose keys are all snake_case.
fn arb_snake_json() -> impl Strategy<Value = Value> {
    arb_leaf().prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
            prop::collection::vec((arb_snake_key(), inner), 0..6).prop_map(|entries| {
                let mut map = Map::new();
                for (k, v) in entries {
                    map.insert(k, v);
                }
                Value::Object(map)
            }),
        ]
    })
}

proptest! {
    /// Snake keys survive a round trip through camelCase.
    #[test]
    fn snake_camel_snake_is_identity(key in arb_snake_key()) {
        prop_assert_eq!(camel_to_snake(&snake_to_camel(&key)), key);
    }

    /// The identity mapper reproduces the input exactly.
    #[test]
    fn identity_mapper_preserves_value(value in arb_json()) {
        let out = transform_keys(value.clone(), &|k: &str| k.to_string());
        prop_assert_eq!(out, value);
    }

    /// Whole documents with snake keys round-trip through the frontend shape.
    #[test]
    fn snake_documents_round_trip(value in arb_snake_json()) {
        prop_assert_eq!(frontend_to_api(api_to_frontend(value.clone())), value);
    }

    /// Arrays keep length and order; each element is transformed on its own.
    #[test]
    fn arrays_map_element_wise(items in prop::collection::vec(arb_snake_json(), 0..10)) {
        let out = api_to_frontend(Value::Array(items.clone()));
        let Value::Array(out_items) = out else {
            return Err(TestCaseError::fail("array became a non-array"));
        };
        prop_assert_eq!(out_items.len(), items.len());
        for (got, original) in out_items.into_iter().zip(items) {
            prop_assert_eq!(got, api_to_frontend(original));
        }
    }

    /// Leaves pass through untouched.
    #[test]
    fn leaves_pass_through(leaf in arb_leaf()) {
        prop_assert_eq!(api_to_frontend(leaf.clone()), leaf.clone());
        prop_assert_eq!(frontend_to_api(leaf.clone()), leaf);
    }

    /// Camel keys never contain an underscore followed by a lowercase letter.
    #[test]
    fn camel_output_has_no_snake_boundaries(key in arb_any_key()) {
        let camel = snake_to_camel(&key);
        let bytes = camel.as_bytes();
        for pair in bytes.windows(2) {
            prop_assert!(!(pair[0] == b'_' && pair[1].is_ascii_lowercase()));
        }
    }
}
