//! Key-case conversion between the snake_case wire format and the
//! camelCase document shape used by the client.
//!
//! [`transform_keys`] rewrites every object key of a JSON value with a key
//! mapper, leaving array order and primitive values untouched. The two
//! standard mappers are deliberately naive:
//!
//! - [`snake_to_camel`] only rewrites `_` followed by an ASCII lowercase
//!   letter. Leading, trailing, and doubled underscores are not special.
//! - [`camel_to_snake`] rewrites every ASCII uppercase letter, so acronyms
//!   expand letter by letter (`HTTPStatus` becomes `_h_t_t_p_status`).
//!
//! Keys made of lowercase alphanumeric segments joined by single
//! underscores survive a snake → camel → snake round trip unchanged.

use serde_json::{Map, Value};

/// Converts a snake_case key to camelCase (`due_date` → `dueDate`).
#[must_use]
pub fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '_'
            && let Some(&next) = chars.peek()
            && next.is_ascii_lowercase()
        {
            out.push(next.to_ascii_uppercase());
            chars.next();
        } else {
            out.push(c);
        }
    }
    out
}

/// Converts a camelCase key to snake_case (`dueDate` → `due_date`).
#[must_use]
pub fn camel_to_snake(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Recursively rewrites the keys of every object inside `value`.
///
/// - `null` and primitives are returned as-is.
/// - Arrays keep their length and order; each element is transformed.
/// - Objects are rebuilt key by key. When two source keys map to the same
///   target key, the later one overwrites the value and the first position
///   is kept.
pub fn transform_keys<F>(value: Value, key_mapper: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| transform_keys(item, key_mapper))
                .collect(),
        ),
        Value::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (key, inner) in map {
                out.insert(key_mapper(&key), transform_keys(inner, key_mapper));
            }
            Value::Object(out)
        }
        other => other,
    }
}

/// Converts a wire (snake_case) document into the client's camelCase shape.
#[must_use]
pub fn api_to_frontend(value: Value) -> Value {
    transform_keys(value, &snake_to_camel)
}

/// Converts a client (camelCase) document into the wire's snake_case shape.
#[must_use]
pub fn frontend_to_api(value: Value) -> Value {
    transform_keys(value, &camel_to_snake)
}
