//! Optimistic update primitives.
//!
//! A local collection is patched immediately so callers observe the
//! predicted end state, then the authoritative write is awaited with
//! [`confirm_or_revert`]. These functions are pure or only await what they
//! are given; the task board in the client crate builds its reconciliation
//! policy on top of them.

use std::future::Future;

use serde_json::{Map, Value};

/// An entity that can be found in a collection by key.
pub trait Keyed {
    /// Key type, usually an identifier newtype.
    type Key: PartialEq;

    /// Returns this entity's key.
    fn key(&self) -> &Self::Key;
}

/// A set of field overrides that can be spread over an entity.
pub trait Patch<E> {
    /// Returns a copy of `entity` with this patch applied.
    fn apply(&self, entity: &E) -> E;
}

/// Spreads the patch's keys over a JSON object. Non-object targets are
/// returned unchanged.
impl Patch<Value> for Map<String, Value> {
    fn apply(&self, entity: &Value) -> Value {
        match entity {
            Value::Object(fields) => {
                let mut next = fields.clone();
                for (key, value) in self {
                    next.insert(key.clone(), value.clone());
                }
                Value::Object(next)
            }
            other => other.clone(),
        }
    }
}

/// Returns a copy of `collection` with the entity keyed `id` patched.
///
/// Other entities and their order are unchanged. If no entity has that key
/// the copy equals the input.
pub fn apply_optimistic<E, P>(collection: &[E], id: &E::Key, patch: &P) -> Vec<E>
where
    E: Keyed + Clone,
    P: Patch<E>,
{
    collection
        .iter()
        .map(|entity| {
            if entity.key() == id {
                patch.apply(entity)
            } else {
                entity.clone()
            }
        })
        .collect()
}

/// Patches the entity keyed `id` in place.
///
/// Returns `false` (and leaves the collection untouched) if no entity has
/// that key.
pub fn apply_optimistic_in_place<E, P>(collection: &mut [E], id: &E::Key, patch: &P) -> bool
where
    E: Keyed,
    P: Patch<E>,
{
    let mut matched = false;
    for entity in collection.iter_mut().filter(|e| e.key() == id) {
        *entity = patch.apply(entity);
        matched = true;
    }
    matched
}

/// Awaits an authoritative write and reverts on failure.
///
/// On `Ok` the value is returned and `on_revert` is never called. On `Err`
/// `on_revert` runs to completion first (typically a full re-fetch that
/// discards the optimistic guess) and then the original error is returned.
///
/// # Errors
///
/// Returns the error produced by `remote_call`.
pub async fn confirm_or_revert<T, E, C, R, RF>(remote_call: C, on_revert: R) -> Result<T, E>
where
    C: Future<Output = Result<T, E>>,
    R: FnOnce() -> RF,
    RF: Future<Output = ()>,
{
    match remote_call.await {
        Ok(value) => Ok(value),
        Err(e) => {
            on_revert().await;
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Card {
        id: String,
        status: &'static str,
    }

    impl Keyed for Card {
        type Key = String;

        fn key(&self) -> &String {
            &self.id
        }
    }

    struct SetStatus(&'static str);

    impl Patch<Card> for SetStatus {
        fn apply(&self, card: &Card) -> Card {
            Card {
                status: self.0,
                ..card.clone()
            }
        }
    }

    fn cards() -> Vec<Card> {
        vec![
            Card {
                id: "1".to_string(),
                status: "TODO",
            },
            Card {
                id: "2".to_string(),
                status: "TODO",
            },
        ]
    }

    #[test]
    fn patches_only_the_matching_entity() {
        let out = apply_optimistic(&cards(), &"1".to_string(), &SetStatus("COMPLETED"));
        assert_eq!(out[0].status, "COMPLETED");
        assert_eq!(out[1], cards()[1]);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn unknown_id_returns_unchanged_copy() {
        let out = apply_optimistic(&cards(), &"9".to_string(), &SetStatus("COMPLETED"));
        assert_eq!(out, cards());
    }

    #[test]
    fn in_place_reports_match() {
        let mut list = cards();
        assert!(apply_optimistic_in_place(
            &mut list,
            &"2".to_string(),
            &SetStatus("IN_PROGRESS")
        ));
        assert_eq!(list[1].status, "IN_PROGRESS");
        assert!(!apply_optimistic_in_place(
            &mut list,
            &"3".to_string(),
            &SetStatus("IN_PROGRESS")
        ));
    }

    #[test]
    fn json_spread_overrides_and_adds_keys() {
        let mut patch = Map::new();
        patch.insert("status".to_string(), json!("COMPLETED"));
        patch.insert("seen".to_string(), json!(true));
        let out = patch.apply(&json!({ "id": "1", "status": "TODO" }));
        assert_eq!(out, json!({ "id": "1", "status": "COMPLETED", "seen": true }));
        assert_eq!(patch.apply(&json!(3)), json!(3));
    }

    #[tokio::test]
    async fn confirm_skips_revert() {
        let flag = Cell::new(false);
        let reverted = &flag;
        let result: Result<u8, &str> =
            confirm_or_revert(async { Ok(5) }, move || async move { reverted.set(true) }).await;
        assert_eq!(result, Ok(5));
        assert!(!reverted.get());
    }

    #[tokio::test]
    async fn failure_reverts_then_surfaces_error() {
        let flag = Cell::new(false);
        let reverted = &flag;
        let result: Result<u8, &str> =
            confirm_or_revert(async { Err("boom") }, move || async move { reverted.set(true) })
                .await;
        assert_eq!(result, Err("boom"));
        assert!(reverted.get());
    }
}
