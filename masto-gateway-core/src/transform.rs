//! Recursive key case conversion for JSON payloads.
//!
//! The remote API speaks `snake_case`. Callers usually work with a different
//! convention, so every outgoing payload is rewritten to [`KeyCase::Snake`]
//! and every incoming payload back to the caller's [`KeyCase`].

use convert_case::{Case, Casing};
use serde_json::{Map, Value};

/// Key naming convention applied by [`transform_keys`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum KeyCase {
    /// `snake_case`, the wire convention.
    Snake,
    /// `camelCase`.
    #[default]
    Camel,
    /// Leave keys as they are.
    Preserve,
}

impl KeyCase {
    /// Convert a single key to this convention.
    pub fn apply(&self, key: &str) -> String {
        match self {
            KeyCase::Snake => key.to_case(Case::Snake),
            KeyCase::Camel => key.to_case(Case::Camel),
            KeyCase::Preserve => key.to_owned(),
        }
    }

    /// Rewrite every key of `value` to this convention.
    ///
    /// Collection endpoints answer with a top-level array, so unlike
    /// [`transform_keys`] this also rewrites the mappings inside a top-level
    /// array.
    pub fn transform(&self, value: Value) -> Value {
        let f = |key: &str| self.apply(key);
        match (self, value) {
            (KeyCase::Preserve, value) => value,
            (_, Value::Array(items)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| transform_keys_owned(item, &f))
                    .collect(),
            ),
            (_, value) => transform_keys_owned(value, &f),
        }
    }
}

/// Rewrite every mapping key in `value` with `f`.
///
/// A mapping gets every key passed through `f` and every value transformed
/// recursively; arrays nested inside a mapping are visited element-wise and
/// keep their order. Any other top-level value, an array included, comes
/// back unchanged. The input is left untouched.
///
/// # Example
///
/// ```
/// use masto_gateway_core::transform_keys;
/// use serde_json::json;
///
/// let value = json!({"a": {"b": [{"c": 1}]}});
/// let upper = transform_keys(&value, &|k: &str| k.to_uppercase());
/// assert_eq!(upper, json!({"A": {"B": [{"C": 1}]}}));
///
/// let list = json!([{"c": 1}]);
/// assert_eq!(transform_keys(&list, &|k: &str| k.to_uppercase()), list);
/// ```
pub fn transform_keys<F>(value: &Value, f: &F) -> Value
where
    F: Fn(&str) -> String,
{
    transform_keys_owned(value.clone(), f)
}

/// Owned variant of [`transform_keys`] that reuses the input allocation.
pub fn transform_keys_owned<F>(value: Value, f: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Object(map) => Value::Object(transform_map(map, f)),
        other => other,
    }
}

fn transform_map<F>(map: Map<String, Value>, f: &F) -> Map<String, Value>
where
    F: Fn(&str) -> String,
{
    let mut out = Map::with_capacity(map.len());
    for (key, value) in map {
        out.insert(f(&key), transform_nested(value, f));
    }
    out
}

fn transform_nested<F>(value: Value, f: &F) -> Value
where
    F: Fn(&str) -> String,
{
    match value {
        Value::Object(map) => Value::Object(transform_map(map, f)),
        Value::Array(items) => Value::Array(items.into_iter().map(|item| transform_nested(item, f)).collect()),
        scalar => scalar,
    }
}
