//! Bracket-notation flattening for form encoded bodies.
//!
//! `multipart/form-data` has no notion of nesting, so nested payloads are
//! flattened into `key[sub][0]` style field names:
//!
//! ```text
//! {"poll": {"options": ["a", "b"]}}  =>  poll[options][0] = "a"
//!                                        poll[options][1] = "b"
//! ```

use serde_json::{Map, Value};

/// Flatten `value` into ordered `(path, leaf)` pairs.
///
/// Top-level keys are unbracketed. Mappings contribute `prefix[key]`,
/// sequences contribute `prefix[index]` in their original order, and any
/// scalar (including null) ends the recursion. Empty mappings and sequences
/// contribute nothing.
///
/// # Example
///
/// ```
/// use masto_gateway_core::flatten;
/// use serde_json::json;
///
/// let flat = flatten(&json!({"animals": ["lion", "giraffe"]}));
/// assert_eq!(flat[0], ("animals[0]".to_string(), json!("lion")));
/// assert_eq!(flat[1], ("animals[1]".to_string(), json!("giraffe")));
/// ```
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    flatten_with_prefix(value, "")
}

/// Flatten `value` under an explicit prefix.
///
/// A scalar `value` is stored under `prefix` itself.
pub fn flatten_with_prefix(value: &Value, prefix: &str) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    flatten_into(value, prefix.to_owned(), &mut out);
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten_into(value, child_path(&prefix, key), out);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten_into(value, child_path(&prefix, &index.to_string()), out);
            }
        }
        leaf => out.push((prefix, leaf.clone())),
    }
}

fn child_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_owned()
    } else {
        format!("{prefix}[{segment}]")
    }
}

/// Render a flattened leaf as a form field value.
///
/// Strings are used verbatim, null becomes an empty field, and other scalars
/// use their JSON text (`123`, `true`).
pub fn leaf_to_field(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Error returned by [`unflatten`] for malformed bracket paths.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UnflattenError {
    /// A path had an unterminated or empty bracket segment.
    #[error("malformed field path: {0:?}")]
    MalformedPath(String),

    /// Two paths disagree about the shape of a shared prefix.
    #[error("conflicting field path: {0:?}")]
    Conflict(String),
}

/// Rebuild a nested value from bracket paths produced by [`flatten`].
///
/// Containers whose segments are all numeric indices become arrays, ordered
/// by index; everything else becomes a mapping.
///
/// The rebuild is lossy in a few places:
///
/// - empty mappings and sequences produced no fields, so they do not come back;
/// - a mapping whose keys are all numeric (`{"0": "a"}`) comes back as an array;
/// - gaps between indices are closed up.
///
/// ```
/// use masto_gateway_core::{flatten, unflatten};
/// use serde_json::json;
///
/// let original = json!({"tags": [], "meta": {}, "by_day": {"1": "mon"}, "status": "hi"});
/// let rebuilt = unflatten(flatten(&original)).unwrap();
/// assert_eq!(rebuilt, json!({"by_day": ["mon"], "status": "hi"}));
/// ```
pub fn unflatten<I>(pairs: I) -> Result<Value, UnflattenError>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut root = Value::Object(Map::new());
    for (path, leaf) in pairs {
        let segments = parse_path(&path)?;
        insert_path(&mut root, &segments, leaf, &path)?;
    }
    Ok(arrays_from_indices(root))
}

fn parse_path(path: &str) -> Result<Vec<String>, UnflattenError> {
    let malformed = || UnflattenError::MalformedPath(path.to_owned());
    let (head, mut rest) = match path.find('[') {
        Some(pos) => (&path[..pos], &path[pos..]),
        None => (path, ""),
    };
    if head.is_empty() {
        return Err(malformed());
    }
    let mut segments = vec![head.to_owned()];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[').ok_or_else(malformed)?;
        let end = inner.find(']').ok_or_else(malformed)?;
        if end == 0 {
            return Err(malformed());
        }
        segments.push(inner[..end].to_owned());
        rest = &inner[end + 1..];
    }
    Ok(segments)
}

fn insert_path(
    node: &mut Value,
    segments: &[String],
    leaf: Value,
    path: &str,
) -> Result<(), UnflattenError> {
    let conflict = || UnflattenError::Conflict(path.to_owned());
    let Value::Object(map) = node else {
        return Err(conflict());
    };
    let (first, rest) = segments.split_first().ok_or_else(conflict)?;
    if rest.is_empty() {
        if map.insert(first.clone(), leaf).is_some() {
            return Err(conflict());
        }
        return Ok(());
    }
    let child = map
        .entry(first.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    insert_path(child, rest, leaf, path)
}

fn arrays_from_indices(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let mut indexed: Vec<(usize, Value)> = Vec::with_capacity(map.len());
    let all_numeric = !map.is_empty() && map.keys().all(|k| k.parse::<usize>().is_ok());
    if all_numeric {
        for (key, value) in map {
            if let Ok(index) = key.parse::<usize>() {
                indexed.push((index, arrays_from_indices(value)));
            }
        }
        indexed.sort_by_key(|(index, _)| *index);
        return Value::Array(indexed.into_iter().map(|(_, v)| v).collect());
    }
    Value::Object(
        map.into_iter()
            .map(|(k, v)| (k, arrays_from_indices(v)))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup<'a>(flat: &'a [(String, Value)], key: &str) -> Option<&'a Value> {
        flat.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[test]
    fn test_flat_value() {
        let flat = flatten(&json!({"apple": "red", "mandarin": "orange", "grapes": "purple"}));
        assert_eq!(lookup(&flat, "apple"), Some(&json!("red")));
        assert_eq!(lookup(&flat, "mandarin"), Some(&json!("orange")));
        assert_eq!(lookup(&flat, "grapes"), Some(&json!("purple")));
    }

    #[test]
    fn test_array() {
        let flat = flatten(&json!({"animals": ["lion", "giraffe", "elephant"]}));
        assert_eq!(
            flat,
            vec![
                ("animals[0]".to_string(), json!("lion")),
                ("animals[1]".to_string(), json!("giraffe")),
                ("animals[2]".to_string(), json!("elephant")),
            ]
        );
    }

    #[test]
    fn test_nested_object() {
        let flat = flatten(&json!({
            "a": "string",
            "b": 123,
            "c": [1, 2, 3],
            "e": {
                "e1": "string",
                "e2": {
                    "e21": {"e211": "string"},
                    "e22": [{"value": 1}, {"value": 2}, {"value": 3}],
                },
            },
        }));

        let field = |key: &str| lookup(&flat, key).map(leaf_to_field);
        assert_eq!(field("a").as_deref(), Some("string"));
        assert_eq!(field("b").as_deref(), Some("123"));
        assert_eq!(field("c[0]").as_deref(), Some("1"));
        assert_eq!(field("c[1]").as_deref(), Some("2"));
        assert_eq!(field("c[2]").as_deref(), Some("3"));
        assert_eq!(field("e[e1]").as_deref(), Some("string"));
        assert_eq!(field("e[e2][e21][e211]").as_deref(), Some("string"));
        assert_eq!(field("e[e2][e22][0][value]").as_deref(), Some("1"));
        assert_eq!(field("e[e2][e22][1][value]").as_deref(), Some("2"));
        assert_eq!(field("e[e2][e22][2][value]").as_deref(), Some("3"));
    }

    #[test]
    fn test_null_is_a_leaf() {
        let flat = flatten(&json!({"spoiler_text": null}));
        assert_eq!(flat, vec![("spoiler_text".to_string(), Value::Null)]);
        assert_eq!(leaf_to_field(&Value::Null), "");
    }

    #[test]
    fn test_scalar_with_prefix() {
        assert_eq!(
            flatten_with_prefix(&json!("x"), "status"),
            vec![("status".to_string(), json!("x"))]
        );
    }

    #[test]
    fn test_round_trip_structure() {
        let original = json!({
            "status": "hello",
            "media_ids": ["1", "2"],
            "poll": {"options": ["yes", "no"], "expires_in": 3600, "multiple": false},
            "nested": [{"a": [1, {"b": null}]}, {"c": "d"}],
        });
        let rebuilt = unflatten(flatten(&original)).unwrap();
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_round_trip_keeps_array_order_past_ten() {
        let items: Vec<Value> = (0..12).map(|i| json!(format!("item{i}"))).collect();
        let original = json!({"items": items});
        assert_eq!(unflatten(flatten(&original)).unwrap(), original);
    }

    #[test]
    fn test_lossy_shapes() {
        let original = json!({
            "filter": {"keywords": [], "context": {}},
            "votes": {"0": "yes", "2": "no"},
            "status": "hello",
        });
        let flat = flatten(&original);
        assert!(lookup(&flat, "filter[keywords]").is_none());
        assert!(lookup(&flat, "filter[context]").is_none());
        assert_eq!(lookup(&flat, "votes[2]"), Some(&json!("no")));

        let rebuilt = unflatten(flat).unwrap();
        assert_eq!(rebuilt, json!({"votes": ["yes", "no"], "status": "hello"}));
    }

    #[test]
    fn test_unflatten_malformed() {
        let err = unflatten(vec![("a[b".to_string(), json!(1))]).unwrap_err();
        assert_eq!(err, UnflattenError::MalformedPath("a[b".to_string()));

        let err = unflatten(vec![("a[]".to_string(), json!(1))]).unwrap_err();
        assert_eq!(err, UnflattenError::MalformedPath("a[]".to_string()));
    }

    #[test]
    fn test_unflatten_conflict() {
        let err = unflatten(vec![
            ("a".to_string(), json!(1)),
            ("a[b]".to_string(), json!(2)),
        ])
        .unwrap_err();
        assert_eq!(err, UnflattenError::Conflict("a[b]".to_string()));
    }
}
