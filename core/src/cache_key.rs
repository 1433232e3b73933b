//! Deterministic cache keys for an external response cache.
//!
//! Only top-level object keys are sorted. Nested objects keep their own key
//! order, so callers that nest parameter objects must build them in a stable
//! order to get matching keys.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Value};

pub const SEPARATOR: char = ':';

/// Key for `params` under `prefix`. With no params (`None` or JSON `null`)
/// the key is the prefix.
pub fn cache_key(prefix: &str, params: Option<&Value>) -> String {
    let params = match params {
        None | Some(Value::Null) => return prefix.to_string(),
        Some(params) => params,
    };

    let normalized = match params {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect::<Map<String, Value>>(),
            )
        }
        other => other.clone(),
    };

    // Serializing a `Value` cannot fail: keys are always strings.
    let encoded = STANDARD.encode(normalized.to_string());
    format!("{prefix}{SEPARATOR}{encoded}")
}

/// `cache_key` for any serializable parameter type. Falls back to the bare
/// prefix if `params` cannot be represented as JSON.
pub fn cache_key_for<P: serde::Serialize + ?Sized>(prefix: &str, params: &P) -> String {
    match serde_json::to_value(params) {
        Ok(value) => cache_key(prefix, Some(&value)),
        Err(error) => {
            tracing::warn!(%error, prefix, "cache key parameters are not serializable");
            prefix.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn no_params_yields_prefix() {
        assert_eq!(cache_key("contacts", None), "contacts");
    }

    #[test]
    fn null_params_yield_prefix() {
        assert_eq!(cache_key("contacts", Some(&Value::Null)), "contacts");
    }

    #[test]
    fn typed_none_yields_prefix() {
        assert_eq!(cache_key_for("p", &None::<Value>), "p");
        assert_eq!(
            cache_key_for("p", &Some(json!({"a": 1}))),
            cache_key("p", Some(&json!({"a": 1})))
        );
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut first = Map::new();
        first.insert("b".to_string(), json!(2));
        first.insert("a".to_string(), json!(1));
        let mut second = Map::new();
        second.insert("a".to_string(), json!(1));
        second.insert("b".to_string(), json!(2));

        assert_eq!(
            cache_key("p", Some(&Value::Object(first))),
            cache_key("p", Some(&Value::Object(second)))
        );
    }

    #[test]
    fn key_is_prefix_and_base64_of_sorted_json() {
        let key = cache_key("contacts", Some(&json!({"b": true, "a": 1})));
        let expected = STANDARD.encode(r#"{"a":1,"b":true}"#);
        assert_eq!(key, format!("contacts:{expected}"));
    }

    #[test]
    fn different_values_give_different_keys() {
        assert_ne!(
            cache_key("p", Some(&json!({"a": 1}))),
            cache_key("p", Some(&json!({"a": 2})))
        );
    }

    #[test]
    fn empty_object_is_not_the_same_as_no_params() {
        assert_ne!(cache_key("p", Some(&json!({}))), "p");
    }

    #[test]
    fn nested_objects_are_not_normalized() {
        let mut inner_ab = Map::new();
        inner_ab.insert("a".to_string(), json!(1));
        inner_ab.insert("b".to_string(), json!(2));
        let mut inner_ba = Map::new();
        inner_ba.insert("b".to_string(), json!(2));
        inner_ba.insert("a".to_string(), json!(1));

        assert_ne!(
            cache_key("p", Some(&json!({"filter": Value::Object(inner_ab)}))),
            cache_key("p", Some(&json!({"filter": Value::Object(inner_ba)})))
        );
    }

    #[test]
    fn typed_params_match_value_params() {
        #[derive(serde::Serialize)]
        struct Query {
            owner: &'static str,
            active: bool,
        }
        assert_eq!(
            cache_key_for("deals", &Query { owner: "ada", active: true }),
            cache_key("deals", Some(&json!({"active": true, "owner": "ada"})))
        );
    }
}
