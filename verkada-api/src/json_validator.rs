//! Response body guard.
//!
//! Every body we deserialize is first parsed into a `serde_json::Value` and its
//! nesting depth checked, so a hostile or broken upstream cannot hand us a
//! structure deep enough to blow the stack in later processing.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::VerkadaError;

/// Maximum allowed JSON nesting depth. Verkada responses use fewer than 10 levels.
pub const MAX_JSON_DEPTH: usize = 32;

/// Nesting depth of a JSON value; scalars have depth 0.
///
/// Iterative so that measuring a pathological value cannot itself overflow.
#[must_use]
pub fn json_depth(value: &Value) -> usize {
    let mut max_depth = 0;
    let mut stack: Vec<(&Value, usize)> = vec![(value, 0)];

    while let Some((current, depth)) = stack.pop() {
        match current {
            Value::Array(items) => {
                let child_depth = depth.saturating_add(1);
                max_depth = max_depth.max(child_depth);
                stack.extend(items.iter().map(|item| (item, child_depth)));
            }
            Value::Object(map) => {
                let child_depth = depth.saturating_add(1);
                max_depth = max_depth.max(child_depth);
                stack.extend(map.values().map(|item| (item, child_depth)));
            }
            _ => {}
        }
    }

    max_depth
}

/// Parse a response body into a `Value`, rejecting anything nested deeper than `max_depth`.
///
/// # Errors
///
/// Returns `Serialization` for malformed JSON and `InvalidResponse` when the
/// depth limit is exceeded.
pub fn parse_json_body(body: &str, max_depth: usize) -> Result<Value, VerkadaError> {
    let value: Value = serde_json::from_str(body)?;
    let depth = json_depth(&value);
    if depth > max_depth {
        return Err(VerkadaError::InvalidResponse(format!(
            "JSON nesting depth {depth} exceeds maximum of {max_depth}"
        )));
    }
    Ok(value)
}

/// Depth-checked parse straight into a typed response.
///
/// # Errors
///
/// See [`parse_json_body`]; also fails if the value does not match `T`.
pub fn parse_typed_body<T: DeserializeOwned>(body: &str) -> Result<T, VerkadaError> {
    let value = parse_json_body(body, MAX_JSON_DEPTH)?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn nested(levels: usize) -> String {
        let mut body = String::new();
        for _ in 0..levels {
            body.push_str("{\"a\":");
        }
        body.push('1');
        for _ in 0..levels {
            body.push('}');
        }
        body
    }

    #[test]
    fn test_depth_of_scalars_and_containers() {
        assert_eq!(json_depth(&json!(1)), 0);
        assert_eq!(json_depth(&json!([])), 1);
        assert_eq!(json_depth(&json!({"audit_logs": [{"event_name": "x"}]})), 3);
    }

    #[test]
    fn test_typical_page_accepted() {
        let body = r#"{"audit_logs": [{"event_name": "User Login", "details": {"ip": "1.2.3.4"}}], "next_page_token": null}"#;
        let value = parse_json_body(body, MAX_JSON_DEPTH).unwrap();
        assert!(value.get("audit_logs").is_some());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let body = nested(MAX_JSON_DEPTH + 1);
        let err = parse_json_body(&body, MAX_JSON_DEPTH).unwrap_err();
        assert!(matches!(err, VerkadaError::InvalidResponse(_)));

        assert!(parse_json_body(&nested(MAX_JSON_DEPTH), MAX_JSON_DEPTH).is_ok());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = parse_json_body("{not json", MAX_JSON_DEPTH).unwrap_err();
        assert!(matches!(err, VerkadaError::Serialization(_)));
    }
}
