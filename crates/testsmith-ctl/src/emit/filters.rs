//! Custom Tera filters for emitted Python.

use std::collections::HashMap;

use heck::ToPascalCase;
use tera::{Result, Value};

pub(crate) fn pascal_case(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    let s = value
        .as_str()
        .ok_or_else(|| tera::Error::msg("pascal_case filter expects a string"))?;
    Ok(Value::String(s.to_pascal_case()))
}

/// Render any JSON value as a Python literal (`None`, `True`, dicts, lists).
pub(crate) fn python_literal(value: &Value, _args: &HashMap<String, Value>) -> Result<Value> {
    Ok(Value::String(to_python(value)))
}

fn to_python(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        // JSON string escapes are valid Python string escapes.
        Value::String(s) => Value::String(s.clone()).to_string(),
        Value::Array(items) => format!(
            "[{}]",
            items.iter().map(to_python).collect::<Vec<_>>().join(", ")
        ),
        Value::Object(map) => format!(
            "{{{}}}",
            map.iter()
                .map(|(k, v)| format!("{}: {}", Value::String(k.clone()), to_python(v)))
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn apply(filter: fn(&Value, &HashMap<String, Value>) -> Result<Value>, input: Value) -> String {
        let args = HashMap::new();
        filter(&input, &args).unwrap().as_str().unwrap().to_string()
    }

    #[test]
    fn test_pascal_case() {
        assert_eq!(apply(pascal_case, json!("audit_logs")), "AuditLogs");
    }

    #[test]
    fn test_python_literal() {
        assert_eq!(apply(python_literal, json!(null)), "None");
        assert_eq!(apply(python_literal, json!([true, false, 3])), "[True, False, 3]");
        assert_eq!(
            apply(python_literal, json!({"name": "a\"b", "tags": [null]})),
            r#"{"name": "a\"b", "tags": [None]}"#
        );
    }

    #[test]
    fn test_filter_rejects_non_string() {
        let args = HashMap::new();
        assert!(pascal_case(&json!(42), &args).is_err());
    }
}
