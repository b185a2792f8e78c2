//! Structural validation of tool arguments against a tool's declared input schema
//!
//! Covers the JSON-Schema subset tool authors actually use: `type`, `required`,
//! `properties`, `items`, `enum`, `additionalProperties: false` and the OpenAPI-style
//! `nullable: true` emitted for optional fields. Unknown keywords are ignored.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct SchemaViolation {
    pub path: String,
    pub message: String,
}

pub fn validate(schema: &Value, instance: &Value) -> Result<(), SchemaViolation> {
    validate_at(schema, instance, "arguments")
}

fn validate_at(schema: &Value, instance: &Value, path: &str) -> Result<(), SchemaViolation> {
    let Some(schema) = schema.as_object() else {
        return Ok(());
    };

    if instance.is_null() && schema.get("nullable") == Some(&Value::Bool(true)) {
        return Ok(());
    }

    if let Some(expected) = schema.get("type") {
        let allowed: Vec<&str> = match expected {
            Value::String(single) => vec![single.as_str()],
            Value::Array(many) => many.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        };
        if !allowed.is_empty() && !allowed.iter().any(|kind| matches_type(kind, instance)) {
            return Err(violation(
                path,
                format!("expected {}, got {}", allowed.join(" or "), type_name(instance)),
            ));
        }
    }

    if let Some(options) = schema.get("enum").and_then(Value::as_array) {
        if !options.contains(instance) {
            return Err(violation(path, "value is not one of the allowed options"));
        }
    }

    if let Some(object) = instance.as_object() {
        if let Some(required) = schema.get("required").and_then(Value::as_array) {
            for field in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(field) {
                    return Err(violation(
                        path,
                        format!("missing required field '{field}'"),
                    ));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let closed = schema.get("additionalProperties") == Some(&Value::Bool(false));

        for (key, value) in object {
            match properties.and_then(|properties| properties.get(key)) {
                Some(property) => validate_at(property, value, &format!("{path}.{key}"))?,
                None if closed => {
                    return Err(violation(path, format!("unexpected field '{key}'")));
                }
                None => {}
            }
        }
    }

    if let (Some(items), Some(elements)) = (schema.get("items"), instance.as_array()) {
        for (position, element) in elements.iter().enumerate() {
            validate_at(items, element, &format!("{path}[{position}]"))?;
        }
    }

    Ok(())
}

fn matches_type(kind: &str, instance: &Value) -> bool {
    match kind {
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "boolean" => instance.is_boolean(),
        "null" => instance.is_null(),
        "number" => instance.is_number(),
        // Tools decode integers into i64; anything that would not fit is refused here.
        "integer" => instance.is_i64(),
        _ => true,
    }
}

fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn violation(path: &str, message: impl Into<String>) -> SchemaViolation {
    SchemaViolation {
        path: path.to_string(),
        message: message.into(),
    }
}
