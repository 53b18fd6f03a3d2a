//! Response decoding with required-field validation
//!
//! ClickUp wraps collections in an object keyed by the plural entity name
//! (`{"tasks": [...]}`), returns single entities bare, and sends several
//! counters as either numbers or strings. Every decode ends with the entity's
//! [`Entity::validate`] so callers never see a half-formed value.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::{ApiError, ApiResult};
use crate::{Entity, Task};

/// Decode a bare entity body
pub fn decode<T: Entity>(body: &str) -> ApiResult<T> {
    let entity: T = serde_json::from_str(body)
        .map_err(|e| ApiError::Decode(format!("invalid {} payload: {e}", T::KIND)))?;
    entity
        .validate()
        .map_err(|e| ApiError::Decode(format!("invalid {}: {e}", T::KIND)))?;
    Ok(entity)
}

/// Decode an entity nested under `key` (`{"user": {...}}`)
pub fn decode_field<T: Entity>(body: &str, key: &str) -> ApiResult<T> {
    let field = take_field(parse_object(body)?, key)?;
    from_value(field, None)
}

/// Decode a collection nested under `key` (`{"spaces": [...]}`)
pub fn decode_list<T: Entity>(body: &str, key: &str) -> ApiResult<Vec<T>> {
    decode_array(take_field(parse_object(body)?, key)?, key)
}

/// One page of a task listing
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPage {
    /// Tasks on this page
    pub tasks: Vec<Task>,
    /// Whether the service marked this page as the last one
    pub last_page: bool,
}

/// Decode a task page (`{"tasks": [...], "last_page": bool}`)
pub fn decode_task_page(body: &str) -> ApiResult<TaskPage> {
    let mut object = parse_object(body)?;
    let last_page = object
        .get("last_page")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let tasks = object
        .remove("tasks")
        .ok_or_else(|| ApiError::Decode("missing `tasks` field".to_string()))?;
    Ok(TaskPage {
        tasks: decode_array(tasks, "tasks")?,
        last_page,
    })
}

/// Human-readable error text from an error body.
///
/// ClickUp errors look like `{"err": "...", "ECODE": "..."}`.
pub fn error_message(body: &str) -> String {
    if let Ok(Value::Object(object)) = serde_json::from_str::<Value>(body) {
        for key in ["err", "error", "message"] {
            if let Some(text) = object.get(key).and_then(Value::as_str) {
                return text.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "no error details".to_string();
    }
    let mut text: String = trimmed.chars().take(200).collect();
    if trimmed.chars().count() > 200 {
        text.push_str("...");
    }
    text
}

/// Deserialize a flag that may be sent as `null`
pub fn null_as_false<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or_default())
}

/// Deserialize an optional count sent as number, numeric string or null
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Count::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid count: {s}"))),
    }
}

fn parse_object(body: &str) -> ApiResult<serde_json::Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(ApiError::Decode(format!(
            "expected JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(ApiError::Decode(format!("malformed JSON: {e}"))),
    }
}

fn take_field(mut object: serde_json::Map<String, Value>, key: &str) -> ApiResult<Value> {
    object
        .remove(key)
        .ok_or_else(|| ApiError::Decode(format!("missing `{key}` field")))
}

fn decode_array<T: Entity>(value: Value, key: &str) -> ApiResult<Vec<T>> {
    let Value::Array(items) = value else {
        return Err(ApiError::Decode(format!(
            "`{key}` is {}, expected array",
            json_kind(&value)
        )));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| from_value(item, Some(index)))
        .collect()
}

fn from_value<T: Entity>(value: Value, index: Option<usize>) -> ApiResult<T> {
    let at = index.map(|i| format!(" at index {i}")).unwrap_or_default();
    let entity: T = serde_json::from_value(value)
        .map_err(|e| ApiError::Decode(format!("invalid {}{at}: {e}", T::KIND)))?;
    entity
        .validate()
        .map_err(|e| ApiError::Decode(format!("invalid {}{at}: {e}", T::KIND)))?;
    Ok(entity)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
