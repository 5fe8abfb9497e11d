//! Decoding of `ConvertTo-Json` output into typed values.
//!
//! PowerShell emits a bare object when a pipeline yields exactly one item
//! and an array otherwise. Both shapes decode to the same `Vec<T>`.

use crate::{ScriptOpsError, ScriptOpsResult};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a payload into a sequence. Empty output is an empty sequence.
pub fn decode_list<T: DeserializeOwned>(raw: &str) -> ScriptOpsResult<Vec<T>> {
    let Some(value) = parse_payload(raw)? else {
        return Ok(Vec::new());
    };

    let items = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };

    items
        .into_iter()
        .map(|item| convert(item, raw))
        .collect()
}

/// Decode a payload expected to hold at most one value.
pub fn decode_optional<T: DeserializeOwned>(raw: &str) -> ScriptOpsResult<Option<T>> {
    let Some(value) = parse_payload(raw)? else {
        return Ok(None);
    };

    match value {
        Value::Null => Ok(None),
        Value::Array(mut items) => match items.len() {
            0 => Ok(None),
            1 => convert(items.remove(0), raw).map(Some),
            count => Err(ScriptOpsError::Decode {
                message: format!("expected at most one value, got {count}"),
                raw: raw.to_string(),
            }),
        },
        single => convert(single, raw).map(Some),
    }
}

fn parse_payload(raw: &str) -> ScriptOpsResult<Option<Value>> {
    let trimmed = raw.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(trimmed)
        .map(Some)
        .map_err(|err| ScriptOpsError::Decode {
            message: format!("malformed JSON: {err}"),
            raw: raw.to_string(),
        })
}

fn convert<T: DeserializeOwned>(value: Value, raw: &str) -> ScriptOpsResult<T> {
    serde_json::from_value(value).map_err(|err| ScriptOpsError::Decode {
        message: format!("unexpected shape: {err}"),
        raw: raw.to_string(),
    })
}
