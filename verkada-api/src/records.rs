//! Decoding helpers shared by the collection facades.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::VerkadaError;
use crate::pagination::AggregatedResult;

/// Accept a string or a number and keep it as text.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text)),
        Some(Value::Number(number)) => Ok(Some(number.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, found {other}"
        ))),
    }
}

/// Convert aggregated JSON records into typed values.
pub(crate) fn into_typed<T: DeserializeOwned>(
    mut result: AggregatedResult,
    field: &str,
) -> Result<Vec<T>, VerkadaError> {
    result
        .take(field)
        .into_iter()
        .map(|record| serde_json::from_value(record).map_err(VerkadaError::from))
        .collect()
}
