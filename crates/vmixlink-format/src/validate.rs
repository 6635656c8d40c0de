//! Validation of untyped JSON into a profile payload

use serde_json::Value;
use vmixlink_store::{Items, Payload, Scalar};

use crate::error::{FormatError, Result};

/// Accept a mapping or a list of mappings whose values are all scalars
pub fn payload_from_json(value: &Value) -> Result<Payload> {
    match value {
        Value::Object(_) => Ok(vec![items_from_json(value)?]),
        Value::Array(list) => list
            .iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(_) => items_from_json(item),
                _ => Err(FormatError::validation(format!(
                    "Array item at index {index} must be an object"
                ))),
            })
            .collect(),
        _ => Err(FormatError::validation("Data must be an object or array")),
    }
}

/// Accept a single mapping of scalars
pub fn items_from_json(value: &Value) -> Result<Items> {
    let Value::Object(object) = value else {
        return Err(FormatError::validation("Data must be an object"));
    };

    object
        .iter()
        .map(|(key, value)| {
            Scalar::from_json(key, value)
                .map(|scalar| (key.clone(), scalar))
                .map_err(|_| {
                    FormatError::validation(format!(
                        "Object value for key '{key}' must be a string, number, boolean, or null"
                    ))
                })
        })
        .collect()
}
