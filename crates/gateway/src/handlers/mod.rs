//! API handlers module

pub mod account;
pub mod analytics;
pub mod health;
pub mod records;
pub mod reports;

use coe_common::errors::{AppError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a JSON body so malformed input surfaces as a 400 validation error
pub(crate) fn decode<T: DeserializeOwned>(body: Value) -> Result<T> {
    serde_json::from_value(body).map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: None,
    })
}
