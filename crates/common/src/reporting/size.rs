//! Serialized-size estimation
//!
//! Sizes are tracked as exact byte counts and only converted to kilobytes,
//! rounded to two decimals, when rendered.

use crate::db::Record;

/// UTF-8 byte length of the record's JSON document
pub fn estimate_size(record: &Record) -> u64 {
    serde_json::to_vec(&record.to_document())
        .map(|bytes| bytes.len() as u64)
        .unwrap_or(0)
}

/// Bytes to kilobytes, rounded to two decimals
pub fn to_kilobytes(bytes: u64) -> f64 {
    round2(bytes as f64 / 1024.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average in kilobytes; zero when there is nothing to average
pub fn average_kilobytes(total_bytes: u64, count: u64) -> f64 {
    if count == 0 {
        0.0
    } else {
        round2(total_bytes as f64 / count as f64 / 1024.0)
    }
}
