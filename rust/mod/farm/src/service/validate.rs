//! Field checks shared by the resource services. Each returns
//! `FarmError::Validation` naming the offending field.

use crate::service::FarmError;

pub fn required_text(field: &str, value: &str, max: usize) -> Result<(), FarmError> {
    if value.trim().is_empty() {
        return Err(FarmError::Validation(format!("{} must not be empty", field)));
    }
    max_len(field, value, max)
}

pub fn optional_text(field: &str, value: &Option<String>, max: usize) -> Result<(), FarmError> {
    match value {
        Some(v) => max_len(field, v, max),
        None => Ok(()),
    }
}

fn max_len(field: &str, value: &str, max: usize) -> Result<(), FarmError> {
    if value.chars().count() > max {
        return Err(FarmError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn positive(field: &str, value: f64) -> Result<(), FarmError> {
    if value.is_nan() || value <= 0.0 {
        return Err(FarmError::Validation(format!("{} must be greater than 0", field)));
    }
    Ok(())
}

pub fn positive_count(field: &str, value: i64) -> Result<(), FarmError> {
    if value <= 0 {
        return Err(FarmError::Validation(format!("{} must be greater than 0", field)));
    }
    Ok(())
}

pub fn non_negative(field: &str, value: f64) -> Result<(), FarmError> {
    if value.is_nan() || value < 0.0 {
        return Err(FarmError::Validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

pub fn in_range(field: &str, value: f64, min: f64, max: f64) -> Result<(), FarmError> {
    if !(min..=max).contains(&value) {
        return Err(FarmError::Validation(format!(
            "{} must be between {} and {}",
            field, min, max
        )));
    }
    Ok(())
}

/// Idempotency keys must be UUIDs (any textual form `uuid` accepts).
pub fn event_key(value: &str) -> Result<(), FarmError> {
    uuid::Uuid::parse_str(value)
        .map(|_| ())
        .map_err(|_| FarmError::Validation(format!("event_id '{}' is not a valid UUID", value)))
}
