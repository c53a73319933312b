// Utility functions

pub mod json_extractor;
pub mod token_counter;

use crate::types::*;

/// Validates a value against a constraint and returns an error if it fails
pub fn validate<T, F>(
    value: T,
    constraint: F,
    error_message: impl Into<String>,
) -> DashboardResult<T>
where
    F: FnOnce(&T) -> bool,
{
    if constraint(&value) {
        Ok(value)
    } else {
        Err(DashboardError::ValidationError(error_message.into()))
    }
}

/// Validates a range constraint for numeric values
pub fn validate_range<T>(
    value: T,
    min: T,
    max: T,
    param_name: &str,
) -> DashboardResult<T>
where
    T: PartialOrd + Copy + std::fmt::Display,
{
    validate(
        value,
        |&v| v >= min && v <= max,
        format!("{} must be between {} and {}, but got {}", param_name, min, max, value),
    )
}

/// Validates strings against common constraints
pub struct StringValidator;

impl StringValidator {
    /// Validates that a string is not empty or whitespace
    pub fn not_empty(value: impl Into<String>, param_name: &str) -> DashboardResult<String> {
        let value = value.into();
        validate(
            value,
            |s| !s.trim().is_empty(),
            format!("{} cannot be empty", param_name),
        )
    }

    /// Validates that a string has at most `max_length` characters
    pub fn max_length(
        value: impl Into<String>,
        max_length: usize,
        param_name: &str,
    ) -> DashboardResult<String> {
        let value = value.into();
        validate(
            value,
            |s| s.chars().count() <= max_length,
            format!("{} must be at most {} characters", param_name, max_length),
        )
    }
}
