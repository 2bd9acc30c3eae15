// Validation Module - field-level input validation
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Type alias for validation results
pub type ValidationResult<T> = Result<T, ValidationError>;

static CODE_PATTERN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").ok());

/// Validation error with detailed field-level errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Create with a single field error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { errors: vec![FieldError::new(field, message)] }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get errors for a specific field
    pub fn field_errors(&self, field: &str) -> Vec<&FieldError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.as_slice() {
            [] => write!(f, "Validation error with no specific field errors"),
            [single] => write!(f, "{}: {}", single.field, single.message),
            many => {
                write!(f, "Validation failed with {} errors: ", many.len())?;
                for (i, error) in many.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}: {}", error.field, error.message)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Individual field error
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    /// Create a new field error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// Accumulating validator for request payloads.
///
/// ```rust
/// use integrahub_common::validation::Validator;
///
/// let result = Validator::new()
///     .required("name", "Factus")
///     .code("code", "factus_001")
///     .non_zero("integration_type_id", 7)
///     .finish();
/// assert!(result.is_ok());
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a non-blank string.
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        }
        self
    }

    /// Require a lowercase ascii identifier (`[a-z0-9][a-z0-9_-]*`).
    pub fn code(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        } else if !is_valid_code(value) {
            self.errors.push(FieldError::new(
                field,
                "must be lowercase ascii letters, digits, '_' or '-'",
            ));
        }
        self
    }

    /// Require a non-zero numeric identifier.
    pub fn non_zero(mut self, field: &str, value: u64) -> Self {
        if value == 0 {
            self.errors.push(FieldError::new(field, "must be greater than zero"));
        }
        self
    }

    /// Reject strings longer than `max` characters.
    pub fn max_length(mut self, field: &str, value: &str, max: usize) -> Self {
        if value.chars().count() > max {
            self.errors.push(FieldError::new(field, format!("must be at most {max} characters")));
        }
        self
    }

    /// Record an arbitrary failed check.
    pub fn check(mut self, condition: bool, field: &str, message: &str) -> Self {
        if !condition {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    pub fn finish(self) -> ValidationResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { errors: self.errors })
        }
    }
}

/// Whether `value` is a lowercase ascii identifier.
pub fn is_valid_code(value: &str) -> bool {
    CODE_PATTERN.as_ref().is_some_and(|re| re.is_match(value))
}
