//! Validation Support
//!
//! View models implement [`Validatable`] to add their own checks. Model
//! binding runs the hook for every posted view model and records failures in
//! a [`ModelState`], keyed the same way the grid posts its fields
//! (`models[0].name` for batch edits, `name` for single-item edits).
//!
//! # Example
//!
//! ```rust,ignore
//! use gridcrate::validation::{Validatable, ValidationErrors, validators};
//!
//! impl Validatable for ProductViewModel {
//!     fn validate(&self) -> Result<(), ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         if let Err(e) = validators::validate_length("name", &self.name, Some(1), Some(100)) {
//!             errors.add(e);
//!         }
//!         errors.result()
//!     }
//! }
//! ```

use serde::{Serialize, Serializer, ser::SerializeMap};
use std::fmt;

/// Validation error with field name and message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// The field that failed validation
    pub field: String,
    /// Human-readable error message
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new empty validation errors collection
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a validation error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Check if there are any errors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get all errors
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Convert to Result
    ///
    /// # Errors
    /// Returns `self` when at least one error was added.
    pub fn result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation failed with {} error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Trait for view models that can be validated
///
/// The default implementation accepts everything, so a view model without
/// rules only needs an empty `impl Validatable for MyViewModel {}`.
pub trait Validatable {
    /// Validate the instance
    ///
    /// # Errors
    /// Returns every rule the instance breaks.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}

/// Validation state of one request, keyed by posted field name.
///
/// Serializes to the grid's error format:
/// `{ "models[0].name": { "errors": ["Name is required"] } }`.
/// Keys keep the order they were first recorded in, which is posting order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelState {
    entries: Vec<(String, Vec<String>)>,
}

impl ModelState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when no errors have been recorded.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((key, vec![message])),
        }
    }

    /// Record every error of `errors`, prefixing field names with `prefix`.
    pub fn merge(&mut self, prefix: &str, errors: &ValidationErrors) {
        for error in errors.errors() {
            let key = if prefix.is_empty() {
                error.field.clone()
            } else if error.field.is_empty() {
                prefix.to_string()
            } else {
                format!("{prefix}.{}", error.field)
            };
            self.add_error(key, error.message.clone());
        }
    }

    #[must_use]
    pub fn errors_for(&self, key: &str) -> &[String] {
        self.entries
            .iter()
            .find(|(existing, _)| existing == key)
            .map_or(&[], |(_, messages)| messages.as_slice())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Serialize)]
struct FieldErrors<'a> {
    errors: &'a [String],
}

impl Serialize for ModelState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, errors) in &self.entries {
            map.serialize_entry(key, &FieldErrors { errors })?;
        }
        map.end()
    }
}

/// Helper validators for common patterns
pub mod validators {
    use super::ValidationError;
    use std::fmt;

    /// Validate string length is within range
    ///
    /// # Errors
    /// Returns a `ValidationError` naming `field` when the length is out of range.
    pub fn validate_length(
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) -> Result<(), ValidationError> {
        let len = value.chars().count();

        if let Some(min_len) = min
            && len < min_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at least {min_len} characters"),
            ));
        }

        if let Some(max_len) = max
            && len > max_len
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at most {max_len} characters"),
            ));
        }

        Ok(())
    }

    /// Validate number is within range
    ///
    /// # Errors
    /// Returns a `ValidationError` naming `field` when the value is out of range.
    pub fn validate_range<T: PartialOrd + fmt::Display>(
        field: &str,
        value: T,
        min: Option<T>,
        max: Option<T>,
    ) -> Result<(), ValidationError> {
        if let Some(min_val) = min
            && value < min_val
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at least {min_val}"),
            ));
        }

        if let Some(max_val) = max
            && value > max_val
        {
            return Err(ValidationError::new(
                field,
                format!("Must be at most {max_val}"),
            ));
        }

        Ok(())
    }
}
