//! Field validation for records.
//!
//! A [`Validator`] collects human-readable messages per field. It knows
//! nothing about storage: record types embed one (usually with
//! `#[serde(skip)]`) and run their checks before saving.
//!
//! ```rust
//! use shelf_validate::Validator;
//!
//! let mut v = Validator::new();
//! v.validate_presence("name", "");
//! v.validate_length("password", "abc", Some(6), Some(18));
//! v.validate_range("age", 230, Some(0), Some(150));
//! v.validate_format("ip", "10.0.0.1", r"\A(\d{1,3}\.){3}\d{1,3}\z");
//!
//! assert!(!v.is_valid());
//! assert_eq!(v.errors()["name"], vec!["can't be blank"]);
//! assert_eq!(v.errors()["password"], vec!["minimum length is 6"]);
//! assert_eq!(v.errors()["age"], vec!["maximum value is 150"]);
//! assert!(!v.errors().contains_key("ip"));
//! ```

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Messages by field name.
pub type Errors = BTreeMap<String, Vec<String>>;

/// The failures collected by a [`Validator`], as an error value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("validation failed: {}", summary(.0))]
pub struct ValidationErrors(pub Errors);

impl ValidationErrors {
    /// Messages by field name.
    pub fn fields(&self) -> &Errors {
        &self.0
    }
}

fn summary(errors: &Errors) -> String {
    errors
        .iter()
        .map(|(field, messages)| format!("{field} {}", messages.join(", ")))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects validation messages by field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    errors: Errors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget every collected message.
    pub fn reset(&mut self) {
        self.errors.clear();
    }

    /// Record `message` against `field`.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// True when no messages have been collected.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &Errors {
        &self.errors
    }

    /// Replace the collected messages.
    pub fn set_errors(&mut self, errors: Errors) {
        self.errors = errors;
    }

    /// `value` must not be empty.
    pub fn validate_presence(&mut self, field: &str, value: &str) {
        if value.is_empty() {
            self.add_error(field, "can't be blank");
        }
    }

    /// `value` must hold between `min` and `max` characters, inclusive.
    /// A `None` bound is not checked.
    pub fn validate_length(
        &mut self,
        field: &str,
        value: &str,
        min: Option<usize>,
        max: Option<usize>,
    ) {
        let len = value.chars().count();
        if let Some(min) = min.filter(|&min| len < min) {
            self.add_error(field, format!("minimum length is {min}"));
        }
        if let Some(max) = max.filter(|&max| len > max) {
            self.add_error(field, format!("maximum length is {max}"));
        }
    }

    /// `value` must lie between `min` and `max`, inclusive. Works for any
    /// ordered number type. A `None` bound is not checked.
    pub fn validate_range<T>(&mut self, field: &str, value: T, min: Option<T>, max: Option<T>)
    where
        T: PartialOrd + Display,
    {
        if let Some(min) = min.filter(|min| value < *min) {
            self.add_error(field, format!("minimum value is {min}"));
        }
        if let Some(max) = max.filter(|max| value > *max) {
            self.add_error(field, format!("maximum value is {max}"));
        }
    }

    /// `value` must match the regular expression `pattern`.
    ///
    /// A pattern that does not compile fails every value.
    pub fn validate_format(&mut self, field: &str, value: &str, pattern: &str) {
        let matched = Regex::new(pattern).is_ok_and(|re| re.is_match(value));
        if !matched {
            self.add_error(field, "invalid format");
        }
    }

    /// `Ok(())` when valid, otherwise the collected messages.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(ValidationErrors(self.errors))
        }
    }

    /// Like [`into_result`](Validator::into_result), keeping the validator.
    pub fn check(&self) -> Result<(), ValidationErrors> {
        self.clone().into_result()
    }
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&summary(&self.errors))
    }
}
