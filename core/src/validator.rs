//! Validation predicates attached to parameters.
//!
//! A [`Validator`] sees the final merged value of a parameter. Any
//! `Fn(&Value) -> bool` closure is a validator; the built-ins cover the
//! common cases.
//!
//! ```
//! use appconfig_core::{IntRange, Matches, OneOf, Validator, Value};
//!
//! assert!(IntRange::new(100, 1000).validate(&Value::Int(500)));
//! assert!(!IntRange::new(100, 1000).validate(&Value::Int(50)));
//! assert!(OneOf::new(["json", "yaml"]).validate(&Value::from("yaml")));
//! assert!(Matches::new(r"^:\d+$").unwrap().validate(&Value::from(":8080")));
//!
//! let even = |v: &Value| v.as_int().is_some_and(|i| i % 2 == 0);
//! assert!(even.validate(&Value::Int(4)));
//! ```

use regex::Regex;

use crate::Value;

/// Predicate over a resolved value.
///
/// A validator given a value of a kind it does not handle returns `false`.
pub trait Validator: Send + Sync {
    fn validate(&self, value: &Value) -> bool;
}

impl<F> Validator for F
where
    F: Fn(&Value) -> bool + Send + Sync,
{
    fn validate(&self, value: &Value) -> bool {
        self(value)
    }
}

/// Inclusive integer range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntRange {
    pub min: i64,
    pub max: i64,
}

impl IntRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }
}

impl Validator for IntRange {
    fn validate(&self, value: &Value) -> bool {
        value
            .as_int()
            .is_some_and(|i| self.min <= i && i <= self.max)
    }
}

/// String restricted to a fixed set of choices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneOf {
    choices: Vec<String>,
}

impl OneOf {
    pub fn new<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            choices: choices.into_iter().map(Into::into).collect(),
        }
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

impl Validator for OneOf {
    fn validate(&self, value: &Value) -> bool {
        value
            .as_str()
            .is_some_and(|s| self.choices.iter().any(|c| c == s))
    }
}

/// String that is not empty after trimming.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmpty;

impl Validator for NonEmpty {
    fn validate(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| !s.trim().is_empty())
    }
}

/// String matching a regular expression.
#[derive(Debug, Clone)]
pub struct Matches {
    pattern: Regex,
}

impl Matches {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns the [`regex::Error`] if the pattern does not compile.
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl Validator for Matches {
    fn validate(&self, value: &Value) -> bool {
        value.as_str().is_some_and(|s| self.pattern.is_match(s))
    }
}
