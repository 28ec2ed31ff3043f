//! Error types for parameter resolution.
//!
//! Resolution is all-or-nothing: [`resolve`](crate::resolve) returns either a
//! complete [`ResolvedConfig`](crate::ResolvedConfig) or a [`ResolveErrors`]
//! carrying every problem found.

use std::fmt;

use thiserror::Error;

use crate::{Layer, Value, ValueKind};

/// Structural problems in a [`Schema`](crate::Schema).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The schema declares no parameters.
    #[error("schema declares no parameters")]
    EmptySchema,
    /// Name is empty, contains whitespace or `=`, or starts with `-`.
    #[error("invalid parameter name: {0:?}")]
    InvalidName(String),
    /// Default value kind differs from the declared type.
    #[error("parameter `{name}`: default is {actual} but type expects {expected}")]
    DefaultTypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },
    /// Two parameters share a control type.
    #[error("parameters `{first}` and `{second}` both declare type {param_type}")]
    DuplicateControl {
        param_type: crate::ParamType,
        first: String,
        second: String,
    },
    /// Prefix override is empty or contains something other than `-`.
    #[error("parameter `{name}`: invalid flag prefix {prefix:?}")]
    InvalidPrefix { name: String, prefix: String },
    /// Two parameters map to the same environment variable.
    #[error("parameters `{first}` and `{second}` both map to environment variable {var}")]
    EnvNameCollision {
        var: String,
        first: String,
        second: String,
    },
}

/// A single resolution failure.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Malformed or contradictory schema.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// A required config file is missing or unreadable, or stdin failed.
    #[error("failed to read config from {origin}: {source}")]
    SourceRead {
        origin: String,
        #[source]
        source: std::io::Error,
    },

    /// The structured config is malformed or lacks the root node.
    #[error("invalid config in {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// A raw value could not be converted to the declared type.
    #[error("parameter `{name}`: cannot convert {raw} from {layer} to {expected}")]
    Coercion {
        name: String,
        raw: String,
        expected: ValueKind,
        layer: Layer,
    },

    /// The validator rejected the final value.
    #[error("parameter `{name}`: value {value} failed validation")]
    Validation { name: String, value: Value },

    /// A required parameter has no value from any source.
    #[error("parameter `{name}` is required but was not set")]
    RequiredMissing { name: String },

    /// Unknown flag or flag missing its value on the command line.
    #[error("command line argument {arg:?}: {reason}")]
    Argument { arg: String, reason: String },
}

impl ResolveError {
    /// Name of the parameter this error concerns, when there is one.
    pub fn parameter(&self) -> Option<&str> {
        match self {
            ResolveError::Coercion { name, .. }
            | ResolveError::Validation { name, .. }
            | ResolveError::RequiredMissing { name } => Some(name.as_str()),
            ResolveError::Schema(SchemaError::DefaultTypeMismatch { name, .. })
            | ResolveError::Schema(SchemaError::InvalidPrefix { name, .. }) => Some(name.as_str()),
            _ => None,
        }
    }
}

/// Every error found by one resolution.
///
/// # Examples
///
/// ```
/// use appconfig_core::{ParamDescriptor, ResolveError, Resolver, Schema, StaticSources};
///
/// let schema = Schema::new().param("port", ParamDescriptor::string().required());
/// let err = Resolver::with_sources(schema, StaticSources::new())
///     .resolve()
///     .unwrap_err();
///
/// assert_eq!(err.len(), 1);
/// assert!(matches!(err.errors()[0], ResolveError::RequiredMissing { .. }));
/// assert!(err.to_string().contains("port"));
/// ```
#[derive(Debug)]
pub struct ResolveErrors(Vec<ResolveError>);

impl ResolveErrors {
    pub(crate) fn new(errors: Vec<ResolveError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[ResolveError] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<ResolveError> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResolveError> {
        self.0.iter()
    }

    /// Errors that concern `name`.
    pub fn for_parameter<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a ResolveError> {
        self.0.iter().filter(move |e| e.parameter() == Some(name))
    }
}

impl From<ResolveError> for ResolveErrors {
    fn from(error: ResolveError) -> Self {
        Self(vec![error])
    }
}

impl fmt::Display for ResolveErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            errors => {
                write!(f, "{} configuration errors:", errors.len())?;
                for error in errors {
                    write!(f, "\n  - {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ResolveErrors {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.0.as_slice() {
            [single] => Some(single),
            _ => None,
        }
    }
}

impl<'a> IntoIterator for &'a ResolveErrors {
    type Item = &'a ResolveError;
    type IntoIter = std::slice::Iter<'a, ResolveError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Errors from querying a [`ResolvedConfig`](crate::ResolvedConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// No parameter with this name was declared.
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    /// A typed accessor was used on a parameter of another kind.
    #[error("parameter `{name}` is {actual}, not {expected}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },
}

/// Convenience alias for resolution results.
pub type Result<T> = std::result::Result<T, ResolveErrors>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_error_display_is_unwrapped() {
        let errors = ResolveErrors::from(ResolveError::RequiredMissing {
            name: "port".to_string(),
        });
        assert_eq!(errors.to_string(), "parameter `port` is required but was not set");
    }

    #[test]
    fn test_multiple_errors_are_listed() {
        let errors = ResolveErrors::new(vec![
            ResolveError::RequiredMissing {
                name: "port".to_string(),
            },
            ResolveError::Validation {
                name: "timeout".to_string(),
                value: Value::Int(50),
            },
        ]);
        let text = errors.to_string();
        assert!(text.starts_with("2 configuration errors:"));
        assert!(text.contains("`timeout`: value 50 failed validation"));
        assert_eq!(errors.for_parameter("timeout").count(), 1);
    }

    #[test]
    fn test_coercion_message_names_parameter_and_value() {
        let err = ResolveError::Coercion {
            name: "timeout".to_string(),
            raw: "\"abc\"".to_string(),
            expected: ValueKind::Int,
            layer: Layer::CommandLine,
        };
        assert_eq!(
            err.to_string(),
            "parameter `timeout`: cannot convert \"abc\" from command line to int"
        );
    }
}
