//! Schema validation.
//!
//! Checks the structural invariants of a [`Schema`] before any source is
//! read: parameter names must be usable as flags, defaults must match their
//! declared type, control types may appear at most once, and no two
//! parameters may share an environment variable.
//!
//! # Examples
//!
//! ```
//! use appconfig_core::*;
//!
//! let schema = Schema::new().param("port", ParamDescriptor::string().with_default(":8080"));
//! assert!(validate_schema(&schema, None).is_empty());
//!
//! // Invalid: an int parameter with a string default
//! let bad = Schema::new().param("timeout", ParamDescriptor::int().with_default("fast"));
//! assert!(!validate_schema(&bad, None).is_empty());
//! ```

use std::collections::HashMap;

use crate::{ParamType, Schema, SchemaError, env_var_name};

const CONTROL_TYPES: [ParamType; 4] = [
    ParamType::ConfigFilePath,
    ParamType::ConfigFromStdin,
    ParamType::ConfigRootNode,
    ParamType::ReadEnvFlag,
];

/// Validates a schema.
///
/// `env_prefix` is the prefix the resolver applies to environment variable
/// names; collisions are checked after applying it. Every problem found is
/// returned.
///
/// # Examples
///
/// ```
/// use appconfig_core::*;
///
/// let schema = Schema::new()
///     .param("a", ParamDescriptor::config_file())
///     .param("b", ParamDescriptor::config_file());
/// let errors = validate_schema(&schema, None);
/// assert!(errors.iter().any(|e| matches!(e, SchemaError::DuplicateControl { .. })));
/// ```
pub fn validate_schema(schema: &Schema, env_prefix: Option<&str>) -> Vec<SchemaError> {
    let mut errors = Vec::new();

    if schema.is_empty() {
        errors.push(SchemaError::EmptySchema);
        return errors;
    }

    let mut env_names: HashMap<String, &str> = HashMap::new();

    for (name, desc) in schema.iter() {
        if !is_valid_name(name) {
            errors.push(SchemaError::InvalidName(name.to_string()));
            continue;
        }

        if let Some(default) = &desc.default {
            if default.kind() != desc.value_kind() {
                errors.push(SchemaError::DefaultTypeMismatch {
                    name: name.to_string(),
                    expected: desc.value_kind(),
                    actual: default.kind(),
                });
            }
        }

        if let Some(prefix) = &desc.prefix_override {
            if prefix.is_empty() || !prefix.chars().all(|c| c == '-') {
                errors.push(SchemaError::InvalidPrefix {
                    name: name.to_string(),
                    prefix: prefix.clone(),
                });
            }
        }

        let var = env_var_name(env_prefix, name);
        if let Some(first) = env_names.insert(var.clone(), name) {
            errors.push(SchemaError::EnvNameCollision {
                var,
                first: first.to_string(),
                second: name.to_string(),
            });
        }
    }

    for control in CONTROL_TYPES {
        let mut declared = schema
            .iter()
            .filter(|(_, desc)| desc.param_type == control)
            .map(|(name, _)| name);
        if let (Some(first), Some(second)) = (declared.next(), declared.next()) {
            errors.push(SchemaError::DuplicateControl {
                param_type: control,
                first: first.to_string(),
                second: second.to_string(),
            });
        }
    }

    errors
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.contains('=')
        && !name.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ParamDescriptor, ValueKind};

    #[test]
    fn test_validate_schema_rejects_empty_schema() {
        assert_eq!(
            validate_schema(&Schema::new(), None),
            vec![SchemaError::EmptySchema]
        );
    }

    #[test]
    fn test_validate_schema_rejects_bad_names() {
        for bad in ["", "-port", "a=b", "two words"] {
            let schema = Schema::new().param(bad, ParamDescriptor::string());
            assert_eq!(
                validate_schema(&schema, None),
                vec![SchemaError::InvalidName(bad.to_string())],
                "name {bad:?}"
            );
        }
    }

    #[test]
    fn test_validate_schema_rejects_default_mismatch() {
        let schema = Schema::new().param("debug", ParamDescriptor::usage_flag().with_default(1));
        assert_eq!(
            validate_schema(&schema, None),
            vec![SchemaError::DefaultTypeMismatch {
                name: "debug".to_string(),
                expected: ValueKind::Bool,
                actual: ValueKind::Int,
            }]
        );
    }

    #[test]
    fn test_validate_schema_rejects_bad_prefix() {
        let schema = Schema::new().param("debug", ParamDescriptor::bool().with_prefix("/"));
        assert!(matches!(
            &validate_schema(&schema, None)[..],
            [SchemaError::InvalidPrefix { .. }]
        ));
    }

    #[test]
    fn test_validate_schema_rejects_env_collision() {
        let schema = Schema::new()
            .param("statsd-addr", ParamDescriptor::string())
            .param("statsd_addr", ParamDescriptor::string());
        assert_eq!(
            validate_schema(&schema, Some("app")),
            vec![SchemaError::EnvNameCollision {
                var: "APP_STATSD_ADDR".to_string(),
                first: "statsd-addr".to_string(),
                second: "statsd_addr".to_string(),
            }]
        );
    }

    #[test]
    fn test_validate_schema_allows_one_of_each_control() {
        let schema = Schema::new()
            .param("config", ParamDescriptor::config_file().with_default("config.json"))
            .param("config-stdin", ParamDescriptor::config_stdin().with_default(true))
            .param("config-node", ParamDescriptor::config_root_node())
            .param("config-env", ParamDescriptor::read_env())
            .param("help", ParamDescriptor::usage_flag().with_prefix("--"));
        assert!(validate_schema(&schema, None).is_empty());
    }
}
