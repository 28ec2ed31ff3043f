//! Schema type definitions for parameter resolution.
//!
//! A [`Schema`] maps parameter names to [`ParamDescriptor`]s. Each descriptor
//! declares a [`ParamType`], an optional default [`Value`], usage text, and
//! the constraints applied once all sources have been merged.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::validator::Validator;

/// Flag prefix used when a descriptor has no override.
pub const DEFAULT_FLAG_PREFIX: &str = "-";

/// Declared type of a parameter.
///
/// Besides the three plain value types, the control types steer the engine
/// itself: where the structured config comes from, which sub-object to read,
/// and whether the environment is consulted.
///
/// # Examples
///
/// ```
/// use appconfig_core::{ParamType, ValueKind};
///
/// assert_eq!(ParamType::ConfigFilePath.value_kind(), ValueKind::String);
/// assert_eq!(ParamType::UsageFlag.value_kind(), ValueKind::Bool);
/// assert!(ParamType::ReadEnvFlag.is_control());
/// assert!(!ParamType::UsageFlag.is_control());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    /// Free-form text.
    String,
    /// Base-10 signed integer.
    Int,
    /// Boolean switch.
    Bool,
    /// Path of the structured config file.
    ConfigFilePath,
    /// Read the structured config from standard input.
    ConfigFromStdin,
    /// Name of the sub-object holding the parameters inside the config.
    ConfigRootNode,
    /// Whether environment variables are consulted.
    ReadEnvFlag,
    /// Caller should print usage and exit.
    UsageFlag,
}

impl ParamType {
    /// Kind of [`Value`] this type resolves to.
    pub fn value_kind(self) -> ValueKind {
        match self {
            ParamType::String | ParamType::ConfigFilePath | ParamType::ConfigRootNode => {
                ValueKind::String
            }
            ParamType::Int => ValueKind::Int,
            ParamType::Bool
            | ParamType::ConfigFromStdin
            | ParamType::ReadEnvFlag
            | ParamType::UsageFlag => ValueKind::Bool,
        }
    }

    /// Returns `true` for types that steer the engine rather than carry
    /// application data.
    pub fn is_control(self) -> bool {
        matches!(
            self,
            ParamType::ConfigFilePath
                | ParamType::ConfigFromStdin
                | ParamType::ConfigRootNode
                | ParamType::ReadEnvFlag
        )
    }

    /// Returns `true` for the types that select the structured config
    /// source. These are resolved before the source is read, so they never
    /// take a value from it.
    pub fn selects_source(self) -> bool {
        matches!(
            self,
            ParamType::ConfigFilePath | ParamType::ConfigFromStdin | ParamType::ConfigRootNode
        )
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::String => "string",
            ParamType::Int => "int",
            ParamType::Bool => "bool",
            ParamType::ConfigFilePath => "config-file",
            ParamType::ConfigFromStdin => "config-stdin",
            ParamType::ConfigRootNode => "config-root-node",
            ParamType::ReadEnvFlag => "read-env",
            ParamType::UsageFlag => "usage",
        };
        f.write_str(name)
    }
}

/// Shape of a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Int,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::String => f.write_str("string"),
            ValueKind::Int => f.write_str("int"),
            ValueKind::Bool => f.write_str("bool"),
        }
    }
}

/// A coerced parameter value.
///
/// Serializes as a bare JSON scalar so a resolved configuration can be fed
/// back in as a config file.
///
/// # Examples
///
/// ```
/// use appconfig_core::{Value, ValueKind};
///
/// let v = Value::from(250);
/// assert_eq!(v.kind(), ValueKind::Int);
/// assert_eq!(v.as_int(), Some(250));
/// assert_eq!(v.as_str(), None);
/// assert_eq!(serde_json::to_string(&Value::from(":8080")).unwrap(), "\":8080\"");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(String),
}

impl Value {
    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

/// Declaration of a single parameter.
///
/// Use the per-type constructors ([`string`](ParamDescriptor::string),
/// [`int`](ParamDescriptor::int), ...) and chain the builder methods.
///
/// # Examples
///
/// ```
/// use appconfig_core::{IntRange, ParamDescriptor, ParamType, Value};
///
/// let timeout = ParamDescriptor::int()
///     .with_default(1000)
///     .with_usage("server timeout in ms")
///     .with_validator(IntRange::new(100, 1000));
///
/// assert_eq!(timeout.param_type, ParamType::Int);
/// assert_eq!(timeout.default, Some(Value::Int(1000)));
/// assert!(timeout.accepts(&Value::Int(500)));
/// assert!(!timeout.accepts(&Value::Int(50)));
/// assert_eq!(timeout.flag_prefix(), "-");
/// ```
#[derive(Clone)]
pub struct ParamDescriptor {
    /// Declared type; decides coercion.
    pub param_type: ParamType,
    /// Value used when no source supplies one.
    pub default: Option<Value>,
    /// Human-readable description, display only.
    pub usage: String,
    /// Absence after merging is an error.
    pub required: bool,
    /// Predicate applied to the final value.
    pub validator: Option<Arc<dyn Validator>>,
    /// Replaces the default `-` flag prefix (e.g. `--`).
    pub prefix_override: Option<String>,
}

impl ParamDescriptor {
    /// Creates a descriptor of the given type with no default.
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            default: None,
            usage: String::new(),
            required: false,
            validator: None,
            prefix_override: None,
        }
    }

    pub fn string() -> Self {
        Self::new(ParamType::String)
    }

    pub fn int() -> Self {
        Self::new(ParamType::Int)
    }

    pub fn bool() -> Self {
        Self::new(ParamType::Bool)
    }

    /// Parameter naming the structured config file.
    pub fn config_file() -> Self {
        Self::new(ParamType::ConfigFilePath)
    }

    /// Boolean switch reading the structured config from stdin.
    pub fn config_stdin() -> Self {
        Self::new(ParamType::ConfigFromStdin)
    }

    /// Parameter naming the root node inside the structured config.
    pub fn config_root_node() -> Self {
        Self::new(ParamType::ConfigRootNode)
    }

    /// Boolean switch enabling environment variables.
    pub fn read_env() -> Self {
        Self::new(ParamType::ReadEnvFlag)
    }

    /// Boolean switch asking the caller to print usage.
    pub fn usage_flag() -> Self {
        Self::new(ParamType::UsageFlag)
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the usage text.
    pub fn with_usage(mut self, usage: &str) -> Self {
        self.usage = usage.to_string();
        self
    }

    /// Marks the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attaches a validation predicate.
    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Overrides the command-line prefix (e.g. `"--"`).
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix_override = Some(prefix.to_string());
        self
    }

    /// Kind of value this parameter resolves to.
    pub fn value_kind(&self) -> ValueKind {
        self.param_type.value_kind()
    }

    /// Prefix the command-line flag is spelled with.
    pub fn flag_prefix(&self) -> &str {
        self.prefix_override
            .as_deref()
            .unwrap_or(DEFAULT_FLAG_PREFIX)
    }

    /// Full command-line spelling of the flag for `name`.
    pub fn flag_for(&self, name: &str) -> String {
        format!("{}{}", self.flag_prefix(), name)
    }

    /// Runs the validator, if any. Parameters without one accept anything.
    pub fn accepts(&self, value: &Value) -> bool {
        self.validator
            .as_ref()
            .is_none_or(|validator| validator.validate(value))
    }
}

impl fmt::Debug for ParamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParamDescriptor")
            .field("param_type", &self.param_type)
            .field("default", &self.default)
            .field("usage", &self.usage)
            .field("required", &self.required)
            .field("validator", &self.validator.is_some())
            .field("prefix_override", &self.prefix_override)
            .finish()
    }
}

/// Complete parameter schema.
///
/// Parameters are kept in name order so resolution, usage output and
/// serialization are deterministic.
///
/// # Examples
///
/// ```
/// use appconfig_core::{ParamDescriptor, ParamType, Schema};
///
/// let schema = Schema::new()
///     .param("port", ParamDescriptor::string().with_default(":8080"))
///     .param("config", ParamDescriptor::config_file().with_default("config.json"));
///
/// assert_eq!(schema.len(), 2);
/// assert_eq!(schema.names(), vec!["config", "port"]);
/// assert_eq!(schema.control(ParamType::ConfigFilePath).map(|(n, _)| n), Some("config"));
/// assert!(schema.control(ParamType::ConfigFromStdin).is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Schema {
    params: BTreeMap<String, ParamDescriptor>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a parameter.
    pub fn param(mut self, name: &str, descriptor: ParamDescriptor) -> Self {
        self.insert(name, descriptor);
        self
    }

    /// Adds (or replaces) a parameter in place.
    pub fn insert(&mut self, name: &str, descriptor: ParamDescriptor) {
        self.params.insert(name.to_string(), descriptor);
    }

    pub fn get(&self, name: &str) -> Option<&ParamDescriptor> {
        self.params.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamDescriptor)> {
        self.params.iter().map(|(name, desc)| (name.as_str(), desc))
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Finds the first parameter declared with the given control type.
    ///
    /// Schema validation rejects more than one parameter per control type,
    /// so in a valid schema this is the only one.
    pub fn control(&self, param_type: ParamType) -> Option<(&str, &ParamDescriptor)> {
        self.iter().find(|(_, desc)| desc.param_type == param_type)
    }
}

impl FromIterator<(String, ParamDescriptor)> for Schema {
    fn from_iter<T: IntoIterator<Item = (String, ParamDescriptor)>>(iter: T) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_kind_mapping() {
        assert_eq!(ParamType::String.value_kind(), ValueKind::String);
        assert_eq!(ParamType::ConfigRootNode.value_kind(), ValueKind::String);
        assert_eq!(ParamType::Int.value_kind(), ValueKind::Int);
        assert_eq!(ParamType::ConfigFromStdin.value_kind(), ValueKind::Bool);
        assert_eq!(ParamType::ReadEnvFlag.value_kind(), ValueKind::Bool);
    }

    #[test]
    fn test_source_selecting_types() {
        assert!(ParamType::ConfigFilePath.selects_source());
        assert!(ParamType::ConfigRootNode.selects_source());
        assert!(!ParamType::ReadEnvFlag.selects_source());
        assert!(ParamType::ReadEnvFlag.is_control());
    }

    #[test]
    fn test_value_serializes_as_scalar() {
        let json = serde_json::to_string(&vec![
            Value::from("a"),
            Value::from(3),
            Value::from(true),
        ])
        .unwrap();
        assert_eq!(json, r#"["a",3,true]"#);

        let back: Vec<Value> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[1], Value::Int(3));
        assert_eq!(back[2], Value::Bool(true));
    }

    #[test]
    fn test_flag_prefix_override() {
        let debug = ParamDescriptor::bool().with_prefix("--");
        assert_eq!(debug.flag_for("debug"), "--debug");
        assert_eq!(ParamDescriptor::bool().flag_for("debug"), "-debug");
    }

    #[test]
    fn test_accepts_without_validator() {
        let port = ParamDescriptor::string();
        assert!(port.accepts(&Value::from("anything")));
    }

    #[test]
    fn test_schema_replaces_duplicate_name() {
        let schema = Schema::new()
            .param("port", ParamDescriptor::string())
            .param("port", ParamDescriptor::int());
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get("port").unwrap().param_type, ParamType::Int);
    }
}
