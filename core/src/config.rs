//! The resolved configuration store.
//!
//! A [`ResolvedConfig`] holds the winning value of every declared parameter
//! together with the [`Layer`] it came from. It is immutable and can be
//! serialized back into a config file with [`ResolvedConfig::to_json`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde_json::{Map, Value as Json};

use crate::{LookupError, Value, ValueKind};

/// Source tier a value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Descriptor default.
    Default,
    /// Structured config file or stdin.
    Config,
    /// Environment variable.
    Environment,
    /// Command-line flag.
    CommandLine,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Layer::Default => write!(f, "default"),
            Layer::Config => write!(f, "config"),
            Layer::Environment => write!(f, "environment"),
            Layer::CommandLine => write!(f, "command line"),
        }
    }
}

/// Structured config source that was actually read.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigOrigin {
    /// No structured source was read.
    #[default]
    None,
    /// The file named by the config-file parameter.
    File(PathBuf),
    /// Standard input.
    Stdin,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::None => write!(f, "none"),
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Stdin => write!(f, "stdin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Entry {
    pub(crate) kind: ValueKind,
    pub(crate) value: Option<Value>,
    pub(crate) layer: Option<Layer>,
    /// Written by `to_json`; false for the source-selecting parameters.
    pub(crate) serialized: bool,
}

/// Final, validated configuration.
///
/// # Examples
///
/// ```
/// use appconfig_core::{Layer, ParamDescriptor, Resolver, Schema, StaticSources};
///
/// let schema = Schema::new()
///     .param("port", ParamDescriptor::string().with_default(":8080"))
///     .param("timeout", ParamDescriptor::int().with_default(1000));
/// let sources = StaticSources::new().with_args(["-timeout=250"]);
///
/// let config = Resolver::with_sources(schema, sources).resolve().unwrap();
/// assert_eq!(config.get_str("port").unwrap(), Some(":8080"));
/// assert_eq!(config.get_int("timeout").unwrap(), Some(250));
/// assert_eq!(config.layer("timeout").unwrap(), Some(Layer::CommandLine));
/// assert!(config.get("nope").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    entries: BTreeMap<String, Entry>,
    origin: ConfigOrigin,
    root_node: Option<String>,
    /// Root node `to_value` nests under.
    serialized_root: Option<String>,
    remaining: Vec<String>,
}

impl ResolvedConfig {
    pub(crate) fn new(
        entries: BTreeMap<String, Entry>,
        origin: ConfigOrigin,
        root_node: Option<String>,
        serialized_root: Option<String>,
        remaining: Vec<String>,
    ) -> Self {
        Self {
            entries,
            origin,
            root_node,
            serialized_root,
            remaining,
        }
    }

    fn entry(&self, name: &str) -> Result<&Entry, LookupError> {
        self.entries
            .get(name)
            .ok_or_else(|| LookupError::UnknownParameter(name.to_string()))
    }

    fn typed(&self, name: &str, expected: ValueKind) -> Result<Option<&Value>, LookupError> {
        let entry = self.entry(name)?;
        if entry.kind != expected {
            return Err(LookupError::TypeMismatch {
                name: name.to_string(),
                expected,
                actual: entry.kind,
            });
        }
        Ok(entry.value.as_ref())
    }

    /// Final value of `name`; `None` when no source set it.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::UnknownParameter`] if `name` was not declared.
    pub fn get(&self, name: &str) -> Result<Option<&Value>, LookupError> {
        Ok(self.entry(name)?.value.as_ref())
    }

    /// Final value of a string-kinded parameter.
    ///
    /// # Errors
    ///
    /// [`LookupError::UnknownParameter`] or [`LookupError::TypeMismatch`].
    pub fn get_str(&self, name: &str) -> Result<Option<&str>, LookupError> {
        Ok(self
            .typed(name, ValueKind::String)?
            .and_then(Value::as_str))
    }

    /// Final value of an integer parameter.
    ///
    /// # Errors
    ///
    /// [`LookupError::UnknownParameter`] or [`LookupError::TypeMismatch`].
    pub fn get_int(&self, name: &str) -> Result<Option<i64>, LookupError> {
        Ok(self.typed(name, ValueKind::Int)?.and_then(Value::as_int))
    }

    /// Final value of a boolean-kinded parameter.
    ///
    /// # Errors
    ///
    /// [`LookupError::UnknownParameter`] or [`LookupError::TypeMismatch`].
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>, LookupError> {
        Ok(self.typed(name, ValueKind::Bool)?.and_then(Value::as_bool))
    }

    /// Layer the final value of `name` came from.
    pub fn layer(&self, name: &str) -> Result<Option<Layer>, LookupError> {
        Ok(self.entry(name)?.layer)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Declared parameter names, in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// All parameters with their final values, in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.entries
            .iter()
            .map(|(name, entry)| (name.as_str(), entry.value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Structured source that was read during resolution.
    pub fn config_origin(&self) -> &ConfigOrigin {
        &self.origin
    }

    /// Root node parameters were read from, if any.
    pub fn root_node(&self) -> Option<&str> {
        self.root_node.as_deref()
    }

    /// Positional arguments left after the flags.
    pub fn remaining_args(&self) -> &[String] {
        &self.remaining
    }

    /// The serialized form as a JSON value.
    ///
    /// Contains every set parameter except the ones selecting the config
    /// source (file path, stdin switch, root node). Parameters are nested
    /// under the root node's default, which is what a run without a
    /// command-line override reads, even if this run selected another one.
    pub fn to_value(&self) -> Json {
        let params: Map<String, Json> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.serialized)
            .filter_map(|(name, entry)| {
                entry
                    .value
                    .as_ref()
                    .map(|value| (name.clone(), to_json_scalar(value)))
            })
            .collect();

        match &self.serialized_root {
            Some(node) => {
                let mut top = Map::new();
                top.insert(node.clone(), Json::Object(params));
                Json::Object(top)
            }
            None => Json::Object(params),
        }
    }

    /// Serializes the configuration as pretty-printed JSON, suitable as a
    /// config file for a later run.
    ///
    /// # Errors
    ///
    /// Returns the [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_value())
    }
}

fn to_json_scalar(value: &Value) -> Json {
    match value {
        Value::String(s) => Json::String(s.clone()),
        Value::Int(i) => Json::from(*i),
        Value::Bool(b) => Json::Bool(*b),
    }
}
