//! Structured config source.
//!
//! The source is a JSON object (YAML is accepted for `.yaml`/`.yml` files).
//! Parameters are looked up either at its top level or inside the object
//! stored under the root node name:
//!
//! ```json
//! { "example": { "port": ":8080", "timeout": 250 } }
//! ```

use std::path::Path;

use serde_json::{Map, Value as Json};

use crate::ResolveError;

/// Syntax of a structured config source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Chooses the syntax from a file extension; anything but
    /// `yaml`/`yml` is JSON.
    pub(crate) fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Format::Yaml
            }
            _ => Format::Json,
        }
    }
}

/// Parameter values read from the structured source, already narrowed to
/// the root node.
#[derive(Debug, Clone, Default)]
pub(crate) struct Document {
    entries: Map<String, Json>,
}

impl Document {
    /// Parses `text` and selects `root_node` (top level when `None`).
    pub(crate) fn parse(
        origin: &str,
        text: &str,
        format: Format,
        root_node: Option<&str>,
    ) -> Result<Self, ResolveError> {
        let parse_error = |reason: String| ResolveError::Parse {
            origin: origin.to_string(),
            reason,
        };

        let value: Json = match format {
            Format::Json => serde_json::from_str(text).map_err(|e| parse_error(e.to_string()))?,
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| parse_error(e.to_string()))?,
        };

        let Json::Object(top) = value else {
            return Err(parse_error("top level is not an object".to_string()));
        };

        let entries = match root_node {
            None => top,
            Some(node) => match top.get(node) {
                Some(Json::Object(inner)) => inner.clone(),
                Some(_) => {
                    return Err(parse_error(format!("root node {node:?} is not an object")));
                }
                None => return Err(parse_error(format!("root node {node:?} not found"))),
            },
        };

        Ok(Self { entries })
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Json> {
        self.entries.get(name)
    }

    /// Keys present in the source that no parameter claims.
    pub(crate) fn unknown_keys<'a>(
        &'a self,
        known: impl Fn(&str) -> bool + 'a,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .keys()
            .map(String::as_str)
            .filter(move |key| !known(*key))
    }
}
