//! The resolution engine.
//!
//! [`Resolver`] merges, for each parameter independently, the value from
//! four layers in increasing precedence:
//!
//! 1. the descriptor default,
//! 2. the structured config source (file or stdin),
//! 3. the environment (only when the read-env parameter is true),
//! 4. the command line.
//!
//! The parameters selecting the config source (file path, stdin switch,
//! root node) are resolved first from their default and the command line
//! only. The read-env switch is resolved from default, config and command
//! line. When a config file is found and stdin is also enabled, the file is
//! used and stdin is never read.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{Dispatch, debug, warn};

use crate::args::{ParsedArgs, RawArg, parse_args};
use crate::coerce::{JsonCoercion, from_json, from_text};
use crate::config::Entry;
use crate::document::{Document, Format};
use crate::{
    ConfigOrigin, Layer, ParamDescriptor, ParamType, ProcessSources, ResolveError, ResolveErrors,
    ResolvedConfig, Result, Schema, Sources, Value, env_var_name, validate_schema,
};

/// Resolves a schema against the running process.
///
/// Shorthand for `Resolver::new(schema).resolve()`.
///
/// # Errors
///
/// Returns every schema, source, coercion, validation and required-parameter
/// error found.
pub fn resolve(schema: Schema) -> Result<ResolvedConfig> {
    Resolver::new(schema).resolve()
}

/// Which layers a parameter takes values from.
#[derive(Debug, Clone, Copy)]
struct Layers {
    config: bool,
    env: bool,
}

#[derive(Debug, Default)]
struct Slot {
    value: Option<Value>,
    layer: Option<Layer>,
}

/// Parameter resolution engine.
///
/// Owns the schema, the [`Sources`] it reads, the environment variable
/// prefix, and an optional logging [`Dispatch`]. Without a dispatch, traces
/// go to whatever subscriber is current (none by default).
///
/// # Examples
///
/// ```
/// use appconfig_core::*;
///
/// let schema = Schema::new()
///     .param("config", ParamDescriptor::config_file().with_default("app.json"))
///     .param("config-env", ParamDescriptor::read_env().with_default(true))
///     .param("port", ParamDescriptor::string().with_default(":8080"))
///     .param("timeout", ParamDescriptor::int().with_default(1000));
///
/// let sources = StaticSources::new()
///     .with_file("app.json", r#"{"port": ":7000", "timeout": 500}"#)
///     .with_var("APP_TIMEOUT", "600")
///     .with_args(["-port=:9000"]);
///
/// let config = Resolver::with_sources(schema, sources)
///     .env_prefix("app")
///     .resolve()
///     .unwrap();
///
/// assert_eq!(config.get_str("port").unwrap(), Some(":9000"));
/// assert_eq!(config.get_int("timeout").unwrap(), Some(600));
/// assert_eq!(config.layer("timeout").unwrap(), Some(Layer::Environment));
/// ```
#[derive(Debug)]
pub struct Resolver<S = ProcessSources> {
    schema: Schema,
    sources: S,
    env_prefix: Option<String>,
    dispatch: Option<Dispatch>,
}

impl Resolver<ProcessSources> {
    /// Creates a resolver reading the running process.
    pub fn new(schema: Schema) -> Self {
        Self::with_sources(schema, ProcessSources)
    }
}

impl<S: Sources> Resolver<S> {
    /// Creates a resolver reading `sources`.
    pub fn with_sources(schema: Schema, sources: S) -> Self {
        Self {
            schema,
            sources,
            env_prefix: None,
            dispatch: None,
        }
    }

    /// Sets the prefix for environment variable names (see
    /// [`env_var_name`]).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Routes the engine's traces to `dispatch` during resolution.
    pub fn with_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.dispatch = Some(dispatch);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn sources(&self) -> &S {
        &self.sources
    }

    /// Environment variable consulted for parameter `name`.
    pub fn env_var(&self, name: &str) -> String {
        env_var_name(self.env_prefix.as_deref(), name)
    }

    /// Reads a boolean parameter from the command line alone.
    ///
    /// Meant for switches needed before resolution, such as a debug flag
    /// that decides the logging setup. Returns `None` when the parameter is
    /// not declared, not boolean, or absent from the command line.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::Coercion`] if the flag carries a value that is
    /// not a boolean.
    pub fn peek_bool_flag(&self, name: &str) -> std::result::Result<Option<bool>, ResolveError> {
        let Some(desc) = self.schema.get(name) else {
            return Ok(None);
        };
        if desc.value_kind() != crate::ValueKind::Bool {
            return Ok(None);
        }

        let parsed = parse_args(&self.schema, &self.sources.args());
        match parsed.get(name) {
            Some(raw) => cli_value(name, desc, raw).map(|v| v.as_bool()),
            None => Ok(None),
        }
    }

    /// Resolves every parameter.
    ///
    /// # Errors
    ///
    /// Schema errors are reported before any source is read. A failed or
    /// malformed config source aborts at once. Otherwise every coercion,
    /// validation, required-parameter and command-line error is collected
    /// and returned together.
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        match &self.dispatch {
            Some(dispatch) => tracing::dispatcher::with_default(dispatch, || self.run()),
            None => self.run(),
        }
    }

    fn run(&self) -> Result<ResolvedConfig> {
        let schema_errors = validate_schema(&self.schema, self.env_prefix.as_deref());
        if !schema_errors.is_empty() {
            return Err(ResolveErrors::new(
                schema_errors.into_iter().map(ResolveError::from).collect(),
            ));
        }

        let mut parsed = parse_args(&self.schema, &self.sources.args());
        let mut errors = std::mem::take(&mut parsed.errors);
        let mut slots: BTreeMap<&str, Slot> = BTreeMap::new();

        let bootstrap = Layers {
            config: false,
            env: false,
        };
        let argument_errors = errors.len();
        for (name, desc) in self.schema.iter() {
            if desc.param_type.selects_source() {
                let slot = self.merge(name, desc, bootstrap, None, &parsed, &mut errors);
                slots.insert(name, slot);
            }
        }
        // A bad selector leaves the config source undefined.
        if errors.len() > argument_errors {
            return Err(ResolveErrors::new(errors));
        }

        let root_node = self
            .selected(&slots, ParamType::ConfigRootNode)
            .and_then(|(_, v)| v.as_str().map(String::from))
            .filter(|node| !node.is_empty());

        let (document, origin) = match self.load_document(&slots, root_node.as_deref()) {
            Ok(loaded) => loaded,
            Err(error) => {
                errors.push(error);
                return Err(ResolveErrors::new(errors));
            }
        };

        if let Some(doc) = &document {
            for key in doc.unknown_keys(|key| self.schema.get(key).is_some()) {
                debug!(key, origin = %origin, "ignoring config entry with no matching parameter");
            }
        }

        if let Some((name, desc)) = self.schema.control(ParamType::ReadEnvFlag) {
            let layers = Layers {
                config: true,
                env: false,
            };
            let slot = self.merge(name, desc, layers, document.as_ref(), &parsed, &mut errors);
            slots.insert(name, slot);
        }
        let read_env = self
            .selected(&slots, ParamType::ReadEnvFlag)
            .and_then(|(_, v)| v.as_bool())
            .unwrap_or(false);
        debug!(read_env, origin = %origin, "config sources selected");

        let layers = Layers {
            config: true,
            env: read_env,
        };
        for (name, desc) in self.schema.iter() {
            if desc.param_type.is_control() {
                continue;
            }
            let slot = self.merge(name, desc, layers, document.as_ref(), &parsed, &mut errors);
            slots.insert(name, slot);
        }

        for (name, desc) in self.schema.iter() {
            let Some(slot) = slots.get(name) else {
                continue;
            };
            match &slot.value {
                None if desc.required => errors.push(ResolveError::RequiredMissing {
                    name: name.to_string(),
                }),
                Some(value) if !desc.accepts(value) => errors.push(ResolveError::Validation {
                    name: name.to_string(),
                    value: value.clone(),
                }),
                _ => {}
            }
        }

        if !errors.is_empty() {
            return Err(ResolveErrors::new(errors));
        }

        let entries = slots
            .into_iter()
            .filter_map(|(name, slot)| {
                let desc = self.schema.get(name)?;
                let entry = Entry {
                    kind: desc.value_kind(),
                    value: slot.value,
                    layer: slot.layer,
                    serialized: !desc.param_type.selects_source(),
                };
                Some((name.to_string(), entry))
            })
            .collect();

        // A later run reading the serialized form back as its config file
        // selects the root node from the default alone.
        let serialized_root = self
            .schema
            .control(ParamType::ConfigRootNode)
            .and_then(|(_, desc)| desc.default.as_ref())
            .and_then(Value::as_str)
            .filter(|node| !node.is_empty())
            .map(String::from);

        Ok(ResolvedConfig::new(
            entries,
            origin,
            root_node,
            serialized_root,
            std::mem::take(&mut parsed.remaining),
        ))
    }

    /// Final value of the parameter declared with `param_type`, if resolved.
    fn selected<'a>(
        &self,
        slots: &'a BTreeMap<&str, Slot>,
        param_type: ParamType,
    ) -> Option<(&'a str, &'a Value)> {
        let (name, _) = self.schema.control(param_type)?;
        let (name, slot) = slots.get_key_value(name)?;
        slot.value.as_ref().map(|value| (*name, value))
    }

    fn merge(
        &self,
        name: &str,
        desc: &ParamDescriptor,
        layers: Layers,
        document: Option<&Document>,
        parsed: &ParsedArgs,
        errors: &mut Vec<ResolveError>,
    ) -> Slot {
        let mut slot = Slot::default();
        let mut apply = |layer: Layer, result: std::result::Result<Value, ResolveError>| {
            match result {
                Ok(value) => {
                    debug!(parameter = name, layer = %layer, value = %value, "parameter set");
                    slot.value = Some(value);
                    slot.layer = Some(layer);
                }
                Err(error) => errors.push(error),
            }
        };

        if let Some(default) = &desc.default {
            apply(Layer::Default, Ok(default.clone()));
        }

        if layers.config {
            if let Some(raw) = document.and_then(|doc| doc.get(name)) {
                match from_json(desc.value_kind(), raw) {
                    JsonCoercion::Value(value) => apply(Layer::Config, Ok(value)),
                    JsonCoercion::Unset => {}
                    JsonCoercion::Invalid => apply(
                        Layer::Config,
                        Err(coercion_error(name, desc, raw.to_string(), Layer::Config)),
                    ),
                }
            }
        }

        if layers.env {
            let var = self.env_var(name);
            if let Some(raw) = self.sources.var(&var).filter(|raw| !raw.is_empty()) {
                // Non-unicode values cannot be converted to any kind.
                let result = raw
                    .to_str()
                    .and_then(|text| from_text(desc.value_kind(), text))
                    .ok_or_else(|| {
                        coercion_error(name, desc, format!("{raw:?}"), Layer::Environment)
                    });
                apply(Layer::Environment, result);
            }
        }

        if let Some(raw) = parsed.get(name) {
            apply(Layer::CommandLine, cli_value(name, desc, raw));
        }

        slot
    }

    fn load_document(
        &self,
        slots: &BTreeMap<&str, Slot>,
        root_node: Option<&str>,
    ) -> std::result::Result<(Option<Document>, ConfigOrigin), ResolveError> {
        let stdin_enabled = self
            .selected(slots, ParamType::ConfigFromStdin)
            .and_then(|(_, v)| v.as_bool())
            .unwrap_or(false);

        let file = self.schema.control(ParamType::ConfigFilePath).map(|(name, desc)| {
            let path = slots
                .get(name)
                .and_then(|slot| slot.value.as_ref())
                .and_then(Value::as_str)
                .unwrap_or_default();
            (name, desc.required, path)
        });

        match file {
            Some((name, true, "")) => {
                return Err(ResolveError::RequiredMissing {
                    name: name.to_string(),
                });
            }
            Some((_, required, path)) if !path.is_empty() => {
                let path = PathBuf::from(path);
                if let Some(document) = self.load_file(&path, required, stdin_enabled, root_node)? {
                    return Ok((Some(document), ConfigOrigin::File(path)));
                }
            }
            _ => {}
        }

        if stdin_enabled {
            let text = self
                .sources
                .read_stdin()
                .map_err(|source| ResolveError::SourceRead {
                    origin: "stdin".to_string(),
                    source,
                })?;
            let document = Document::parse("stdin", &text, Format::Json, root_node)?;
            debug!(root_node, "loaded config from stdin");
            return Ok((Some(document), ConfigOrigin::Stdin));
        }

        Ok((None, ConfigOrigin::None))
    }

    /// Reads and parses the config file. A missing optional file yields
    /// `None`.
    fn load_file(
        &self,
        path: &Path,
        required: bool,
        stdin_enabled: bool,
        root_node: Option<&str>,
    ) -> std::result::Result<Option<Document>, ResolveError> {
        match self.sources.read_file(path) {
            Ok(text) => {
                if stdin_enabled {
                    warn!(
                        file = %path.display(),
                        "config file and stdin both enabled; reading the file, ignoring stdin"
                    );
                }
                let origin = path.display().to_string();
                let document = Document::parse(&origin, &text, Format::for_path(path), root_node)?;
                debug!(file = %path.display(), root_node, "loaded config file");
                Ok(Some(document))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound && !required => {
                debug!(file = %path.display(), "config file not found, skipping");
                Ok(None)
            }
            Err(error) => Err(ResolveError::SourceRead {
                origin: path.display().to_string(),
                source: error,
            }),
        }
    }
}

fn cli_value(
    name: &str,
    desc: &ParamDescriptor,
    raw: &RawArg,
) -> std::result::Result<Value, ResolveError> {
    let converted = match (desc.value_kind(), raw) {
        (crate::ValueKind::Bool, RawArg::Present) => Some(Value::Bool(true)),
        (_, RawArg::Present) => None,
        (kind, RawArg::Text(text)) => from_text(kind, text),
    };
    converted.ok_or_else(|| coercion_error(name, desc, raw.display(), Layer::CommandLine))
}

fn coercion_error(name: &str, desc: &ParamDescriptor, raw: String, layer: Layer) -> ResolveError {
    ResolveError::Coercion {
        name: name.to_string(),
        raw,
        expected: desc.value_kind(),
        layer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IntRange, StaticSources, ValueKind};

    fn demo_schema() -> Schema {
        Schema::new()
            .param("port", ParamDescriptor::string().with_default(":8080"))
            .param(
                "timeout",
                ParamDescriptor::int()
                    .with_default(1000)
                    .with_validator(IntRange::new(100, 1000)),
            )
    }

    #[test]
    fn test_scenario_cli_overrides_default() {
        let sources = StaticSources::new().with_args(["-timeout=250"]);
        let config = Resolver::with_sources(demo_schema(), sources)
            .resolve()
            .unwrap();
        assert_eq!(config.get_str("port").unwrap(), Some(":8080"));
        assert_eq!(config.get_int("timeout").unwrap(), Some(250));
        assert_eq!(config.config_origin(), &ConfigOrigin::None);
    }

    #[test]
    fn test_schema_errors_stop_before_sources() {
        let schema = Schema::new()
            .param("config", ParamDescriptor::config_file().with_default(7))
            .param("config-stdin", ParamDescriptor::config_stdin().with_default(true));
        let sources = StaticSources::new().with_stdin("{}");
        let err = Resolver::with_sources(schema, &sources).resolve().unwrap_err();
        assert!(matches!(err.errors()[0], ResolveError::Schema(_)));
        assert_eq!(sources.stdin_reads(), 0);
    }

    #[test]
    fn test_env_ignored_unless_enabled() {
        let sources = StaticSources::new().with_var("TIMEOUT", "500");
        let config = Resolver::with_sources(demo_schema(), sources)
            .resolve()
            .unwrap();
        assert_eq!(config.get_int("timeout").unwrap(), Some(1000));
        assert_eq!(config.layer("timeout").unwrap(), Some(Layer::Default));
    }

    #[test]
    fn test_empty_env_value_counts_as_unset() {
        let schema = demo_schema().param("env", ParamDescriptor::read_env().with_default(true));
        let sources = StaticSources::new().with_var("PORT", "");
        let config = Resolver::with_sources(schema, sources).resolve().unwrap();
        assert_eq!(config.get_str("port").unwrap(), Some(":8080"));
    }

    #[test]
    fn test_read_env_cannot_enable_itself() {
        let schema = demo_schema().param("config-env", ParamDescriptor::read_env());
        let sources = StaticSources::new()
            .with_var("CONFIG_ENV", "true")
            .with_var("TIMEOUT", "500");
        let config = Resolver::with_sources(schema, sources).resolve().unwrap();
        assert_eq!(config.get_bool("config-env").unwrap(), None);
        assert_eq!(config.get_int("timeout").unwrap(), Some(1000));
    }

    #[test]
    fn test_read_env_enabled_from_config_file() {
        let schema = demo_schema()
            .param("config", ParamDescriptor::config_file().with_default("c.json"))
            .param("config-env", ParamDescriptor::read_env().with_default(false));
        let sources = StaticSources::new()
            .with_file("c.json", r#"{"config-env": true}"#)
            .with_var("TIMEOUT", "500");
        let config = Resolver::with_sources(schema, sources).resolve().unwrap();
        assert_eq!(config.get_bool("config-env").unwrap(), Some(true));
        assert_eq!(config.get_int("timeout").unwrap(), Some(500));
    }

    #[test]
    fn test_overridden_coercion_failure_still_fails() {
        let schema = demo_schema().param("config-env", ParamDescriptor::read_env().with_default(true));
        let sources = StaticSources::new()
            .with_var("TIMEOUT", "soon")
            .with_args(["-timeout=200"]);
        let err = Resolver::with_sources(schema, sources).resolve().unwrap_err();
        assert!(matches!(
            &err.errors()[..],
            [ResolveError::Coercion { name, layer: Layer::Environment, expected: ValueKind::Int, .. }]
                if name == "timeout"
        ));
    }

    #[test]
    fn test_errors_are_collected_across_parameters() {
        let schema = demo_schema().param("name", ParamDescriptor::string().required());
        let sources = StaticSources::new().with_args(["-timeout=50", "-bogus"]);
        let err = Resolver::with_sources(schema, sources).resolve().unwrap_err();
        assert_eq!(err.len(), 3);
        assert!(err.iter().any(|e| matches!(e, ResolveError::Argument { .. })));
        assert!(err.iter().any(|e| matches!(e, ResolveError::Validation { .. })));
        assert!(err.iter().any(|e| matches!(e, ResolveError::RequiredMissing { .. })));
    }

    #[test]
    fn test_source_selectors_ignore_config_and_env() {
        let schema = Schema::new()
            .param("config", ParamDescriptor::config_file().with_default("a.json"))
            .param("config-env", ParamDescriptor::read_env().with_default(true))
            .param("port", ParamDescriptor::string());
        let sources = StaticSources::new()
            .with_file("a.json", r#"{"config": "b.json", "port": ":1"}"#)
            .with_file("b.json", r#"{"port": ":2"}"#)
            .with_var("CONFIG", "b.json");
        let config = Resolver::with_sources(schema, sources).resolve().unwrap();
        assert_eq!(config.get_str("config").unwrap(), Some("a.json"));
        assert_eq!(config.get_str("port").unwrap(), Some(":1"));
    }

    #[test]
    fn test_peek_bool_flag() {
        let schema = demo_schema().param("debug", ParamDescriptor::bool().with_prefix("--"));
        let resolver =
            Resolver::with_sources(schema, StaticSources::new().with_args(["--debug", "-timeout=9"]));
        assert_eq!(resolver.peek_bool_flag("debug").unwrap(), Some(true));
        assert_eq!(resolver.peek_bool_flag("port").unwrap(), None);
        assert_eq!(resolver.peek_bool_flag("missing").unwrap(), None);
    }

    #[test]
    fn test_remaining_args_are_kept() {
        let sources = StaticSources::new().with_args(["-port=:1", "serve", "-x"]);
        let config = Resolver::with_sources(demo_schema(), sources)
            .resolve()
            .unwrap();
        assert_eq!(config.remaining_args(), ["serve", "-x"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_inputs_are_errors() {
        use std::ffi::OsString;
        use std::os::unix::ffi::OsStringExt;

        let schema = demo_schema().param("env", ParamDescriptor::read_env().with_default(true));
        let sources = StaticSources::new()
            .with_var("PORT", OsString::from_vec(vec![b':', 0xff]))
            .with_arg(OsString::from_vec(vec![b'-', 0xfe]));
        let err = Resolver::with_sources(schema, sources).resolve().unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err.iter().any(|e| matches!(e, ResolveError::Argument { .. })));
        assert!(err.iter().any(|e| matches!(
            e,
            ResolveError::Coercion { name, layer: Layer::Environment, .. } if name == "port"
        )));
    }

    #[test]
    fn test_required_config_path_must_not_be_empty() {
        let schema = demo_schema().param("config", ParamDescriptor::config_file().required());
        let err = Resolver::with_sources(schema, StaticSources::new()).resolve().unwrap_err();
        assert!(matches!(
            &err.errors()[..],
            [ResolveError::RequiredMissing { name }] if name == "config"
        ));
    }

    #[test]
    fn test_custom_env_prefix() {
        let schema = demo_schema().param("env", ParamDescriptor::read_env().with_default(true));
        let resolver = Resolver::with_sources(schema, StaticSources::new().with_var("SVC_PORT", ":3"))
            .env_prefix("svc");
        assert_eq!(resolver.env_var("port"), "SVC_PORT");
        let config = resolver.resolve().unwrap();
        assert_eq!(config.get_str("port").unwrap(), Some(":3"));
    }
}
