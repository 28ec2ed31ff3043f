//! Layered parameter resolution for command-line programs and services.
//!
//! This crate turns a declarative [`Schema`] of named parameters into a
//! typed, validated [`ResolvedConfig`], merging four sources in increasing
//! precedence:
//!
//! 1. the descriptor default,
//! 2. a structured config (JSON/YAML file, or JSON on stdin),
//! 3. environment variables (when the read-env parameter is set),
//! 4. command-line flags.
//!
//! - [`ParamDescriptor`] declares a parameter: its [`ParamType`], default,
//!   usage text, whether it is required, a [`Validator`] and an optional
//!   flag prefix override.
//! - [`Resolver`] runs the merge against a [`Sources`] implementation and
//!   reports every problem as [`ResolveErrors`].
//! - [`ResolvedConfig`] answers typed queries and serializes back into a
//!   config file ([`ResolvedConfig::to_json`]).
//! - [`render_usage`] formats help text from the schema.
//!
//! # Example
//!
//! ```
//! use appconfig_core::*;
//!
//! let schema = Schema::new()
//!     .param("config", ParamDescriptor::config_file().with_default("config.json"))
//!     .param("port", ParamDescriptor::string().with_default(":8080").required())
//!     .param(
//!         "timeout",
//!         ParamDescriptor::int()
//!             .with_default(1000)
//!             .with_validator(IntRange::new(100, 1000)),
//!     )
//!     .param("help", ParamDescriptor::usage_flag().with_prefix("--"));
//!
//! let sources = StaticSources::new().with_args(["-timeout=250"]);
//! let config = Resolver::with_sources(schema, sources).resolve().unwrap();
//!
//! assert_eq!(config.get_str("port").unwrap(), Some(":8080"));
//! assert_eq!(config.get_int("timeout").unwrap(), Some(250));
//! assert_eq!(config.get_bool("help").unwrap(), None);
//! assert_eq!(config.config_origin(), &ConfigOrigin::None);
//! ```

mod args;
mod coerce;
mod config;
mod document;
mod error;
mod resolve;
mod source;
mod types;
mod usage;
mod validate;
mod validator;

pub use coerce::parse_bool;
pub use config::{ConfigOrigin, Layer, ResolvedConfig};
pub use error::{LookupError, ResolveError, ResolveErrors, Result, SchemaError};
pub use resolve::{Resolver, resolve};
pub use source::{ProcessSources, Sources, StaticSources, env_var_name};
pub use types::*;
pub use usage::render_usage;
pub use validate::validate_schema;
pub use validator::{IntRange, Matches, NonEmpty, OneOf, Validator};
