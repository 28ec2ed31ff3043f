//! Command-line layer.
//!
//! Each parameter is spelled as its prefix (default `-`, or the descriptor's
//! override) followed by its name. Accepted forms:
//!
//! - `-name=value`
//! - `-name value` (non-boolean parameters only)
//! - `-name` (boolean parameters: sets `true`)
//! - `-name=false` (boolean parameters)
//!
//! Parsing stops at `--`, which is consumed, or at the first argument that
//! does not start with `-`. Everything after that is positional.

use std::collections::HashMap;
use std::ffi::OsString;

use crate::{ResolveError, Schema, ValueKind};

/// Raw value of one flag as given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RawArg {
    /// Boolean flag given without `=value`.
    Present,
    Text(String),
}

impl RawArg {
    pub(crate) fn display(&self) -> String {
        match self {
            RawArg::Present => "(present)".to_string(),
            RawArg::Text(text) => format!("{text:?}"),
        }
    }
}

/// Flags found on the command line, by parameter name.
#[derive(Debug, Default)]
pub(crate) struct ParsedArgs {
    pub(crate) values: HashMap<String, RawArg>,
    pub(crate) remaining: Vec<String>,
    pub(crate) errors: Vec<ResolveError>,
}

impl ParsedArgs {
    pub(crate) fn get(&self, name: &str) -> Option<&RawArg> {
        self.values.get(name)
    }
}

pub(crate) fn parse_args(schema: &Schema, args: &[OsString]) -> ParsedArgs {
    let flags: HashMap<String, (&str, ValueKind)> = schema
        .iter()
        .map(|(name, desc)| (desc.flag_for(name), (name, desc.value_kind())))
        .collect();

    let mut parsed = ParsedArgs::default();
    let mut i = 0;

    while i < args.len() {
        let Some(arg) = unicode(&args[i], &mut parsed.errors) else {
            i += 1;
            continue;
        };
        if arg == "--" {
            parsed.remaining = positional(&args[i + 1..], &mut parsed.errors);
            break;
        }
        if !arg.starts_with('-') || arg == "-" {
            parsed.remaining = positional(&args[i..], &mut parsed.errors);
            break;
        }

        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag, Some(value)),
            None => (arg, None),
        };

        let Some(&(name, kind)) = flags.get(flag) else {
            parsed.errors.push(ResolveError::Argument {
                arg: arg.to_string(),
                reason: "flag provided but not defined".to_string(),
            });
            i += 1;
            continue;
        };

        let raw = match (kind, inline) {
            (_, Some(value)) => Some(RawArg::Text(value.to_string())),
            (ValueKind::Bool, None) => Some(RawArg::Present),
            (_, None) => {
                i += 1;
                match args.get(i) {
                    Some(value) => match unicode(value, &mut parsed.errors) {
                        Some(value) => Some(RawArg::Text(value.to_string())),
                        None => {
                            i += 1;
                            continue;
                        }
                    },
                    None => None,
                }
            }
        };

        match raw {
            Some(raw) => {
                parsed.values.insert(name.to_string(), raw);
            }
            None => parsed.errors.push(ResolveError::Argument {
                arg: arg.to_string(),
                reason: "flag needs a value".to_string(),
            }),
        }
        i += 1;
    }

    parsed
}

fn unicode<'a>(arg: &'a OsString, errors: &mut Vec<ResolveError>) -> Option<&'a str> {
    let text = arg.to_str();
    if text.is_none() {
        errors.push(ResolveError::Argument {
            arg: arg.to_string_lossy().into_owned(),
            reason: "argument is not valid unicode".to_string(),
        });
    }
    text
}

fn positional(args: &[OsString], errors: &mut Vec<ResolveError>) -> Vec<String> {
    args.iter()
        .filter_map(|arg| unicode(arg, errors).map(String::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParamDescriptor;

    fn schema() -> Schema {
        Schema::new()
            .param("port", ParamDescriptor::string())
            .param("timeout", ParamDescriptor::int())
            .param("debug", ParamDescriptor::bool().with_prefix("--"))
            .param("verbose", ParamDescriptor::bool())
    }

    fn args(items: &[&str]) -> Vec<OsString> {
        items.iter().map(OsString::from).collect()
    }

    #[test]
    fn test_equals_and_separate_values() {
        let parsed = parse_args(&schema(), &args(&["-timeout=250", "-port", ":9000"]));
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.get("timeout"), Some(&RawArg::Text("250".into())));
        assert_eq!(parsed.get("port"), Some(&RawArg::Text(":9000".into())));
    }

    #[test]
    fn test_bool_presence_does_not_consume_next() {
        let parsed = parse_args(&schema(), &args(&["-verbose", "file.txt"]));
        assert_eq!(parsed.get("verbose"), Some(&RawArg::Present));
        assert_eq!(parsed.remaining, vec!["file.txt"]);
    }

    #[test]
    fn test_prefix_override_is_the_only_spelling() {
        let parsed = parse_args(&schema(), &args(&["--debug"]));
        assert_eq!(parsed.get("debug"), Some(&RawArg::Present));

        let parsed = parse_args(&schema(), &args(&["-debug"]));
        assert!(parsed.get("debug").is_none());
        assert_eq!(parsed.errors.len(), 1);
    }

    #[test]
    fn test_double_dash_terminates() {
        let parsed = parse_args(&schema(), &args(&["-verbose=false", "--", "-port=x"]));
        assert_eq!(parsed.get("verbose"), Some(&RawArg::Text("false".into())));
        assert!(parsed.get("port").is_none());
        assert_eq!(parsed.remaining, vec!["-port=x"]);
    }

    #[test]
    fn test_missing_value_is_reported() {
        let parsed = parse_args(&schema(), &args(&["-timeout"]));
        assert!(matches!(
            &parsed.errors[..],
            [ResolveError::Argument { reason, .. }] if reason == "flag needs a value"
        ));
    }

    #[test]
    fn test_last_occurrence_wins() {
        let parsed = parse_args(&schema(), &args(&["-timeout=1", "-timeout=2"]));
        assert_eq!(parsed.get("timeout"), Some(&RawArg::Text("2".into())));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_arguments_are_reported() {
        use std::os::unix::ffi::OsStringExt;

        let bad = || OsString::from_vec(vec![b'-', b'p', 0xff]);
        let mut argv = args(&["-timeout=3", "-port"]);
        argv.push(bad());
        argv.push(OsString::from("serve"));
        argv.push(bad());

        let parsed = parse_args(&schema(), &argv);
        assert_eq!(parsed.get("timeout"), Some(&RawArg::Text("3".into())));
        assert!(parsed.get("port").is_none());
        assert_eq!(parsed.remaining, vec!["serve"]);
        assert_eq!(parsed.errors.len(), 2);
        assert!(parsed.errors.iter().all(|e| matches!(
            e,
            ResolveError::Argument { reason, .. } if reason == "argument is not valid unicode"
        )));
    }

    #[test]
    fn test_unknown_flag_keeps_parsing() {
        let parsed = parse_args(&schema(), &args(&["-nope", "-timeout=3"]));
        assert_eq!(parsed.errors.len(), 1);
        assert_eq!(parsed.get("timeout"), Some(&RawArg::Text("3".into())));
    }
}
