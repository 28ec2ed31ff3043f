//! Help text for a schema.

use std::fmt::Write;

use crate::{ParamType, Schema, ValueKind, env_var_name};

/// Renders usage text: `preamble`, then one entry per parameter in name
/// order.
///
/// Each entry shows the flag spelling with a value hint, the usage text,
/// whether it is required, its default, and the environment variable that
/// sets it (control parameters are never read from the environment).
///
/// # Examples
///
/// ```
/// use appconfig_core::{ParamDescriptor, Schema, render_usage};
///
/// let schema = Schema::new()
///     .param("port", ParamDescriptor::string().with_default(":8080").with_usage("bind-to port."))
///     .param("help", ParamDescriptor::usage_flag().with_prefix("--").with_usage("print usage."));
///
/// let text = render_usage(&schema, "Demo app.\n", None);
/// assert!(text.starts_with("Demo app.\n"));
/// assert!(text.contains("  -port string"));
/// assert!(text.contains("  --help\n"));
/// assert!(text.contains("(default \":8080\", env PORT)"));
/// ```
pub fn render_usage(schema: &Schema, preamble: &str, env_prefix: Option<&str>) -> String {
    let mut out = String::from(preamble);
    if !preamble.is_empty() && !preamble.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("Options:\n");

    for (name, desc) in schema.iter() {
        let hint = match (desc.param_type, desc.value_kind()) {
            (ParamType::ConfigFilePath, _) => " path",
            (ParamType::ConfigRootNode, _) => " node",
            (_, ValueKind::String) => " string",
            (_, ValueKind::Int) => " int",
            (_, ValueKind::Bool) => "",
        };
        let _ = writeln!(out, "  {}{}", desc.flag_for(name), hint);

        let mut details = Vec::new();
        if desc.required {
            details.push("required".to_string());
        }
        if let Some(default) = &desc.default {
            details.push(format!("default {default}"));
        }
        if !desc.param_type.is_control() {
            details.push(format!("env {}", env_var_name(env_prefix, name)));
        }

        let mut line = desc.usage.clone();
        if !details.is_empty() {
            if !line.is_empty() {
                line.push(' ');
            }
            let _ = write!(line, "({})", details.join(", "));
        }
        if !line.is_empty() {
            let _ = writeln!(out, "    \t{line}");
        }
    }

    out
}
