use std::time::Instant;

use appconfig_core::{IntRange, ParamDescriptor, Resolver, Schema, render_usage};
use tracing::Level;

const PACKAGE_VERSION: &str = env!("CARGO_PKG_VERSION");

const PREAMBLE: &str =
    "This program is a sample of layered parameter resolution with appconfig.\n";

fn schema() -> Schema {
    Schema::new()
        .param(
            "config",
            ParamDescriptor::config_file()
                .with_default("config.json")
                .with_usage("json config file."),
        )
        .param(
            "config-stdin",
            ParamDescriptor::config_stdin().with_default(false).with_usage(
                "json config input from stdin (can be redirected from file or piped from another command.)",
            ),
        )
        .param(
            "config-node",
            ParamDescriptor::config_root_node()
                .with_default("example")
                .with_usage("root node in the config file."),
        )
        .param(
            "config-env",
            ParamDescriptor::read_env()
                .with_default(false)
                .with_usage("whether or not to read config from environment variables."),
        )
        .param(
            "debug",
            ParamDescriptor::bool()
                .with_default(false)
                .with_usage("verbose output.")
                .with_prefix("--"),
        )
        .param(
            "port",
            ParamDescriptor::string()
                .with_default(":8080")
                .with_usage("bind-to port.")
                .required(),
        )
        .param(
            "statsd_addr",
            ParamDescriptor::string().with_usage("statsd endpoint."),
        )
        .param(
            "timeout",
            ParamDescriptor::int()
                .with_default(1000)
                .with_usage("server timeout 100 <= timeout <= 1000 (ms).")
                .with_validator(IntRange::new(100, 1000)),
        )
        .param(
            "help",
            ParamDescriptor::usage_flag()
                .with_default(false)
                .with_usage("print usage.")
                .with_prefix("--"),
        )
}

fn main() {
    match run() {
        Ok(()) => {}
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<(), String> {
    let schema = schema();

    println!("appconfig-demo {PACKAGE_VERSION}");
    println!("\nThe following parameters have been defined:");
    for (name, desc) in schema.iter() {
        let default = desc
            .default
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "<none>".to_string());
        println!(
            "\tparam={name:?}, type={}, default={default}, usage={:?}, required={}, prefix={:?}",
            desc.param_type,
            desc.usage,
            desc.required,
            desc.flag_prefix()
        );
    }
    println!();

    let resolver = Resolver::new(schema);
    let debug = resolver
        .peek_bool_flag("debug")
        .map_err(|e| e.to_string())?
        .unwrap_or(false);
    let level = if debug { Level::DEBUG } else { Level::WARN };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    let resolver = resolver.with_dispatch(tracing::Dispatch::new(subscriber));

    let start = Instant::now();
    println!("*** Resolving configuration...");
    let config = resolver.resolve().map_err(|e| e.to_string())?;
    println!("*** Done. Elapsed time: {:?}", start.elapsed());

    if config.get_bool("help").map_err(|e| e.to_string())? == Some(true) {
        print!("{}", render_usage(resolver.schema(), PREAMBLE, None));
        return Ok(());
    }

    println!("\nResult:");
    for (name, value) in config.iter() {
        let layer = config
            .layer(name)
            .map_err(|e| e.to_string())?
            .map(|layer| layer.to_string())
            .unwrap_or_else(|| "unset".to_string());
        match value {
            Some(value) => println!(
                "\tparam = {name}, value = {value}, type = {}, from = {layer}",
                value.kind()
            ),
            None => println!("\tparam = {name}, value = <none>, from = {layer}"),
        }
    }
    println!("\tconfig source = {}", config.config_origin());

    let json = config
        .to_json()
        .map_err(|e| format!("Failed to serialize config to json: {e}"))?;
    println!("\n\nJson serialization of this config (for future re-parse):");
    println!("{json}");

    Ok(())
}
