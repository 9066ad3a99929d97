use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use markup_engine::{Engine, EngineConfig, FilterErrorPolicy, RenderOptions};
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod context;
mod errors;

use context::{load_context, load_template, parse_global_value};
use errors::Error;

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;

/// Markup CLI: render a template against a JSON or TOML data context
#[derive(Parser, Debug)]
#[command(name = "markup")]
#[command(about = "Render a markup template against a data context", long_about = None)]
struct Cli {
    /// Template file to render, or `-` to read it from stdin
    template: PathBuf,

    /// Data context file (.json or .toml)
    #[arg(short, long)]
    context: Option<PathBuf>,

    /// Engine configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Separator between filter arguments
    #[arg(long)]
    delimiter: Option<String>,

    /// Collapse whitespace between adjacent markup tags
    #[arg(long)]
    compact: bool,

    /// Fail the render when a filter fails instead of passing the value through
    #[arg(long)]
    strict_filters: bool,

    /// Global values in KEY=VALUE form; may be repeated
    #[arg(short = 'D', value_parser = parse_key_val)]
    define: Vec<(String, String)>,
}

pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    Ok((s[..pos].to_string(), s[pos + 1..].to_string()))
}

/// Builds the engine for the given arguments.
///
/// The configuration file is applied first; command-line flags and `-D`
/// globals are merged over it.
fn build_engine(cli: &Cli) -> Result<Engine, Error> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mut engine = Engine::from_config(config)?;

    let mut options = RenderOptions::new();
    if let Some(delimiter) = &cli.delimiter {
        options = options.with_delimiter(delimiter.clone());
    }
    if cli.compact {
        options = options.with_compact(true);
    }
    for (name, value) in &cli.define {
        options = options.with_global(name.clone(), parse_global_value(value));
    }
    engine.configure(options);

    if cli.strict_filters {
        engine.set_filter_error_policy(FilterErrorPolicy::Propagate);
    }

    debug!(
        globals = engine.globals().len(),
        strict = cli.strict_filters,
        "Engine ready"
    );
    Ok(engine)
}

fn run(cli: &Cli) -> Result<String, Error> {
    let mut engine = build_engine(cli)?;
    let template = load_template(&cli.template)?;
    let context = load_context(cli.context.as_deref())?;

    let output = engine.render(&template, &context)?;
    Ok(output)
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().pretty().with_writer(io::stderr))
        .with(EnvFilter::from_env("MARKUP_LOG"))
        .init();

    let cli = Cli::parse();
    let output = match run(&cli) {
        Ok(output) => output,
        Err(e) => {
            error!("Error: {e}");
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout().lock();
    if stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.flush())
        .is_err()
    {
        error!("Error: {}", Error::StdOutWriteFailed);
        std::process::exit(1);
    }
}
