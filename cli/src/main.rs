mod schema_dsl;

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use jsonish_core::{CoercedShape, CoercedValue, ParseOptions};
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "jsonish")]
#[command(about = "Parse loosely-formed LLM text output against a schema")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse text against a schema and print the coerced JSON result
    Parse {
        /// Schema description file (JSON). See schema_dsl module docs for
        /// the accepted shapes.
        #[arg(short, long)]
        schema: PathBuf,

        /// Input text file to parse. Reads stdin when omitted.
        input: Option<PathBuf>,

        /// Parse options file (JSON), overriding the defaults from
        /// `ParseOptions::default()`.
        #[arg(long)]
        options: Option<PathBuf>,

        /// Also print the coercion flags recorded while parsing, to stderr.
        #[arg(long)]
        show_flags: bool,

        /// Pretty-print the JSON result.
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a schema description file without parsing anything
    CheckSchema {
        /// Schema description file (JSON).
        schema: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Parse {
            schema,
            input,
            options,
            show_flags,
            pretty,
        } => run_parse(&schema, input.as_deref(), options.as_deref(), show_flags, pretty),
        Commands::CheckSchema { schema } => run_check_schema(&schema),
    }
}

fn run_parse(
    schema_path: &std::path::Path,
    input_path: Option<&std::path::Path>,
    options_path: Option<&std::path::Path>,
    show_flags: bool,
    pretty: bool,
) -> Result<()> {
    let schema_json = read_json(schema_path).context("reading schema")?;
    let schema = schema_dsl::compile(&schema_json).context("compiling schema")?;

    let options = match options_path {
        Some(path) => {
            let raw = fs::read_to_string(path).with_context(|| format!("reading options file {path:?}"))?;
            serde_json::from_str(&raw).context("parsing options file")?
        }
        None => ParseOptions::default(),
    };

    let input_text = read_input(input_path)?;

    tracing::debug!(bytes = input_text.len(), "parsing input");
    let result = jsonish_core::parse(&input_text, &schema, &options)
        .map_err(|err| anyhow::Error::msg(err.to_string()))
        .context("parse failed")?;

    print_result(&result, pretty)?;
    if show_flags {
        print_flags(&result);
    }
    Ok(())
}

fn run_check_schema(schema_path: &std::path::Path) -> Result<()> {
    let schema_json = read_json(schema_path).context("reading schema")?;
    let schema = schema_dsl::compile(&schema_json).context("compiling schema")?;
    println!("{}", schema.describe());
    Ok(())
}

fn read_json(path: &std::path::Path) -> Result<serde_json::Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("reading {path:?}"))?;
    serde_json::from_str(&raw).with_context(|| format!("{path:?} is not valid JSON"))
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path).with_context(|| format!("reading {path:?}")),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf).context("reading stdin")?;
            Ok(buf)
        }
    }
}

fn print_result(result: &CoercedValue, pretty: bool) -> Result<()> {
    let json = result.to_json();
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    println!("{text}");
    Ok(())
}

/// Walks the whole coerced tree, not just the top-level flags, so provenance
/// recorded deep inside an object's fields or an array's elements is
/// actually surfaced rather than silently dropped.
fn print_flags(result: &CoercedValue) {
    print_flags_at("$", result);
}

fn print_flags_at(path: &str, value: &CoercedValue) {
    for flag in &value.flags {
        eprintln!("{path}: {flag:?}");
    }
    match &value.shape {
        CoercedShape::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                print_flags_at(&format!("{path}[{i}]"), item);
            }
        }
        CoercedShape::Object(fields) => {
            for (name, field) in fields {
                print_flags_at(&format!("{path}.{name}"), field);
            }
        }
        _ => {}
    }
}
