//! # edi-cli
//!
//! Command-line front end for schema-driven EDIFACT parsing and
//! serialization.
//!
//! Reads a document from disk, runs it through an [`EdiDocument`] compiled
//! from a JSON Schema and prints the result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use edi_adapter_edifact::{EdiConfig, EdiDocument};
use edi_ir::Value;
use edi_mscons::MsconsParser;
use serde::Serialize;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "edi")]
#[command(about = "Schema-driven EDIFACT parser and serializer")]
#[command(version)]
struct Cli {
    /// Path to a syntax configuration file (JSON or YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse an EDIFACT file and print it as JSON
    Parse {
        /// Input file path
        input: PathBuf,

        /// Schema file path (JSON or YAML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serialize a JSON value tree to EDIFACT
    Serialize {
        /// Input JSON file path
        input: PathBuf,

        /// Schema file path (JSON or YAML)
        #[arg(short, long)]
        schema: PathBuf,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip schema validation of the input
        #[arg(long)]
        no_validate: bool,
    },

    /// Parse an MSCONS consumption report
    Mscons {
        /// Input file path
        input: PathBuf,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(Cli::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref().map(load_config).transpose()?;

    match cli.command {
        Commands::Parse {
            input,
            schema,
            pretty,
        } => {
            let document = load_document(&schema)?;
            let text = read_input(&input)?;
            let config = config.unwrap_or_default();

            info!("Parsing {}", input.display());
            let value = document
                .parse(&text, &config)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            print_json(&value, pretty)
        }
        Commands::Serialize {
            input,
            schema,
            output,
            no_validate,
        } => {
            let mut document = load_document(&schema)?;
            if no_validate {
                document = document.without_validation();
            }
            let config = config.unwrap_or_default();

            let json = read_input(&input)?;
            let value: Value = serde_json::from_str(&json)
                .with_context(|| format!("Invalid JSON in {}", input.display()))?;

            info!("Serializing {}", input.display());
            let text = document
                .serialize(&value, &config)
                .with_context(|| format!("Failed to serialize {}", input.display()))?;

            match output {
                Some(path) => fs::write(&path, text)
                    .with_context(|| format!("Failed to write {}", path.display())),
                None => io::stdout()
                    .write_all(text.as_bytes())
                    .context("Failed to write to stdout"),
            }
        }
        Commands::Mscons { input, pretty } => {
            let mut parser = MsconsParser::new().context("Failed to compile MSCONS schema")?;
            if let Some(config) = config {
                parser = parser.with_config(config);
            }

            info!("Parsing MSCONS interchange {}", input.display());
            let document = parser
                .parse_file(&input)
                .with_context(|| format!("Failed to parse {}", input.display()))?;
            print_json(&document, pretty)
        }
    }
}

fn load_document(schema: &Path) -> Result<EdiDocument> {
    EdiDocument::from_file(schema)
        .with_context(|| format!("Failed to load schema {}", schema.display()))
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Load an [`EdiConfig`], as YAML for `.yaml`/`.yml` files and JSON otherwise
fn load_config(path: &Path) -> Result<EdiConfig> {
    let content = read_input(path)?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    let config: EdiConfig = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML config {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON config {}", path.display()))?
    };
    config
        .validate()
        .with_context(|| format!("Inconsistent config {}", path.display()))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
