//! Treefile CLI
//!
//! Inspect documents, convert templates and verify files against a schema.
//!
//! Usage:
//!   treefile parse notes.lst --json
//!   treefile template '[$<#>]<boolean>'
//!   treefile check notes.lst --schema groceries.schema --format groceries
//!   treefile check-dir ./lists --schema groceries.schema --format groceries

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use treefile::{codec, FileFormat, FormatError, Schema, TreefileConfig};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "treefile")]
#[command(about = "Read, convert and verify treefile documents")]
struct Cli {
    /// Explicit config file (treefile.toml is picked up automatically)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a file and print it back
    Parse {
        file: PathBuf,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Convert a template to a regex
    Template { template: String },

    /// Convert a regex to a template
    Regex { regex: String },

    /// Load a file through its format and report every violation
    Check {
        file: PathBuf,
        /// Schema definition file
        #[arg(short, long)]
        schema: PathBuf,
        /// Format name the header must carry
        #[arg(short, long)]
        format: String,
    },

    /// Check every file with the schema's extension under a directory
    CheckDir {
        dir: PathBuf,
        #[arg(short, long)]
        schema: PathBuf,
        #[arg(short, long)]
        format: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Returns whether every checked file passed
fn run(cli: Cli) -> Result<bool> {
    let config = TreefileConfig::load_from(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Parse { file, json } => {
            let content = std::fs::read_to_string(&file).with_context(|| format!("Failed to read {:?}", file))?;
            let (tree, root) = codec::parse_str(&content).with_context(|| format!("Failed to parse {:?}", file))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&tree.to_json(root))?);
            } else {
                println!("{}", codec::serialize_subtree(&tree, root));
            }
            Ok(true)
        }

        Commands::Template { template } => {
            println!("{}", treefile::template_to_regex(&template));
            Ok(true)
        }

        Commands::Regex { regex } => {
            println!("{}", treefile::regex_to_template(&regex));
            Ok(true)
        }

        Commands::Check { file, schema, format } => {
            let format = open_format(&schema, &format, config)?;
            check_file(&format, &file)
        }

        Commands::CheckDir { dir, schema, format } => {
            let format = open_format(&schema, &format, config)?;
            let Some(schema) = format.latest_schema() else {
                bail!("format '{}' has no schema", format.name());
            };

            let mut checked = 0;
            let mut failed = 0;
            for entry in WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_file() || !schema.matches_extension(path) {
                    continue;
                }
                checked += 1;
                if !check_file(&format, path)? {
                    failed += 1;
                }
            }

            println!();
            println!("{} file(s) checked, {} failed", checked, failed);
            Ok(failed == 0)
        }
    }
}

fn open_format(schema_path: &Path, name: &str, config: TreefileConfig) -> Result<FileFormat> {
    let text = std::fs::read_to_string(schema_path)
        .with_context(|| format!("Failed to read schema {:?}", schema_path))?;
    let schema = Schema::parse_text(&text).with_context(|| format!("Invalid schema {:?}", schema_path))?;
    Ok(FileFormat::new(name, vec![schema])?.with_config(config))
}

/// Load one file, printing the outcome. Verification failures are reported
/// and return `false`; anything else is an error.
fn check_file(format: &FileFormat, path: &Path) -> Result<bool> {
    match format.load(path) {
        Ok(_) => {
            println!("✅ {}", path.display());
            Ok(true)
        }
        Err(FormatError::Violation { diagnostics, .. }) => {
            println!("❌ {} ({} problem(s))", path.display(), diagnostics.len());
            for line in diagnostics.format_all().lines() {
                println!("   {}", line);
            }
            Ok(false)
        }
        Err(e @ (FormatError::Parse(_) | FormatError::Header(_) | FormatError::UnknownSchemaVersion { .. })) => {
            println!("❌ {}: {}", path.display(), e);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
