//! Command-line interface for graphex.
//!
//! # Usage
//!
//! ```bash
//! # Check query documents for syntax errors
//! graphex check films.graphql actors.graphql
//!
//! # Also list the operations of every document
//! graphex check --list films.graphql
//! ```

use clap::{Parser, Subcommand};
use colored::Colorize;
use graphex_syntax::{parse_document, ParseError};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "graphex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check GraphQL query documents for syntax errors
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// List the operations of every document
        #[arg(long)]
        list: bool,
    },

    /// Show version information
    Version,
}

pub fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Check { files, list } => check_files(&files, list, cli.verbose, cli.quiet),
        Commands::Version => {
            println!("graphex {}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
    }
}

fn check_files(
    files: &[PathBuf],
    list: bool,
    verbose: bool,
    quiet: bool,
) -> Result<i32, Box<dyn std::error::Error>> {
    let mut has_errors = false;

    for file in files {
        if verbose {
            println!("{} {}", "Checking".blue(), file.display());
        }

        let source = std::fs::read_to_string(file)?;
        match check_source(&source) {
            Ok(operations) => {
                tracing::debug!(file = %file.display(), operations = operations.len(), "document ok");
                if !quiet {
                    println!("{} {}", "ok".green(), file.display());
                }
                if list {
                    for operation in operations {
                        println!("  {operation}");
                    }
                }
            }
            Err(error) => {
                has_errors = true;
                eprintln!("{}", error_line(file, &error).red());
            }
        }
    }

    Ok(i32::from(has_errors))
}

/// Parses one document and describes its operations, e.g. `query Films` or
/// `mutation (anonymous)`.
pub fn check_source(source: &str) -> Result<Vec<String>, ParseError> {
    let operations = parse_document(source)?;
    Ok(operations
        .iter()
        .map(|operation| format!("{} {}", operation.kind, operation.display_name()))
        .collect())
}

/// `file:line:col: message`
pub fn error_line(file: &Path, error: &ParseError) -> String {
    format!(
        "{}:{}: {}",
        file.display(),
        error.location,
        error.message
    )
}
