//! compkey command-line client
//!
//! Checks records against the composite unique keys declared for their
//! entity, using an SQLite database as the row store.

mod commands;
mod error;
mod formatter;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use formatter::OutputFormat;

/// compkey command-line client
#[derive(Parser, Debug)]
#[command(name = "compkey")]
#[command(version, about = "Composite unique key validation for SQLite tables")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the normalized unique keys of a declaration file
    Keys {
        /// Key declaration file (JSON object: entity -> keys)
        #[arg(short, long)]
        config: PathBuf,

        /// Only print this entity
        #[arg(short, long)]
        entity: Option<String>,

        /// Output format
        #[arg(long, default_value = "text", value_enum)]
        format: OutputFormat,
    },

    /// Validate a record against the rows of an SQLite database
    Check {
        /// SQLite database file
        #[arg(short, long)]
        db: PathBuf,

        /// Key declaration file (JSON object: entity -> keys)
        #[arg(short, long)]
        config: PathBuf,

        /// Entity (table) of the record
        #[arg(short, long)]
        entity: String,

        /// Record fields as a JSON object
        #[arg(short, long)]
        record: String,

        /// Fields identifying an existing row to update (repeatable);
        /// without it the record is new
        #[arg(short, long = "key")]
        key: Vec<String>,

        /// Output format
        #[arg(long, default_value = "text", value_enum)]
        format: OutputFormat,
    },
}

fn main() {
    // Initialize tracing
    let mut filter = tracing_subscriber::EnvFilter::from_default_env();
    if let Ok(directive) = "compkey=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let args = Args::parse();

    match commands::run(args.command) {
        Ok(outcome) => {
            println!("{}", outcome.output);
            std::process::exit(outcome.exit_code());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
