//! # teidoc CLI
//!
//! Command-line front end for the teidoc document core.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "teidoc")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file (optional; defaults apply when missing)
    #[arg(long, default_value = "teidoc.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a TEI file and summarise it
    Inspect {
        /// TEI document to load
        file: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Load a TEI file and serialize it back
    Roundtrip {
        /// TEI document to load
        file: PathBuf,

        /// Write the output here instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Fail if the passages change after reloading the output
        #[arg(long)]
        check: bool,
    },

    /// Rebuild a document from a JSON event log
    Replay {
        /// Event log written by an editor session
        events: PathBuf,

        /// Rewind to this revision instead of the head of the log
        #[arg(long)]
        revision: Option<u64>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Validate every passage through the cached validator
    Validate {
        /// TEI document to load
        file: PathBuf,

        /// Schema handed to the oracle
        #[arg(long, default_value = "tei_all.rng")]
        schema: PathBuf,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so stdout stays parseable
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Inspect { file, json } => commands::inspect(&cli.config, &file, json),
        Commands::Roundtrip {
            file,
            output,
            check,
        } => commands::roundtrip(&file, output.as_deref(), check),
        Commands::Replay {
            events,
            revision,
            json,
        } => commands::replay(&events, revision, json),
        Commands::Validate { file, schema, json } => {
            commands::validate(&cli.config, &file, &schema, json)
        }
    }
}
