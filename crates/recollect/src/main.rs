// SPDX-FileCopyrightText: 2026 Recollect Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recollect - turn-aware memory retrieval for conversational agents.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod commands;
mod runtime;
mod shell;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recollect_config::RecollectConfig;
use recollect_core::RecollectError;

/// Recollect - turn-aware memory retrieval for conversational agents.
#[derive(Parser, Debug)]
#[command(name = "recollect", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest a transcript, one turn per non-empty line.
    Ingest {
        /// Transcript file.
        file: PathBuf,
    },
    /// Query memory and print ranked results with the injected context.
    Query {
        /// Query text.
        text: String,
    },
    /// Launch an interactive REPL session.
    Shell,
    /// Print the effective configuration with secrets masked.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => recollect_config::load_and_validate_path(path),
        None => recollect_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            recollect_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.agent.log_level);

    if let Err(e) = run(cli.command, config).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(command: Option<Commands>, config: RecollectConfig) -> Result<(), RecollectError> {
    match command {
        Some(Commands::Config) => commands::print_config(&config),
        Some(Commands::Ingest { file }) => {
            let engine = runtime::open_engine(&config).await?;
            let result = commands::run_ingest(&engine, &file).await;
            engine.shutdown().await?;
            result
        }
        Some(Commands::Query { text }) => {
            let engine = runtime::open_engine(&config).await?;
            let result = commands::run_query(&engine, &text).await;
            engine.shutdown().await?;
            result
        }
        Some(Commands::Shell) => {
            let engine = runtime::open_engine(&config).await?;
            let result = shell::run_shell(&engine).await;
            engine.shutdown().await?;
            result
        }
        None => {
            println!("recollect: use --help for available commands");
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber with the configured log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("recollect={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
