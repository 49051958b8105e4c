//! Thalamus - real-time signal pipeline runtime
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline server (default)
//! thalamus
//! thalamus --config pipeline.json
//!
//! # Explicit subcommand with a custom listen address
//! thalamus serve --config pipeline.json --address 0.0.0.0:50674
//! ```

mod cmd;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Thalamus - real-time signal pipeline runtime
#[derive(Parser, Debug)]
#[command(name = "thalamus")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    // Global args that apply to serve when no subcommand given
    /// Path to the pipeline document
    #[arg(short, long, default_value = "pipeline.json", global = true)]
    config: std::path::PathBuf,

    /// Listen address for the RPC surface
    #[arg(short, long, default_value = "127.0.0.1:50674", global = true)]
    address: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline server
    Serve(cmd::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Command::Serve(args)) => {
            init_logging(&args.log_level)?;
            cmd::serve::run(args).await
        }
        // No subcommand = serve (default behavior)
        None => {
            init_logging(&cli.log_level)?;
            let args = cmd::serve::ServeArgs {
                config: cli.config,
                address: cli.address,
                log_level: cli.log_level,
            };
            cmd::serve::run(args).await
        }
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();

    Ok(())
}
