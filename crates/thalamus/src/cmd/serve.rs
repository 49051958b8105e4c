//! Serve command - run the pipeline runtime and RPC surface

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use thalamus_graph::{NodeRuntime, Registry};
use thalamus_server::{Server, ServerConfig, ServerState};

/// Arguments for the serve command
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Path to the pipeline document
    #[arg(short, long, default_value = "pipeline.json")]
    pub config: PathBuf,

    /// Listen address for the RPC surface
    #[arg(short, long, default_value = "127.0.0.1:50674")]
    pub address: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    pub log_level: String,
}

/// Run the pipeline until ctrl-c, then save the document back
pub async fn run(args: ServeArgs) -> Result<()> {
    let document = if args.config.exists() {
        thalamus_observable::load(&args.config)
            .with_context(|| format!("loading {}", args.config.display()))?
    } else {
        info!(path = %args.config.display(), "no document found, starting empty");
        thalamus_observable::empty()
    };

    let registry = Registry::with_builtins();
    let runtime = NodeRuntime::new(&document, registry).context("starting node runtime")?;
    let state = ServerState::new(document.clone(), runtime);

    let server = Server::new(
        std::sync::Arc::clone(&state),
        ServerConfig {
            address: args.address.clone(),
        },
    );
    let server_task = server.spawn();

    tokio::signal::ctrl_c()
        .await
        .context("waiting for ctrl-c")?;
    info!("shutting down");

    state.shutdown().await;
    let _ = server_task.await;

    if let Err(e) = thalamus_observable::save(&args.config, &document) {
        warn!(error = %e, "failed to save pipeline document");
    }

    Ok(())
}
