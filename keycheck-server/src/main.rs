//! Product key checker HTTP service.
//!
//! Usage:
//!   keycheck-server --port 5000 --catalog PKeyConfig/PkeyData.xml
//!
//! Validation needs the native PidGenX engine, so a working server is only
//! built on Windows with the `native` feature enabled.

use std::{path::PathBuf, sync::Arc};
use anyhow::{Context, Result};
use clap::Parser;
use keycheck_core::{CheckerConfig, ValidationEngine};
use keycheck_server::{AppState, build_router};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "keycheck-server")]
#[command(about = "Product key checker HTTP service")]
struct Args {
    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog of pkeyconfig files (overrides config)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Directory holding the pkeyconfig files (overrides config)
    #[arg(long)]
    config_dir: Option<PathBuf>,

    /// Batch activation endpoint (overrides config)
    #[arg(long)]
    activation_url: Option<String>,

    /// Activation request timeout in seconds (overrides config)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn checker_config(&self) -> Result<CheckerConfig> {
        let mut config = match &self.config {
            Some(path) => CheckerConfig::from_file(path)?,
            None => CheckerConfig::default(),
        };
        if let Some(catalog) = &self.catalog {
            config.catalog_path = catalog.clone();
        }
        if let Some(dir) = &self.config_dir {
            config.config_dir = dir.clone();
        }
        if let Some(url) = &self.activation_url {
            config.activation.endpoint = url.clone();
        }
        if let Some(secs) = self.timeout_secs {
            config.activation.timeout_secs = secs;
        }
        Ok(config)
    }
}

#[cfg(all(windows, feature = "native"))]
fn validation_engine() -> Result<Arc<dyn ValidationEngine>> {
    Ok(Arc::new(keycheck_core::engine::NativePidGen))
}

#[cfg(not(all(windows, feature = "native")))]
fn validation_engine() -> Result<Arc<dyn ValidationEngine>> {
    anyhow::bail!("built without the native PidGenX engine (enable the `native` feature on Windows)")
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    info!("Key checker starting...");
    let config = args.checker_config()?;

    let engine = validation_engine()?;
    let state = AppState::from_config(&config, engine).context("Failed to set up key checker")?;

    let app = build_router(Arc::new(state));
    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await.context("HTTP server failed")
}
