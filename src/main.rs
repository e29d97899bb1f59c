//! Reverse proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌───────────────────────────────────────────────┐
//!                         │                 REVERSE PROXY                  │
//!     Client Request      │  ┌─────────┐   ┌──────────┐   ┌────────────┐  │
//!     ────────────────────┼─▶│  http   │──▶│  proxy   │──▶│    net     │──┼──▶ Upstream
//!                         │  │ server  │   │ pipeline │   │    pool    │  │
//!     Client Response     │  └─────────┘   └──────────┘   └────────────┘  │
//!     ◀───────────────────┼── relay / 302 / 502 / 504                     │
//!                         │                                               │
//!                         │  config · observability · resilience ·        │
//!                         │  security · lifecycle                         │
//!                         └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use drf_reverse_proxy::config::loader::load_config;
use drf_reverse_proxy::http::HttpServer;
use drf_reverse_proxy::lifecycle::{signals::spawn_signal_handler, Shutdown};
use drf_reverse_proxy::net::ConnectionPool;
use drf_reverse_proxy::observability::init_logging;

#[derive(Parser)]
#[command(name = "reverse-proxy")]
#[command(about = "Mount upstream HTTP services under local path prefixes", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "proxy.toml")]
    config: PathBuf,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    if cli.check {
        println!(
            "{}: OK ({} proxies)",
            cli.config.display(),
            config.proxies.len()
        );
        return Ok(());
    }

    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "reverse-proxy starting"
    );

    ConnectionPool::install(&config.timeouts);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    spawn_signal_handler(shutdown.clone());
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
