mod config;
mod tls;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use promfed_api::MetricsApi;
use promfed_core::{FederationEngine, MetricCache};
use promfed_observe::logger_init;
use promfed_upstream::HttpUpstream;

use crate::{
    config::{Cli, FileConfig},
    tls::TlsListener,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1) Config
    let cli = Cli::parse();
    let cfg = FileConfig::load(&cli.config).context("Error loading config")?;

    // 2) Logger
    logger_init(&cfg.logger_config())?;
    info!(config = %cli.config.display(), "logger initialized");

    // 3) Upstream client
    tls::install_crypto_provider();
    let upstream = HttpUpstream::new(&cfg.upstream_config())
        .context("Error when creating upstream client")?;
    info!(endpoint = %upstream.endpoint(), "upstream client ready");

    // 4) Engine: first discovery is fatal, then both loops run until cancelled
    let token = CancellationToken::new();
    let engine = FederationEngine::start(
        cfg.engine_config(),
        Arc::new(upstream),
        MetricCache::new(),
        token.clone(),
    )
    .await
    .context("Error when creating fetcher")?;
    info!(
        labels = engine.labels().len(),
        workers = cfg.workers(),
        "federation engine running"
    );

    tokio::spawn(shutdown_signal(token.clone()));

    // 5) Serve /metrics
    let app = MetricsApi::new(engine.cache().clone()).router();
    let addr = cfg.listen_addr();
    if cfg.enable_ssl {
        let server_tls = tls::server_config(&cfg.ssl_certificate, &cfg.ca_pool)?;
        let listener = TlsListener::bind(addr, server_tls)
            .await
            .with_context(|| format!("failed to listen on {addr}"))?;
        info!("Listen {addr} with tls ...");
        axum::serve(listener, app)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .await?;
    } else {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to listen on {addr}"))?;
        info!("Listen {addr} without tls ...");
        axum::serve(listener, app)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .await?;
    }

    // server can also stop on its own; make sure the loops follow
    token.cancel();
    engine.shutdown().await;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down...");
    token.cancel();
}
