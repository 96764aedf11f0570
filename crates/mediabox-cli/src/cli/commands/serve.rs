//! `mediabox serve`: run the HTTP server until Ctrl-C, then stop every job.

use anyhow::{Context, Result};
use mediabox_core::config::ConfigStore;
use mediabox_core::controller::Controller;
use mediabox_core::error::TaskResponse;
use mediabox_core::fetcher::YtDlp;
use mediabox_core::worker::WorkerCommand;
use std::sync::Arc;

use crate::cli::http::{self, AppState};

pub async fn run_serve(store: ConfigStore, bind: Option<String>) -> Result<()> {
    let cfg = store.config().clone();
    let addr = bind.unwrap_or_else(|| cfg.bind_addr.clone());
    let command =
        WorkerCommand::from_config(&cfg.worker).context("cannot locate worker executable")?;
    let controller = Arc::new(Controller::new(command, cfg.stop_grace()));
    let state = AppState::new(
        Arc::clone(&controller),
        store,
        Arc::new(YtDlp::from_config(&cfg.downloader)),
    );

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {addr}"))?;
    tracing::info!(addr = %addr, "mediabox listening");
    println!("mediabox listening on http://{addr}");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let response = TaskResponse::from_failures(&controller.stop_all().await);
    if response.is_ok() {
        tracing::info!("all jobs stopped");
    } else {
        tracing::warn!(code = response.code, "shutdown: {}", response.message);
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
