//! `mediabox formats <url>`: print the negotiated format lists as JSON.

use anyhow::{Context, Result};
use mediabox_core::config::MediaboxConfig;
use mediabox_core::fetcher::YtDlp;
use mediabox_core::formats;

pub async fn run_formats(cfg: &MediaboxConfig, url: &str) -> Result<()> {
    let fetcher = YtDlp::from_config(&cfg.downloader);
    let source_id = url.to_string();
    let list = tokio::task::spawn_blocking(move || formats::negotiate(&fetcher, &source_id))
        .await
        .context("format probe task failed")?;
    if list.is_empty() {
        println!("No formats found for {url}.");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&list)?);
    Ok(())
}
