//! `mediabox worker`: one download, reported as progress events on stdout.

use anyhow::Result;
use mediabox_core::config::MediaboxConfig;
use mediabox_core::fetcher::YtDlp;
use mediabox_core::format_spec::FormatSpec;
use mediabox_core::request::DownloadRequest;
use mediabox_core::worker;
use std::path::PathBuf;

pub fn run_worker(
    cfg: &MediaboxConfig,
    source: String,
    dir: PathBuf,
    format: Option<String>,
    items: Option<String>,
) -> Result<()> {
    let request = DownloadRequest::new(source, dir)
        .with_format(FormatSpec::new(format.unwrap_or_default()))
        .with_item_range(items.unwrap_or_default());
    let fetcher = YtDlp::from_config(&cfg.downloader);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let ok = worker::run(&fetcher, &request, &mut out);
    // The outcome already went out as events; the exit status is not read.
    tracing::info!(source_id = %request.source_id, ok, "worker finished");
    Ok(())
}
