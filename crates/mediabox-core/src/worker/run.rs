//! Body of a worker process.

use std::io::Write;

use super::EventStream;
use crate::event::ProgressEvent;
use crate::fetcher::MediaFetcher;
use crate::progress_line::PercentToken;
use crate::request::DownloadRequest;

/// Perform one download with `fetcher`, streaming events to `out`.
///
/// Always ends with a completion event: `Progress(100)` precedes it only on
/// success, an `Error` carrying the reason precedes it on failure. Returns
/// whether the download succeeded.
pub fn run(fetcher: &dyn MediaFetcher, request: &DownloadRequest, out: &mut dyn Write) -> bool {
    let parser = PercentToken;
    let mut events = EventStream::new(out, &parser);
    tracing::info!(
        source_id = %request.source_id,
        format = %request.format,
        dir = %request.output_dir.display(),
        "worker starting"
    );

    let result = fetcher.fetch(request, &mut events);
    let title = events
        .current_title()
        .unwrap_or(&request.source_id)
        .to_string();
    let ok = match result {
        Ok(()) => {
            events.emit(ProgressEvent::info(format!("Download completed: {title}")));
            events.emit(ProgressEvent::progress(100.0));
            true
        }
        Err(e) => {
            tracing::warn!(source_id = %request.source_id, "download failed: {}", e);
            events.emit(ProgressEvent::info(format!("Download failed: {title}")));
            events.error(e.to_string());
            false
        }
    };
    events.emit(ProgressEvent::complete());
    ok
}
