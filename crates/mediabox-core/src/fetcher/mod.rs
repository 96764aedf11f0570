//! The external download capability.
//!
//! Fetching and transcoding are delegated to a downloader program; this
//! module only defines the seam ([`MediaFetcher`]) and the `yt-dlp` driver
//! behind it.

mod lines;
mod ytdlp;

pub use ytdlp::YtDlp;

use crate::formats::FormatVariant;
use crate::request::DownloadRequest;
use crate::worker::EventStream;

/// Downloader failure, as seen from inside a worker or the format negotiator.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("downloader exited unsuccessfully (exit code {code:?})")]
    Exit { code: Option<i32> },

    #[error("downloader i/o: {0}")]
    Io(#[from] std::io::Error),

    #[error("unreadable format listing: {0}")]
    Listing(#[from] serde_json::Error),
}

/// "Given a source and a format selection, produce a file in a directory,
/// emitting progress events"; plus listing the variants a source offers.
pub trait MediaFetcher: Send + Sync {
    /// Download `request`, reporting through `events`. Blocks until done.
    fn fetch(
        &self,
        request: &DownloadRequest,
        events: &mut EventStream<'_>,
    ) -> Result<(), FetchError>;

    /// Every encoded variant the source offers.
    fn probe_formats(&self, source_id: &str) -> Result<Vec<FormatVariant>, FetchError>;
}
