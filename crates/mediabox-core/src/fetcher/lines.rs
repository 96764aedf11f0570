//! Classification of downloader output lines.

/// Prefix the downloader is told to print before each item's download,
/// followed by the item title.
pub(super) const TITLE_MARKER: &str = "[title] ";

/// Which output stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Stream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum LineKind {
    Title(String),
    Info(String),
    Warning(String),
    Error(String),
    Skip,
}

pub(super) fn classify_line(stream: Stream, line: &str) -> LineKind {
    let line = line.trim_end();
    if line.trim().is_empty() || line.starts_with("[debug] ") {
        return LineKind::Skip;
    }
    if stream == Stream::Stdout {
        if let Some(title) = line.strip_prefix(TITLE_MARKER) {
            return LineKind::Title(title.trim().to_string());
        }
    }
    if line.starts_with("WARNING:") {
        LineKind::Warning(line.to_string())
    } else if line.starts_with("ERROR:") {
        LineKind::Error(line.to_string())
    } else {
        LineKind::Info(line.to_string())
    }
}
