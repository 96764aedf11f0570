//! Worker-side event writer.

use std::io::Write;

use crate::event::ProgressEvent;
use crate::progress_line::ProgressLineParser;

/// Writes events as lines to the worker's stdout.
///
/// Enforces the worker half of the protocol: the title goes out once, and
/// an info line carrying a percentage is followed by a `Progress` event.
/// Write failures mean the server is gone; they are logged and otherwise
/// ignored, since the process group is about to be terminated anyway.
pub struct EventStream<'a> {
    out: &'a mut dyn Write,
    parser: &'a dyn ProgressLineParser,
    title: Option<String>,
    broken: bool,
}

impl<'a> EventStream<'a> {
    pub fn new(out: &'a mut dyn Write, parser: &'a dyn ProgressLineParser) -> Self {
        Self {
            out,
            parser,
            title: None,
            broken: false,
        }
    }

    pub fn emit(&mut self, event: ProgressEvent) {
        if self.broken {
            return;
        }
        let line = event.to_line();
        let result = writeln!(self.out, "{}", line).and_then(|_| self.out.flush());
        if let Err(e) = result {
            tracing::debug!("event channel closed: {}", e);
            self.broken = true;
        }
    }

    /// Report the source title. Later calls are ignored.
    pub fn title(&mut self, text: impl Into<String>) {
        if self.title.is_some() {
            return;
        }
        let text = text.into();
        self.title = Some(text.clone());
        self.emit(ProgressEvent::title(text));
    }

    pub fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        let percent = self.parser.percent(&text);
        self.emit(ProgressEvent::info(text));
        if let Some(p) = percent {
            self.emit(ProgressEvent::progress(p));
        }
    }

    pub fn warning(&mut self, text: impl Into<String>) {
        self.emit(ProgressEvent::warning(text));
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.emit(ProgressEvent::error(text));
    }

    pub fn current_title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_line::PercentToken;

    fn lines(buf: &[u8]) -> Vec<ProgressEvent> {
        String::from_utf8_lossy(buf)
            .lines()
            .map(|l| ProgressEvent::from_line(l).unwrap())
            .collect()
    }

    #[test]
    fn title_once_and_progress_follows_info() {
        let mut buf = Vec::new();
        {
            let mut s = EventStream::new(&mut buf, &PercentToken);
            s.title("First");
            s.title("Second");
            s.info("[download]  12.5% of 3MiB");
            s.info("[Merger] merging");
            assert_eq!(s.current_title(), Some("First"));
        }
        assert_eq!(
            lines(&buf),
            vec![
                ProgressEvent::title("First"),
                ProgressEvent::info("[download]  12.5% of 3MiB"),
                ProgressEvent::progress(12.5),
                ProgressEvent::info("[Merger] merging"),
            ]
        );
    }

    struct Closed;

    impl Write for Closed {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn closed_channel_is_not_fatal() {
        let mut out = Closed;
        let mut s = EventStream::new(&mut out, &PercentToken);
        s.info("a");
        s.error("b");
        assert!(s.broken);
    }
}
