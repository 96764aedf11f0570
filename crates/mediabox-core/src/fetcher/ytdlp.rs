//! `yt-dlp` driver.

use std::ffi::OsString;
use std::io::{BufRead, BufReader, Read};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;

use serde::Deserialize;

use super::lines::{classify_line, LineKind, Stream, TITLE_MARKER};
use super::{FetchError, MediaFetcher};
use crate::config::DownloaderConfig;
use crate::formats::FormatVariant;
use crate::request::DownloadRequest;
use crate::worker::EventStream;

/// Runs the `yt-dlp` program (or a compatible fork) as a child process.
#[derive(Debug, Clone)]
pub struct YtDlp {
    program: String,
    extra_args: Vec<String>,
}

impl YtDlp {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
        }
    }

    pub fn from_config(cfg: &DownloaderConfig) -> Self {
        Self {
            program: cfg.program.clone(),
            extra_args: cfg.extra_args.clone(),
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.extra_args);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> FetchError {
        FetchError::Spawn {
            program: self.program.clone(),
            source,
        }
    }

    /// Arguments for one download, in order.
    pub(crate) fn download_args(request: &DownloadRequest) -> Vec<OsString> {
        let template = request.output_dir.join("%(title)s.%(ext)s");
        let mut args: Vec<OsString> = vec![
            "--newline".into(),
            "--progress".into(),
            "--no-simulate".into(),
            "--print".into(),
            format!("before_dl:{TITLE_MARKER}%(title)s").into(),
            "-o".into(),
            template.into_os_string(),
        ];
        if !request.format.is_default() {
            args.push("-f".into());
            args.push(request.format.as_str().into());
        }
        if !request.item_range.trim().is_empty() {
            args.push("--playlist-items".into());
            args.push(request.item_range.trim().into());
        }
        args.push("--".into());
        args.push(request.source_id.clone().into());
        args
    }
}

/// Forward each line of `input` to `tx`, tagged with its stream.
fn spawn_line_reader<R>(
    input: R,
    stream: Stream,
    tx: mpsc::Sender<(Stream, String)>,
) -> thread::JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(input);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::debug!(?stream, "downloader output read: {}", e);
                    break;
                }
            }
        }
    })
}

impl MediaFetcher for YtDlp {
    fn fetch(
        &self,
        request: &DownloadRequest,
        events: &mut EventStream<'_>,
    ) -> Result<(), FetchError> {
        let mut child = self
            .command()
            .args(Self::download_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(spawn_line_reader(out, Stream::Stdout, tx.clone()));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(spawn_line_reader(err, Stream::Stderr, tx.clone()));
        }
        drop(tx);

        for (stream, line) in rx {
            match classify_line(stream, &line) {
                LineKind::Title(t) => events.title(t),
                LineKind::Info(t) => events.info(t),
                LineKind::Warning(t) => events.warning(t),
                LineKind::Error(t) => events.error(t),
                LineKind::Skip => {}
            }
        }
        for r in readers {
            let _ = r.join();
        }

        let status = child.wait()?;
        if status.success() {
            Ok(())
        } else {
            Err(FetchError::Exit {
                code: status.code(),
            })
        }
    }

    fn probe_formats(&self, source_id: &str) -> Result<Vec<FormatVariant>, FetchError> {
        let output = self
            .command()
            .args(["-J", "--flat-playlist", "--no-warnings", "--", source_id])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            tracing::debug!(
                source_id,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "format probe failed"
            );
            return Err(FetchError::Exit {
                code: output.status.code(),
            });
        }
        parse_info_json(&output.stdout)
    }
}

#[derive(Deserialize)]
struct InfoJson {
    #[serde(default)]
    formats: Option<Vec<FormatVariant>>,
}

/// Extract the `formats` array from the downloader's info JSON. Sources
/// without one (flat playlists) yield no variants.
pub(crate) fn parse_info_json(data: &[u8]) -> Result<Vec<FormatVariant>, FetchError> {
    let info: InfoJson = serde_json::from_slice(data)?;
    Ok(info.formats.unwrap_or_default())
}
