//! Server-side tasks that turn a worker's output streams into events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc::UnboundedSender;

use super::CRASH_MESSAGE;
use crate::event::ProgressEvent;

/// Decode worker stdout until EOF. Lines that are not events are forwarded
/// as `Info`. If the stream ends without a completion event and no stop is
/// in progress, the worker died: report it and complete the job.
pub(super) async fn pump_events<R>(
    stdout: R,
    events: UnboundedSender<ProgressEvent>,
    stopping: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut completed = false;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim_end();
                if line.trim().is_empty() {
                    continue;
                }
                let event = match ProgressEvent::from_line(line) {
                    Ok(ev) => ev,
                    Err(e) => {
                        tracing::trace!("non-event worker output ({}): {}", e, line);
                        ProgressEvent::info(line)
                    }
                };
                completed |= event.is_complete();
                if events.send(event).is_err() {
                    // Job dropped; nobody is listening anymore.
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("worker stdout read: {}", e);
                break;
            }
        }
    }
    if !completed && !stopping.load(Ordering::SeqCst) {
        tracing::warn!("{}", CRASH_MESSAGE);
        let _ = events.send(ProgressEvent::error(CRASH_MESSAGE));
        let _ = events.send(ProgressEvent::complete());
    }
}

/// Forward every non-empty stderr line as an `Error` event (panics, fatal
/// startup failures; the worker never logs there).
pub(super) async fn pump_stderr<R>(stderr: R, events: UnboundedSender<ProgressEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if events.send(ProgressEvent::error(line)).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::debug!("worker stderr read: {}", e);
                break;
            }
        }
    }
}
