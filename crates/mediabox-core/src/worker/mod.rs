//! Worker processes: one OS process per running job.
//!
//! The server launches a worker (by default its own binary with the `worker`
//! subcommand) in its own process group. The worker writes one
//! [`ProgressEvent`](crate::event::ProgressEvent) per stdout line; a reader
//! task forwards them onto the job's channel. Stopping is always forceful:
//! SIGTERM to the process group, then a bounded wait.

mod reader;
mod run;
mod stream;

pub use run::run;
pub use stream::EventStream;

use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;

use crate::config::WorkerConfig;
use crate::event::ProgressEvent;
use crate::request::DownloadRequest;

/// Error text recorded when a worker's stdout closes before it reported
/// completion and nobody asked it to stop.
pub const CRASH_MESSAGE: &str = "worker exited before reporting completion";

/// How to launch a worker process. Request arguments are appended after
/// `args` (see [`DownloadRequest::to_worker_args`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The running executable's own `worker` subcommand.
    pub fn current_exe() -> io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?, vec!["worker".to_string()]))
    }

    /// Configured override, or [`WorkerCommand::current_exe`].
    pub fn from_config(cfg: &WorkerConfig) -> io::Result<Self> {
        match &cfg.program {
            Some(program) => Ok(Self::new(program.clone(), cfg.args.clone())),
            None => Self::current_exe(),
        }
    }

    /// Launch a worker for `request`; its events go to `events`.
    /// Returns as soon as the process is running.
    pub(crate) fn spawn(
        &self,
        request: &DownloadRequest,
        events: UnboundedSender<ProgressEvent>,
    ) -> io::Result<WorkerHandle> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .args(request.to_worker_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("worker stdout not captured"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("worker stderr not captured"))?;

        let stopping = Arc::new(AtomicBool::new(false));
        tokio::spawn(reader::pump_events(
            stdout,
            events.clone(),
            Arc::clone(&stopping),
        ));
        tokio::spawn(reader::pump_stderr(stderr, events));

        let pid = child.id();
        tracing::debug!(
            source_id = %request.source_id,
            pid = ?pid,
            program = %self.program.display(),
            "worker spawned"
        );
        Ok(WorkerHandle {
            child,
            pid,
            stopping,
        })
    }
}

/// A launched worker process.
pub(crate) struct WorkerHandle {
    child: Child,
    pid: Option<u32>,
    /// Set while a stop is in progress so the reader does not mistake the
    /// resulting EOF for a crash.
    stopping: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// True until the process has exited (and been reaped).
    pub(crate) fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Forcefully terminate the worker and wait up to `grace` for it to die.
    /// Returns true iff the process is confirmed gone.
    pub(crate) async fn terminate(&mut self, grace: Duration) -> bool {
        if !self.is_alive() {
            return true;
        }
        self.stopping.store(true, Ordering::SeqCst);
        self.signal_terminate();
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!(pid = ?self.pid, %status, "worker terminated");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(pid = ?self.pid, "waiting for worker failed: {}", e);
                self.stopping.store(false, Ordering::SeqCst);
                false
            }
            Err(_) => {
                tracing::warn!(pid = ?self.pid, ?grace, "worker still alive after grace period");
                self.stopping.store(false, Ordering::SeqCst);
                false
            }
        }
    }

    #[cfg(unix)]
    fn signal_terminate(&mut self) {
        if let Some(pid) = self.child.id() {
            // Negative pid: the whole process group, so the downloader and
            // its helpers go down with the worker.
            let r = unsafe { libc::kill(-(pid as libc::pid_t), libc::SIGTERM) };
            if r != 0 {
                tracing::debug!(pid, "kill(SIGTERM): {}", io::Error::last_os_error());
            }
        }
    }

    #[cfg(not(unix))]
    fn signal_terminate(&mut self) {
        if let Err(e) = self.child.start_kill() {
            tracing::debug!(pid = ?self.pid, "start_kill: {}", e);
        }
    }
}
