//! Task controller: turns start/stop/stop_all/clear actions into registry
//! operations and response codes.
//!
//! The registry sits behind one async mutex. Every action and every poll
//! takes it, so concurrent requests for the same source are serialized and
//! the one-job-per-source invariant holds.

use std::path::Path;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::aggregator::{self, ProgressSnapshot};
use crate::error::{TaskError, TaskResponse};
use crate::job::Job;
use crate::progress_line::{PercentToken, ProgressLineParser};
use crate::registry::JobRegistry;
use crate::request::DownloadRequest;
use crate::status::JobState;
use crate::worker::WorkerCommand;

/// Action requested by a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Start,
    Stop,
    StopAll,
    Clear,
}

impl std::str::FromStr for TaskAction {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "start" => Ok(TaskAction::Start),
            "stop" => Ok(TaskAction::Stop),
            "stop_all" => Ok(TaskAction::StopAll),
            "clear" => Ok(TaskAction::Clear),
            other => Err(TaskError::UnknownAction(other.to_string())),
        }
    }
}

/// True if `dir` exists, is a directory and this process may create files in it.
pub fn is_usable_output_dir(dir: &Path) -> bool {
    match std::fs::metadata(dir) {
        Ok(meta) => meta.is_dir() && is_writable(dir, &meta),
        Err(_) => false,
    }
}

#[cfg(unix)]
fn is_writable(dir: &Path, _meta: &std::fs::Metadata) -> bool {
    use std::os::unix::ffi::OsStrExt;

    let Ok(path) = std::ffi::CString::new(dir.as_os_str().as_bytes()) else {
        return false;
    };
    // access(2) checks ownership and ACLs against the real uid.
    unsafe { libc::access(path.as_ptr(), libc::W_OK | libc::X_OK) == 0 }
}

#[cfg(not(unix))]
fn is_writable(_dir: &Path, meta: &std::fs::Metadata) -> bool {
    !meta.permissions().readonly()
}

/// Owns the job registry for the lifetime of the server.
pub struct Controller {
    registry: Mutex<JobRegistry>,
    command: WorkerCommand,
    stop_grace: Duration,
    parser: Box<dyn ProgressLineParser>,
}

impl Controller {
    pub fn new(command: WorkerCommand, stop_grace: Duration) -> Self {
        Self {
            registry: Mutex::new(JobRegistry::new()),
            command,
            stop_grace,
            parser: Box::new(PercentToken),
        }
    }

    /// Replace the percent parser used when folding info lines.
    pub fn with_parser(mut self, parser: impl ProgressLineParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn stop_grace(&self) -> Duration {
        self.stop_grace
    }

    /// Start a new job, or act on the existing one for the same source.
    pub async fn start(&self, request: DownloadRequest) -> Result<(), TaskError> {
        if request.source_id.trim().is_empty() {
            return Err(TaskError::MissingSource);
        }
        if !is_usable_output_dir(&request.output_dir) {
            return Err(TaskError::InvalidOutputDirectory(request.output_dir));
        }
        let mut registry = self.registry.lock().await;
        if let Some(job) = registry.get_mut(&request.source_id) {
            return match job.state() {
                JobState::Start => Err(TaskError::AlreadyRunning(job.describe())),
                JobState::Complete => Err(TaskError::AlreadyComplete(job.describe())),
                JobState::Stop => job.restart(&self.command),
            };
        }

        tracing::info!(
            source_id = %request.source_id,
            format = %request.format,
            dir = %request.output_dir.display(),
            items = %request.item_range,
            "starting job"
        );
        let job = Job::start(request, &self.command)?;
        if let Err(job) = registry.insert(job) {
            // Unreachable while the lock is held; keep the invariant anyway.
            return Err(TaskError::AlreadyRunning(job.describe()));
        }
        Ok(())
    }

    /// Terminate the worker of a running job. Queued events are folded
    /// first, so a job whose worker already reported completion is not
    /// mistaken for a running one.
    pub async fn stop(&self, source_id: &str) -> Result<(), TaskError> {
        let mut registry = self.registry.lock().await;
        let job = registry
            .get_mut(source_id)
            .ok_or_else(|| TaskError::UnknownJob(source_id.to_string()))?;
        aggregator::drain_job(job, self.parser.as_ref());
        job.stop(self.stop_grace).await
    }

    /// Stop every running job. Returns the individual failures.
    pub async fn stop_all(&self) -> Vec<TaskError> {
        let mut registry = self.registry.lock().await;
        let mut failures = Vec::new();
        for job in registry.iter_mut() {
            aggregator::drain_job(job, self.parser.as_ref());
            if job.state() != JobState::Start {
                continue;
            }
            if let Err(e) = job.stop(self.stop_grace).await {
                failures.push(e);
            }
        }
        failures
    }

    /// Drop every job that is not running. Returns how many were removed.
    pub async fn clear(&self) -> usize {
        let removed = self.registry.lock().await.clear_finished();
        tracing::debug!(removed, "cleared finished jobs");
        removed
    }

    /// Drain all pending worker events and snapshot every job.
    pub async fn progress(&self) -> ProgressSnapshot {
        let mut registry = self.registry.lock().await;
        aggregator::collect(&mut registry, self.parser.as_ref())
    }

    /// Run `f` against the registry under the controller's lock.
    pub async fn with_registry<T>(&self, f: impl FnOnce(&JobRegistry) -> T) -> T {
        let registry = self.registry.lock().await;
        f(&registry)
    }

    /// Dispatch one client action. `request` is only consulted by `start`
    /// (whole request) and `stop` (source id).
    pub async fn dispatch(&self, action: TaskAction, request: DownloadRequest) -> TaskResponse {
        let source_id = request.source_id.clone();
        let response = match action {
            TaskAction::Start => self.start(request).await.into(),
            TaskAction::Stop => self.stop(&source_id).await.into(),
            TaskAction::StopAll => TaskResponse::from_failures(&self.stop_all().await),
            TaskAction::Clear => {
                self.clear().await;
                TaskResponse::ok()
            }
        };
        tracing::info!(
            ?action,
            source_id = %source_id,
            code = response.code,
            message = %response.message,
            "task action"
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> Controller {
        Controller::new(
            WorkerCommand::new("/nonexistent/mediabox-worker", vec![]),
            Duration::from_millis(50),
        )
    }

    #[test]
    fn parse_actions() {
        assert_eq!("start".parse::<TaskAction>().unwrap(), TaskAction::Start);
        assert_eq!("stop_all".parse::<TaskAction>().unwrap(), TaskAction::StopAll);
        assert_eq!(" clear ".parse::<TaskAction>().unwrap(), TaskAction::Clear);
        assert_eq!("pause".parse::<TaskAction>().unwrap_err().code(), 205);
    }

    #[test]
    fn output_dir_checks() {
        let dir = tempfile::tempdir().unwrap();
        assert!(is_usable_output_dir(dir.path()));
        assert!(!is_usable_output_dir(Path::new("/nonexistent/mediabox")));
        let file = dir.path().join("f.txt");
        std::fs::write(&file, b"x").unwrap();
        assert!(!is_usable_output_dir(&file));
    }

    #[cfg(unix)]
    #[test]
    fn unwritable_dir_is_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let locked = dir.path().join("locked");
        std::fs::create_dir(&locked).unwrap();
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o555)).unwrap();
        // Root may write anywhere; only a non-root run can see the rejection.
        if unsafe { libc::geteuid() } != 0 {
            assert!(!is_usable_output_dir(&locked));
        }
        std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();
        assert!(is_usable_output_dir(&locked));
    }

    #[tokio::test]
    async fn invalid_dir_creates_no_job() {
        let c = controller();
        let err = c
            .start(DownloadRequest::new("video1", "/nonexistent"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 201);
        assert_eq!(c.with_registry(|r| r.len()).await, 0);
    }

    #[tokio::test]
    async fn spawn_failure_creates_no_job() {
        let c = controller();
        let dir = tempfile::tempdir().unwrap();
        let err = c
            .start(DownloadRequest::new("video1", dir.path()))
            .await
            .unwrap_err();
        assert_eq!(err.code(), 204);
        assert_eq!(c.with_registry(|r| r.len()).await, 0);
    }

    #[tokio::test]
    async fn blank_source_creates_no_job() {
        let c = controller();
        let dir = tempfile::tempdir().unwrap();
        let resp = c
            .dispatch(TaskAction::Start, DownloadRequest::new("  ", dir.path()))
            .await;
        assert_eq!(resp.code, 206);
        assert_eq!(c.with_registry(|r| r.len()).await, 0);
    }

    #[tokio::test]
    async fn stop_folds_queued_completion_first() {
        let c = controller();
        let job = Job::detached(DownloadRequest::new("v1", "/tmp"));
        job.push_event(crate::event::ProgressEvent::complete());
        c.registry.lock().await.insert(job).ok().unwrap();

        let resp = c
            .dispatch(TaskAction::Stop, DownloadRequest::new("v1", "/tmp"))
            .await;
        assert_eq!(resp.code, 205);
        assert!(c.stop_all().await.is_empty());
        let snap = c.progress().await;
        assert_eq!(snap.get("v1").unwrap().state, JobState::Complete);
    }

    #[tokio::test]
    async fn stop_unknown_job() {
        let c = controller();
        let resp = c
            .dispatch(TaskAction::Stop, DownloadRequest::new("nope", "/tmp"))
            .await;
        assert_eq!(resp.code, 206);
        assert!(resp.message.contains("nope"));
    }

    struct Fraction;

    impl ProgressLineParser for Fraction {
        fn percent(&self, line: &str) -> Option<f64> {
            let (done, total) = line.split_once('/')?;
            let done: f64 = done.trim().parse().ok()?;
            let total: f64 = total.trim().parse().ok()?;
            (total > 0.0).then(|| done * 100.0 / total)
        }
    }

    #[tokio::test]
    async fn custom_parser_reads_info_lines() {
        let c = controller().with_parser(Fraction);
        let job = Job::detached(DownloadRequest::new("v1", "/tmp"));
        job.push_event(crate::event::ProgressEvent::info("3/4"));
        c.registry.lock().await.insert(job).ok().unwrap();

        let snap = c.progress().await;
        assert_eq!(snap.get("v1").unwrap().progress, 75.0);
    }

    #[tokio::test]
    async fn stop_all_and_clear_on_empty_registry() {
        let c = controller();
        let req = DownloadRequest::new("", "/tmp");
        assert!(c.dispatch(TaskAction::StopAll, req.clone()).await.is_ok());
        assert!(c.dispatch(TaskAction::Clear, req).await.is_ok());
        assert!(c.progress().await.is_empty());
    }
}
