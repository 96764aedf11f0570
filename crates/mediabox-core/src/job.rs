//! One tracked download: its request, status record, worker and the event
//! channel between them.

use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::error::TaskError;
use crate::event::ProgressEvent;
use crate::request::DownloadRequest;
use crate::status::{JobState, JobStatus};
use crate::worker::{WorkerCommand, WorkerHandle};

/// A job and its start/stop/restart state machine.
///
/// The event channel outlives individual workers: a restart hands the same
/// sender to the new process's reader, so the single consumer (the
/// aggregator) sees one FIFO stream per job.
pub struct Job {
    request: DownloadRequest,
    status: JobStatus,
    worker: Option<WorkerHandle>,
    events_tx: UnboundedSender<ProgressEvent>,
    events_rx: UnboundedReceiver<ProgressEvent>,
    spawn_count: u32,
}

impl Job {
    /// Create a job and launch its first worker. Must run inside a tokio runtime.
    pub fn start(request: DownloadRequest, command: &WorkerCommand) -> Result<Self, TaskError> {
        let mut job = Self::detached(request);
        let worker = command
            .spawn(&job.request, job.events_tx.clone())
            .map_err(|e| TaskError::SpawnFailed {
                source_id: job.request.source_id.clone(),
                reason: e.to_string(),
            })?;
        job.worker = Some(worker);
        job.spawn_count = 1;
        Ok(job)
    }

    /// A job with no worker attached, in the initial `Start` state.
    pub(crate) fn detached(request: DownloadRequest) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            request,
            status: JobStatus::default(),
            worker: None,
            events_tx,
            events_rx,
            spawn_count: 0,
        }
    }

    pub fn source_id(&self) -> &str {
        &self.request.source_id
    }

    pub fn request(&self) -> &DownloadRequest {
        &self.request
    }

    pub fn status(&self) -> &JobStatus {
        &self.status
    }

    pub fn state(&self) -> JobState {
        self.status.state
    }

    /// Pid of the current worker process, if one was launched.
    pub fn worker_pid(&self) -> Option<u32> {
        self.worker.as_ref().and_then(|w| w.pid())
    }

    /// Number of worker processes launched for this job so far.
    pub fn spawn_count(&self) -> u32 {
        self.spawn_count
    }

    /// Short human-readable description used in task messages.
    pub fn describe(&self) -> String {
        format!(
            "{} [{}] {}: {}",
            self.request.source_id, self.status.state, self.status.title, self.status.info
        )
    }

    /// `Stop` → `Start`: launch a fresh worker on the same channel.
    /// Status fields other than the state are kept as last observed.
    pub fn restart(&mut self, command: &WorkerCommand) -> Result<(), TaskError> {
        if self.status.state != JobState::Stop {
            return Err(TaskError::UnknownState(self.describe()));
        }
        if let Some(worker) = self.worker.as_mut() {
            if worker.is_alive() {
                return Err(TaskError::RestartFailed(self.describe()));
            }
        }
        let worker = command
            .spawn(&self.request, self.events_tx.clone())
            .map_err(|e| TaskError::RestartFailed(format!("{}: {}", self.describe(), e)))?;
        self.worker = Some(worker);
        self.spawn_count += 1;
        self.status.set_state(JobState::Start);
        tracing::info!(source_id = %self.request.source_id, spawns = self.spawn_count, "job restarted");
        Ok(())
    }

    /// `Start` → `Stop`: terminate the worker, waiting at most `grace` for
    /// it to die. If it survives, the job stays in `Start`.
    pub async fn stop(&mut self, grace: Duration) -> Result<(), TaskError> {
        if self.status.state != JobState::Start {
            return Err(TaskError::UnknownState(self.describe()));
        }
        let terminated = match self.worker.as_mut() {
            Some(worker) => worker.terminate(grace).await,
            None => true,
        };
        if !terminated {
            return Err(TaskError::StopFailed(self.describe()));
        }
        self.status.set_state(JobState::Stop);
        tracing::info!(source_id = %self.request.source_id, "job stopped");
        Ok(())
    }

    /// Next queued event, without waiting.
    pub(crate) fn try_next_event(&mut self) -> Option<ProgressEvent> {
        self.events_rx.try_recv().ok()
    }

    pub(crate) fn status_mut(&mut self) -> &mut JobStatus {
        &mut self.status
    }

    /// Drop the handle of a worker that has exited after completing.
    pub(crate) fn reap_finished_worker(&mut self) {
        if self.status.state != JobState::Complete {
            return;
        }
        if let Some(worker) = self.worker.as_mut() {
            if !worker.is_alive() {
                self.worker = None;
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn push_event(&self, event: ProgressEvent) {
        let _ = self.events_tx.send(event);
    }
}
