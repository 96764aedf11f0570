//! Progress aggregation: drain every job's queued events into its status
//! record and produce the snapshot served to polling clients.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::event::ProgressEvent;
use crate::job::Job;
use crate::progress_line::ProgressLineParser;
use crate::registry::JobRegistry;
use crate::status::JobStatus;

/// `source_id → status` in registry order. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressSnapshot {
    entries: Vec<(String, JobStatus)>,
}

impl ProgressSnapshot {
    pub fn get(&self, source_id: &str) -> Option<&JobStatus> {
        self.entries
            .iter()
            .find(|(id, _)| id == source_id)
            .map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &JobStatus)> {
        self.entries.iter().map(|(id, s)| (id.as_str(), s))
    }
}

impl Serialize for ProgressSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, status) in &self.entries {
            map.serialize_entry(id, status)?;
        }
        map.end()
    }
}

fn log_event(source_id: &str, event: &ProgressEvent) {
    match event {
        ProgressEvent::Info { text } if !text.starts_with("[download]") => {
            tracing::info!(source_id, "{}", text)
        }
        ProgressEvent::Warning { text } => tracing::warn!(source_id, "{}", text),
        ProgressEvent::Error { text } => tracing::error!(source_id, "{}", text),
        ProgressEvent::StateChange { .. } => tracing::info!(source_id, "job complete"),
        _ => {}
    }
}

/// Fold every event currently queued for `job`, in production order.
/// Never waits. Returns the number of events folded.
pub fn drain_job(job: &mut Job, parser: &dyn ProgressLineParser) -> usize {
    let mut n = 0;
    while let Some(event) = job.try_next_event() {
        log_event(job.source_id(), &event);
        job.status_mut().apply(&event, parser);
        n += 1;
    }
    job.reap_finished_worker();
    n
}

/// Drain all jobs and snapshot their status records.
pub fn collect(registry: &mut JobRegistry, parser: &dyn ProgressLineParser) -> ProgressSnapshot {
    let entries = registry
        .iter_mut()
        .map(|job| {
            drain_job(job, parser);
            (job.source_id().to_string(), job.status().clone())
        })
        .collect();
    ProgressSnapshot { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress_line::PercentToken;
    use crate::request::DownloadRequest;
    use crate::status::JobState;

    #[test]
    fn folds_queued_events_per_job() {
        let mut reg = JobRegistry::new();
        let a = Job::detached(DownloadRequest::new("a", "/tmp"));
        a.push_event(ProgressEvent::title("Clip A"));
        a.push_event(ProgressEvent::info("download 45.2% of 10MB"));
        a.push_event(ProgressEvent::warning("WARNING: retrying"));
        let b = Job::detached(DownloadRequest::new("b", "/tmp"));
        b.push_event(ProgressEvent::error("ERROR: gone"));
        b.push_event(ProgressEvent::complete());
        reg.insert(a).ok().unwrap();
        reg.insert(b).ok().unwrap();

        let snap = collect(&mut reg, &PercentToken);
        assert_eq!(snap.len(), 2);
        let a = snap.get("a").unwrap();
        assert_eq!(a.title, "Clip A");
        assert_eq!(a.progress, 45.2);
        assert_eq!(a.error, "WARNING: retrying");
        assert_eq!(a.state, JobState::Start);
        let b = snap.get("b").unwrap();
        assert_eq!(b.state, JobState::Complete);
        assert_eq!(b.error, "ERROR: gone");

        // Nothing new queued: a second poll changes nothing.
        assert_eq!(collect(&mut reg, &PercentToken), snap);
    }

    #[test]
    fn error_text_only_grows() {
        let mut job = Job::detached(DownloadRequest::new("a", "/tmp"));
        let mut last = String::new();
        for text in ["WARNING: one", "ERROR: two", "WARNING: three"] {
            job.push_event(ProgressEvent::info("noise"));
            job.push_event(ProgressEvent::warning(text));
            drain_job(&mut job, &PercentToken);
            let now = job.status().error.clone();
            assert!(now.starts_with(&last));
            assert!(now.len() > last.len());
            last = now;
        }
    }

    #[test]
    fn snapshot_serializes_as_ordered_object() {
        let mut reg = JobRegistry::new();
        for id in ["zeta", "alpha"] {
            reg.insert(Job::detached(DownloadRequest::new(id, "/tmp")))
                .ok()
                .unwrap();
        }
        let json = serde_json::to_string(&collect(&mut reg, &PercentToken)).unwrap();
        let zeta = json.find("\"zeta\"").unwrap();
        let alpha = json.find("\"alpha\"").unwrap();
        assert!(zeta < alpha);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["alpha"]["info"], "initializing");
    }
}
