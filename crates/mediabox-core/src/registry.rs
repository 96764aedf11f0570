//! In-memory collection of jobs, one per source identifier.

use crate::job::Job;
use crate::status::JobState;

/// Jobs in insertion order. Never holds two jobs with the same source id.
#[derive(Default)]
pub struct JobRegistry {
    jobs: Vec<Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn get(&self, source_id: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.source_id() == source_id)
    }

    pub fn get_mut(&mut self, source_id: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.source_id() == source_id)
    }

    /// Add a job. Hands it back if one with the same source id exists.
    pub fn insert(&mut self, job: Job) -> Result<(), Job> {
        if self.get(job.source_id()).is_some() {
            return Err(job);
        }
        self.jobs.push(job);
        Ok(())
    }

    /// Remove every job that is not running; returns how many were removed.
    pub fn clear_finished(&mut self) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| j.state() == JobState::Start);
        before - self.jobs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    /// Source ids of jobs currently in `state`, in insertion order.
    pub fn ids_in_state(&self, state: JobState) -> Vec<String> {
        self.jobs
            .iter()
            .filter(|j| j.state() == state)
            .map(|j| j.source_id().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DownloadRequest;
    use std::time::Duration;

    fn job(id: &str) -> Job {
        Job::detached(DownloadRequest::new(id, "/tmp"))
    }

    #[test]
    fn rejects_duplicate_source_ids() {
        let mut reg = JobRegistry::new();
        assert!(reg.insert(job("a")).is_ok());
        assert!(reg.insert(job("b")).is_ok());
        let dup = reg.insert(job("a")).err().unwrap();
        assert_eq!(dup.source_id(), "a");
        assert_eq!(reg.len(), 2);
    }

    #[tokio::test]
    async fn clear_keeps_running_jobs_in_order() {
        let mut reg = JobRegistry::new();
        for id in ["a", "b", "c", "d"] {
            reg.insert(job(id)).ok().unwrap();
        }
        reg.get_mut("a").unwrap().stop(Duration::ZERO).await.unwrap();
        reg.get_mut("c").unwrap().status_mut().set_state(JobState::Complete);

        assert_eq!(reg.clear_finished(), 2);
        let left: Vec<_> = reg.iter().map(|j| j.source_id().to_string()).collect();
        assert_eq!(left, vec!["b", "d"]);
        assert_eq!(reg.ids_in_state(JobState::Start), vec!["b", "d"]);
    }
}
