use std::path::PathBuf;
use std::time::SystemTime;

use cron::Schedule;
use indexmap::IndexMap;
use serde::Deserialize;
use tracing::info;
use verdant_workers::{Params, Worker, WorkerRegistry};

use crate::error::{ConfigError, Result};
use crate::schedule::parse_cron;

/// One configured job: a cron schedule bound to a worker instance.
///
/// `next_run` is epoch seconds, unset until the scheduler first sees the
/// job, and recomputed after every execution attempt.
pub struct JobSpec {
    pub id: String,
    pub cron_expr: String,
    pub schedule: Schedule,
    pub worker: Box<dyn Worker>,
    pub next_run: Option<i64>,
}

/// Raw jobs-file entry. Fields stay optional so validation can name the
/// missing one instead of surfacing a serde parse error.
#[derive(Deserialize)]
struct JobEntry {
    run_at: Option<String>,
    class: Option<String>,
    #[serde(default)]
    params: Params,
}

/// Loads and hot-reloads the jobs file.
///
/// The file maps job id to `{"run_at": <cron>, "class": <worker>, "params": {}}`,
/// and entry order is the execution order within a tick. Reload is
/// all-or-nothing: any invalid entry rejects the whole file and the prior
/// job set stays active.
pub struct JobRegistry {
    path: PathBuf,
    workers: WorkerRegistry,
    last_modified: Option<SystemTime>,
    jobs: Vec<JobSpec>,
}

impl JobRegistry {
    pub fn new(path: impl Into<PathBuf>, workers: WorkerRegistry) -> Self {
        Self {
            path: path.into(),
            workers,
            last_modified: None,
            jobs: Vec::new(),
        }
    }

    /// Reload the jobs file if its mtime advanced since the last successful
    /// load. Returns `Ok(true)` when a new set was installed.
    ///
    /// `next_run` carries over for jobs whose id and cron expression are
    /// unchanged; a changed expression resets it so the new schedule takes
    /// effect on the next tick.
    pub fn reload_if_changed(&mut self) -> Result<bool> {
        let modified = std::fs::metadata(&self.path)?.modified()?;
        if self.last_modified.is_some_and(|prev| modified <= prev) {
            return Ok(false);
        }

        let mut jobs = self.parse()?;
        for job in &mut jobs {
            if let Some(prev) = self
                .jobs
                .iter()
                .find(|p| p.id == job.id && p.cron_expr == job.cron_expr)
            {
                job.next_run = prev.next_run;
            }
        }

        info!(path = %self.path.display(), jobs = jobs.len(), "job configuration loaded");
        self.jobs = jobs;
        self.last_modified = Some(modified);
        Ok(true)
    }

    /// Currently active jobs in configuration order.
    pub fn jobs(&self) -> &[JobSpec] {
        &self.jobs
    }

    pub(crate) fn jobs_mut(&mut self) -> &mut [JobSpec] {
        &mut self.jobs
    }

    fn parse(&self) -> Result<Vec<JobSpec>> {
        let raw = std::fs::read_to_string(&self.path)?;
        let entries: IndexMap<String, JobEntry> = serde_json::from_str(&raw)?;

        let mut jobs = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            let run_at = entry.run_at.ok_or_else(|| ConfigError::MissingField {
                job: id.clone(),
                field: "run_at",
            })?;
            let class = entry.class.ok_or_else(|| ConfigError::MissingField {
                job: id.clone(),
                field: "class",
            })?;
            let schedule = parse_cron(&run_at).map_err(|source| ConfigError::InvalidCron {
                job: id.clone(),
                expr: run_at.clone(),
                source,
            })?;
            let worker = self
                .workers
                .build(&class, &entry.params)
                .map_err(|source| ConfigError::Worker {
                    job: id.clone(),
                    source,
                })?;
            jobs.push(JobSpec {
                id,
                cron_expr: run_at,
                schedule,
                worker,
                next_run: None,
            });
        }
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::UNIX_EPOCH;

    fn write_jobs(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("jobs.json");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    fn registry(path: &PathBuf) -> JobRegistry {
        JobRegistry::new(path.clone(), WorkerRegistry::with_builtins())
    }

    #[test]
    fn loads_jobs_in_file_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(
            &dir,
            r#"{
                "zulu": {"run_at": "* * * * *", "class": "Fixed", "params": {"value": 1}},
                "alpha": {"run_at": "*/5 * * * *", "class": "Fixed", "params": {"value": 2}}
            }"#,
        );
        let mut registry = registry(&path);
        assert!(registry.reload_if_changed().unwrap());
        let ids: Vec<_> = registry.jobs().iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["zulu", "alpha"]);
    }

    #[test]
    fn unchanged_mtime_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(
            &dir,
            r#"{"a": {"run_at": "* * * * *", "class": "Fixed", "params": {"value": 1}}}"#,
        );
        let mut registry = registry(&path);
        assert!(registry.reload_if_changed().unwrap());
        assert!(!registry.reload_if_changed().unwrap());
    }

    #[test]
    fn missing_field_names_the_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(&dir, r#"{"a": {"run_at": "* * * * *"}}"#);
        let mut registry = registry(&path);
        match registry.reload_if_changed() {
            Err(ConfigError::MissingField { job, field }) => {
                assert_eq!(job, "a");
                assert_eq!(field, "class");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn invalid_cron_rejects_reload_and_keeps_prior_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(
            &dir,
            r#"{"a": {"run_at": "* * * * *", "class": "Fixed", "params": {"value": 1}}}"#,
        );
        let mut registry = registry(&path);
        assert!(registry.reload_if_changed().unwrap());

        write_jobs(
            &dir,
            r#"{
                "a": {"run_at": "* * * * *", "class": "Fixed", "params": {"value": 1}},
                "b": {"run_at": "99 99 * * *", "class": "Fixed", "params": {"value": 2}}
            }"#,
        );
        // Force the mtime gate open; fs timestamp granularity is too coarse
        // for back-to-back writes in a test.
        registry.last_modified = Some(UNIX_EPOCH);

        assert!(matches!(
            registry.reload_if_changed(),
            Err(ConfigError::InvalidCron { .. })
        ));
        assert_eq!(registry.jobs().len(), 1);
        assert_eq!(registry.jobs()[0].id, "a");
    }

    #[test]
    fn unknown_worker_class_rejects_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(
            &dir,
            r#"{"a": {"run_at": "* * * * *", "class": "Bme9000", "params": {}}}"#,
        );
        let mut registry = registry(&path);
        assert!(matches!(
            registry.reload_if_changed(),
            Err(ConfigError::Worker { .. })
        ));
        assert!(registry.jobs().is_empty());
    }

    #[test]
    fn changed_cron_resets_next_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_jobs(
            &dir,
            r#"{"a": {"run_at": "* * * * *", "class": "Fixed", "params": {"value": 1}}}"#,
        );
        let mut registry = registry(&path);
        registry.reload_if_changed().unwrap();
        registry.jobs_mut()[0].next_run = Some(1_700_000_000);

        write_jobs(
            &dir,
            r#"{"a": {"run_at": "*/5 * * * *", "class": "Fixed", "params": {"value": 1}}}"#,
        );
        registry.last_modified = Some(UNIX_EPOCH);
        registry.reload_if_changed().unwrap();
        assert_eq!(registry.jobs()[0].next_run, None);

        // Same expression keeps the pending occurrence.
        write_jobs(
            &dir,
            r#"{"a": {"run_at": "*/5 * * * *", "class": "Fixed", "params": {"value": 3}}}"#,
        );
        registry.jobs_mut()[0].next_run = Some(1_700_000_300);
        registry.last_modified = Some(UNIX_EPOCH);
        registry.reload_if_changed().unwrap();
        assert_eq!(registry.jobs()[0].next_run, Some(1_700_000_300));
    }
}
