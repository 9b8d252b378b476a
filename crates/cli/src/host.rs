//! [`BuildHost`] backed by the invoking process.
//!
//! Build attributes come from the command line (with the usual CI
//! environment variables as fallbacks), the environment snapshot is the
//! process environment, and the build log is standard output.

use std::time::Duration;

use notifier::{
    BuildHost, BuildNumber, BuildSnapshot, BuildStatus, Environment, EnvironmentError, JobKind,
    JobName, Timestamp,
};
use tracing::debug;

/// The build this process was invoked for.
#[derive(Debug, Clone)]
pub struct ProcessHost {
    kind: JobKind,
    snapshot: BuildSnapshot,
}

impl ProcessHost {
    pub fn new(job: JobName, number: BuildNumber, kind: JobKind, started_at: Timestamp) -> Self {
        Self {
            kind,
            snapshot: BuildSnapshot::new(job, number, started_at),
        }
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.snapshot.url = url.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn with_result(
        mut self,
        status: Option<BuildStatus>,
        previous: Option<BuildStatus>,
        duration: Option<Duration>,
    ) -> Self {
        self.snapshot.status = status;
        self.snapshot.previous_status = previous;
        self.snapshot.duration = duration;
        self
    }

    pub fn with_context(
        mut self,
        causes: Vec<String>,
        changes: Vec<String>,
        culprits: Vec<String>,
    ) -> Self {
        self.snapshot.causes = causes;
        self.snapshot.changes = changes;
        self.snapshot.culprits = culprits;
        self
    }
}

impl BuildHost for ProcessHost {
    fn job_name(&self) -> JobName {
        self.snapshot.job.clone()
    }

    fn job_kind(&self) -> JobKind {
        self.kind
    }

    fn snapshot(&self) -> BuildSnapshot {
        self.snapshot.clone()
    }

    fn environment(&self) -> Result<Environment, EnvironmentError> {
        let mut skipped = 0usize;
        let env: Environment = std::env::vars_os()
            .filter_map(|(k, v)| match (k.into_string(), v.into_string()) {
                (Ok(k), Ok(v)) => Some((k, v)),
                _ => {
                    skipped += 1;
                    None
                }
            })
            .collect();
        if skipped > 0 {
            debug!(skipped, "ignored non-UTF-8 environment variables");
        }
        Ok(env)
    }

    fn log_line(&self, line: &str) {
        println!("{line}");
    }
}
