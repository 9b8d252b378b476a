//! `build-notifier.toml` loading and validation.
//!
//! ```toml
//! [dispatch]
//! max_concurrent = 8
//! default_timeout_ms = 30000
//!
//! [[jobs]]
//! name = "nightly"
//!
//! [[jobs.targets]]
//! name = "team-channel"
//! url = "https://hooks.example/${HOOK_TOKEN}"
//! timeout_ms = 5000
//! notify_on_start = true
//! status_gate = { notify_success = false }
//! rules = [{ kind = "completed", status = "failure" }]
//! custom_messages = [{ name = "Branch", value = "${GIT_BRANCH}" }]
//! ```
//!
//! A missing file is not an error: it simply configures no targets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notifier::{CustomMessageSpec, JobName, Rule, StatusGate, Target, TargetName, TargetSource};
use serde::Deserialize;
use thiserror::Error;
use webhook::DispatchSettings;

/// Configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotifierConfig {
    pub dispatch: DispatchSettings,
    pub jobs: Vec<JobConfig>,
}

/// Targets configured for one job.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
}

/// One webhook target as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetConfig {
    /// Defaults to the URL.
    #[serde(default)]
    pub name: Option<String>,
    pub url: String,
    /// Defaults to `[dispatch] default_timeout_ms`; zero also means default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub notify_on_start: bool,
    #[serde(default)]
    pub status_gate: StatusGate,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub custom_messages: Vec<CustomMessageSpec>,
}

impl NotifierConfig {
    /// Loads the file at `path`, or the empty configuration if it does not exist.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] or [`ConfigError::Parse`] for an unreadable or
    /// malformed file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file; no targets configured");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses configuration text.
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Validates job and target entries and indexes them by job.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] for a blank job name or target URL.
    pub fn target_source(&self) -> Result<ConfiguredTargets, ConfigError> {
        let default_timeout = self.dispatch.default_timeout();
        let mut jobs: HashMap<JobName, Vec<Target>> = HashMap::new();
        for job in &self.jobs {
            let name = JobName::new(job.name.trim()).ok_or_else(|| ConfigError::Invalid {
                message: "job with an empty name".to_string(),
            })?;
            let targets = job
                .targets
                .iter()
                .map(|t| t.to_target(&name, default_timeout))
                .collect::<Result<Vec<_>, _>>()?;
            jobs.entry(name).or_default().extend(targets);
        }
        Ok(ConfiguredTargets { jobs })
    }
}

impl TargetConfig {
    fn to_target(
        &self,
        job: &JobName,
        default_timeout: Duration,
    ) -> Result<Target, ConfigError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(ConfigError::Invalid {
                message: format!("target without a URL in job '{job}'"),
            });
        }
        let name = self
            .name
            .as_deref()
            .map(str::trim)
            .and_then(TargetName::new)
            .or_else(|| TargetName::new(url))
            .ok_or_else(|| ConfigError::Invalid {
                message: format!("unnamed target in job '{job}'"),
            })?;

        let mut target = Target::new(name, url);
        target.timeout = self
            .timeout_ms
            .filter(|ms| *ms > 0)
            .map_or(default_timeout, Duration::from_millis);
        target.notify_on_start = self.notify_on_start;
        target.status_gate = self.status_gate;
        target.rules = self.rules.clone();
        target.custom_messages = self.custom_messages.clone();
        Ok(target)
    }
}

/// Validated, immutable per-job target lists.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTargets {
    jobs: HashMap<JobName, Vec<Target>>,
}

impl TargetSource for ConfiguredTargets {
    fn targets(&self, job: &JobName) -> Vec<Target> {
        self.jobs.get(job).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use notifier::{EventKind, DEFAULT_TIMEOUT};

    use super::*;

    const SAMPLE: &str = r#"
        [dispatch]
        max_concurrent = 2

        [[jobs]]
        name = "nightly"

        [[jobs.targets]]
        name = "team"
        url = "https://hooks.example/${TOKEN}"
        timeout_ms = 5000
        notify_on_start = true
        status_gate = { notify_success = false }
        rules = [{ kind = "completed", status = "failure" }, { kind = "completed" }]
        custom_messages = [{ name = "Branch", value = "${GIT_BRANCH}" }, { value = "no name" }]

        [[jobs.targets]]
        url = "https://other.example"
    "#;

    fn job(name: &str) -> JobName {
        JobName::new(name).unwrap()
    }

    #[test]
    fn parses_full_configuration() {
        let config = NotifierConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.dispatch.max_concurrent, 2);
        assert_eq!(config.dispatch.default_timeout_ms, 30_000);

        let targets = config.target_source().unwrap().targets(&job("nightly"));
        assert_eq!(targets.len(), 2);

        let team = &targets[0];
        assert_eq!(team.name.as_str(), "team");
        assert_eq!(team.timeout, Duration::from_millis(5000));
        assert!(team.notify_on_start);
        assert!(!team.status_gate.notify_success);
        assert!(team.status_gate.notify_failure);
        assert_eq!(team.rules.len(), 2);
        assert_eq!(team.rules[0].kind, EventKind::Completed);
        assert_eq!(team.rules[0].status.as_deref(), Some("failure"));
        assert_eq!(team.rules[1].status, None);
        assert_eq!(team.custom_messages[1].name(), "");

        let other = &targets[1];
        assert_eq!(other.name.as_str(), "https://other.example");
        assert_eq!(other.timeout, DEFAULT_TIMEOUT);
        assert!(!other.notify_on_start);
    }

    #[test]
    fn targets_without_timeout_use_the_dispatch_default() {
        let config = NotifierConfig::parse(
            r#"
            [dispatch]
            default_timeout_ms = 2000

            [[jobs]]
            name = "nightly"

            [[jobs.targets]]
            url = "https://a.example"

            [[jobs.targets]]
            url = "https://b.example"
            timeout_ms = 0

            [[jobs.targets]]
            url = "https://c.example"
            timeout_ms = 500
            "#,
        )
        .unwrap();

        let targets = config.target_source().unwrap().targets(&job("nightly"));
        let timeouts: Vec<_> = targets.iter().map(|t| t.timeout).collect();
        assert_eq!(
            timeouts,
            [
                Duration::from_secs(2),
                Duration::from_secs(2),
                Duration::from_millis(500),
            ]
        );
    }

    #[test]
    fn unknown_job_has_no_targets() {
        let config = NotifierConfig::parse(SAMPLE).unwrap();
        assert!(config.target_source().unwrap().targets(&job("other")).is_empty());
    }

    #[test]
    fn blank_url_is_rejected() {
        let config = NotifierConfig::parse(
            r#"
            [[jobs]]
            name = "nightly"
            [[jobs.targets]]
            url = "  "
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.target_source(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(NotifierConfig::parse("retries = 3\n").is_err());
    }

    #[test]
    fn missing_file_means_no_targets() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotifierConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert!(config.jobs.is_empty());
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[jobs]\nname = ").unwrap();

        let err = NotifierConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }
}
