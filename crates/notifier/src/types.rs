//! Shared value types describing a build and its lifecycle.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaning the decision logic depends on: the closed set of build outcomes,
//! the outcome category derived from the current and previous result, and the
//! read-only snapshot of a run that cards are assembled from.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BuildNumber, JobName};

// ---------------------------------------------------------------------------
// Build status
// ---------------------------------------------------------------------------

/// Result of a completed build, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    /// The build finished without errors.
    Success,
    /// The build finished, but e.g. tests failed.
    Unstable,
    /// The build failed.
    Failure,
    /// The build was skipped (e.g. an upstream dependency failed).
    NotBuilt,
    /// The build was interrupted.
    Aborted,
}

impl BuildStatus {
    /// Canonical upper-case name, as used on the wire and in rule matching.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Unstable => "UNSTABLE",
            Self::Failure => "FAILURE",
            Self::NotBuilt => "NOT_BUILT",
            Self::Aborted => "ABORTED",
        }
    }

    /// Parses a status name case-insensitively.
    ///
    /// `"not built"`, `"not-built"` and `"not_built"` are all accepted.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().replace([' ', '-'], "_").to_ascii_uppercase();
        match normalized.as_str() {
            "SUCCESS" => Some(Self::Success),
            "UNSTABLE" => Some(Self::Unstable),
            "FAILURE" => Some(Self::Failure),
            "NOT_BUILT" => Some(Self::NotBuilt),
            "ABORTED" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------

/// Outcome category of a completed build, taking the previous build into account.
///
/// Drives both the status gate and the visual treatment of completed cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompletedOutcome {
    /// Success following a success (or no previous build).
    Success,
    /// Success following a failure or an unstable build.
    BackToNormal,
    /// Failure following anything but a failure.
    Failure,
    /// Failure following a failure.
    RepeatedFailure,
    /// Unstable build.
    Unstable,
    /// Aborted build.
    Aborted,
    /// Build that was not run.
    NotBuilt,
}

impl CompletedOutcome {
    /// Classifies `current` given the previous build's status.
    ///
    /// A missing previous build counts as a success.
    pub fn classify(current: BuildStatus, previous: Option<BuildStatus>) -> Self {
        let previous = previous.unwrap_or(BuildStatus::Success);
        match current {
            BuildStatus::Success => match previous {
                BuildStatus::Failure | BuildStatus::Unstable => Self::BackToNormal,
                _ => Self::Success,
            },
            BuildStatus::Failure if previous == BuildStatus::Failure => Self::RepeatedFailure,
            BuildStatus::Failure => Self::Failure,
            BuildStatus::Unstable => Self::Unstable,
            BuildStatus::Aborted => Self::Aborted,
            BuildStatus::NotBuilt => Self::NotBuilt,
        }
    }

    /// Short human-readable label shown in the card's status fact.
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "Build Success",
            Self::BackToNormal => "Back to Normal",
            Self::Failure => "Build Failed",
            Self::RepeatedFailure => "Repeated Failure",
            Self::Unstable => "Build Unstable",
            Self::Aborted => "Build Aborted",
            Self::NotBuilt => "Not Built",
        }
    }

    /// Card theme color (hex RGB without `#`).
    pub fn theme_color(self) -> &'static str {
        match self {
            Self::Success | Self::BackToNormal => "2DC72D",
            Self::Failure | Self::RepeatedFailure => "E81123",
            Self::Unstable => "FFB900",
            Self::Aborted | Self::NotBuilt => "8A8886",
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

/// Kind of lifecycle event a rule can match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The build has started.
    Started,
    /// The build has completed.
    Completed,
}

/// Build-type distinction that decides when the "started" notification fires.
///
/// Freestyle builds report from the pre-build phase; pipeline runs have no
/// pre-build phase and report once the workspace is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Classic build with a pre-build phase.
    Freestyle,
    /// Scripted pipeline run.
    Pipeline,
}

impl JobKind {
    /// Returns `true` if a "started" event from the given phase is the one
    /// that should produce notifications for this kind of job.
    ///
    /// Exactly one of the two phases qualifies for every job kind.
    pub fn fires_started_from(self, is_pre_build_phase: bool) -> bool {
        match self {
            Self::Freestyle => is_pre_build_phase,
            Self::Pipeline => !is_pre_build_phase,
        }
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Build snapshot
// ---------------------------------------------------------------------------

/// Read-only view of one build run, supplied by the host.
///
/// Cards are built from this snapshot only, so the same snapshot always
/// yields the same card.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSnapshot {
    /// Job the build belongs to.
    pub job: JobName,
    /// Sequential number of this run.
    pub number: BuildNumber,
    /// Link to the run on the host, if it has one.
    pub url: Option<String>,
    /// When the run started.
    pub started_at: Timestamp,
    /// Wall-clock duration; `None` while the build is still running.
    pub duration: Option<Duration>,
    /// Result of this run; `None` until the build has completed.
    pub status: Option<BuildStatus>,
    /// Result of the previous run of the same job, if any.
    pub previous_status: Option<BuildStatus>,
    /// Human-readable trigger causes, in host order.
    pub causes: Vec<String>,
    /// One-line summaries of the changes included in the run.
    pub changes: Vec<String>,
    /// Authors of the included changes.
    pub culprits: Vec<String>,
}

impl BuildSnapshot {
    /// Creates a snapshot with only the mandatory identity fields set.
    pub fn new(job: JobName, number: BuildNumber, started_at: Timestamp) -> Self {
        Self {
            job,
            number,
            url: None,
            started_at,
            duration: None,
            status: None,
            previous_status: None,
            causes: Vec::new(),
            changes: Vec::new(),
            culprits: Vec::new(),
        }
    }

    /// Outcome category of the run, or `None` if it has no result yet.
    pub fn outcome(&self) -> Option<CompletedOutcome> {
        self.status
            .map(|status| CompletedOutcome::classify(status, self.previous_status))
    }
}

/// Formats a duration the way it is shown on cards, e.g. `"1 hr 2 min 3 sec"`.
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let (hours, minutes, seconds) = (total / 3600, (total % 3600) / 60, total % 60);
    let mut parts = Vec::new();
    if hours > 0 {
        parts.push(format!("{hours} hr"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes} min"));
    }
    if seconds > 0 || parts.is_empty() {
        parts.push(format!("{seconds} sec"));
    }
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("success", Some(BuildStatus::Success))]
    #[case("FAILURE", Some(BuildStatus::Failure))]
    #[case("Not Built", Some(BuildStatus::NotBuilt))]
    #[case("not-built", Some(BuildStatus::NotBuilt))]
    #[case(" aborted ", Some(BuildStatus::Aborted))]
    #[case("started", None)]
    fn parses_status_names(#[case] input: &str, #[case] expected: Option<BuildStatus>) {
        assert_eq!(BuildStatus::parse(input), expected);
    }

    #[rstest]
    #[case(BuildStatus::Success, None, CompletedOutcome::Success)]
    #[case(BuildStatus::Success, Some(BuildStatus::Failure), CompletedOutcome::BackToNormal)]
    #[case(BuildStatus::Success, Some(BuildStatus::Unstable), CompletedOutcome::BackToNormal)]
    #[case(BuildStatus::Success, Some(BuildStatus::Aborted), CompletedOutcome::Success)]
    #[case(BuildStatus::Failure, None, CompletedOutcome::Failure)]
    #[case(BuildStatus::Failure, Some(BuildStatus::Failure), CompletedOutcome::RepeatedFailure)]
    #[case(BuildStatus::Unstable, Some(BuildStatus::Failure), CompletedOutcome::Unstable)]
    fn classifies_outcomes(
        #[case] current: BuildStatus,
        #[case] previous: Option<BuildStatus>,
        #[case] expected: CompletedOutcome,
    ) {
        assert_eq!(CompletedOutcome::classify(current, previous), expected);
    }

    #[test]
    fn exactly_one_phase_fires_started() {
        for kind in [JobKind::Freestyle, JobKind::Pipeline] {
            let fired = [true, false]
                .into_iter()
                .filter(|pre| kind.fires_started_from(*pre))
                .count();
            assert_eq!(fired, 1, "{kind:?}");
        }
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(Duration::from_secs(0)), "0 sec");
        assert_eq!(format_duration(Duration::from_secs(61)), "1 min 1 sec");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1 hr");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1 hr 2 min 3 sec");
    }
}
