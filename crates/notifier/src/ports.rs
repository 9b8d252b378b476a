//! Port traits: the narrow capabilities the notifier needs from its host.
//!
//! ## Architectural Layer
//!
//! **Port definitions.** Infrastructure crates implement these traits; the
//! notifier never sees how. [`BuildHost`] and [`TargetSource`] are supplied by
//! the composition root (`cli`), [`Dispatcher`] by the `webhook` crate. Tests
//! use in-memory fakes.

use std::time::Duration;

use async_trait::async_trait;

use crate::{
    BuildSnapshot, DeliveryFailure, Environment, EnvironmentError, JobKind, JobName, Target,
    TargetName,
};

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// The running build the notifier reports on.
pub trait BuildHost: Send + Sync {
    /// Identity of the job being built.
    fn job_name(&self) -> JobName;

    /// Build-type distinction deciding which phase fires "started".
    fn job_kind(&self) -> JobKind;

    /// Current read-only view of the run.
    fn snapshot(&self) -> BuildSnapshot;

    /// Host environment variables for placeholder expansion.
    ///
    /// # Errors
    ///
    /// [`EnvironmentError`] if the host cannot produce the snapshot. The
    /// notifier continues with an empty environment.
    fn environment(&self) -> Result<Environment, EnvironmentError>;

    /// Appends one line to the build log.
    fn log_line(&self, line: &str);
}

/// Read-only source of per-job target configuration.
pub trait TargetSource: Send + Sync {
    /// Targets configured for `job`, in configuration order.
    ///
    /// An empty list means nothing is configured.
    fn targets(&self, job: &JobName) -> Vec<Target>;
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// One outbound delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRequest {
    /// Target the payload is for; used for logging only.
    pub target: TargetName,
    /// Fully expanded destination URL.
    pub url: String,
    /// Serialized card (JSON).
    pub payload: Vec<u8>,
    /// Upper bound for the attempt.
    pub timeout: Duration,
}

/// Outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResult {
    pub target: TargetName,
    pub outcome: Result<u16, DeliveryFailure>,
}

impl DeliveryResult {
    /// Successful delivery that received HTTP `status`.
    pub fn delivered(target: TargetName, status: u16) -> Self {
        Self {
            target,
            outcome: Ok(status),
        }
    }

    pub fn failed(target: TargetName, failure: DeliveryFailure) -> Self {
        Self {
            target,
            outcome: Err(failure),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure, if the attempt failed.
    pub fn failure(&self) -> Option<&DeliveryFailure> {
        self.outcome.as_ref().err()
    }
}

/// Performs bounded-time deliveries.
///
/// Implementations must never panic or block beyond `request.timeout`, and
/// must report every problem through the returned [`DeliveryResult`].
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Sends one payload to one URL. No retries.
    async fn deliver(&self, request: DeliveryRequest) -> DeliveryResult;
}
