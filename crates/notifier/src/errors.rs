//! Error types for the notifier domain.
//!
//! Nothing in this crate propagates an error to the triggering build: every
//! failure below is caught by the orchestrator, logged, and confined to the
//! event or target it occurred for. The types exist so that each failure is
//! described precisely in the build log and in tracing output.
//!
//! [`NotifierError`] is the umbrella used for logging. Component-level errors
//! ([`TemplateError`], [`EnvironmentError`], [`DeliveryFailure`]) are produced
//! by the component that detects them.

use std::time::Duration;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Component errors
// ---------------------------------------------------------------------------

/// A placeholder template could not be expanded.
///
/// Degrades to the literal template text; never aborts a notification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A `${` placeholder has no closing `}`.
    #[error("unterminated placeholder at offset {offset}")]
    Unterminated {
        /// Byte offset of the `$` that opened the placeholder.
        offset: usize,
    },

    /// A `${}` placeholder names no variable.
    #[error("empty placeholder at offset {offset}")]
    EmptyName {
        /// Byte offset of the `$` that opened the placeholder.
        offset: usize,
    },
}

/// The host could not provide its environment snapshot.
///
/// Notification proceeds with an empty environment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("environment unavailable: {reason}")]
pub struct EnvironmentError {
    /// Human-readable description from the host.
    pub reason: String,
}

impl EnvironmentError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Why a single delivery attempt failed.
///
/// Every variant is per-target and non-fatal to the build and to sibling
/// targets. There is no retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryFailure {
    /// The target did not answer within its timeout.
    #[error("timed out after {}ms", .after.as_millis())]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },

    /// The request could not be sent or the connection broke.
    #[error("connection error: {message}")]
    Connection {
        /// Transport-level description.
        message: String,
    },

    /// The shared worker pool was saturated; the attempt was rejected without
    /// being queued.
    #[error("rejected: all {limit} dispatch workers busy")]
    RejectedCapacity {
        /// Size of the worker pool.
        limit: usize,
    },

    /// The target answered with a non-success HTTP status.
    #[error("target responded with HTTP {status}")]
    Status {
        /// HTTP status code returned by the target.
        status: u16,
    },

    /// The card could not be serialized to the wire format.
    #[error("payload serialization failed: {message}")]
    Serialization {
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Umbrella
// ---------------------------------------------------------------------------

/// Every failure kind the notifier can log.
///
/// [`NotifierError::ConfigMissing`] is not reported as a failure; the
/// orchestrator treats it as a silent no-op.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifierError {
    /// No targets are configured for the job.
    #[error("no webhook targets configured for job '{job}'")]
    ConfigMissing {
        /// Job whose configuration was looked up.
        job: String,
    },

    /// See [`EnvironmentError`].
    #[error(transparent)]
    EnvironmentUnavailable(#[from] EnvironmentError),

    /// A template for a fact or URL failed to expand.
    #[error("failed to expand '{template}': {source}")]
    TemplateExpansion {
        /// The template text that was left unexpanded.
        template: String,
        /// The underlying expansion error.
        #[source]
        source: TemplateError,
    },

    /// A delivery to one target failed.
    #[error("failed to notify webhook '{target}': {failure}")]
    Delivery {
        /// Name of the target.
        target: String,
        /// What went wrong.
        failure: DeliveryFailure,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failures_render_reasons() {
        let err = NotifierError::Delivery {
            target: "ops".to_string(),
            failure: DeliveryFailure::Timeout {
                after: Duration::from_millis(250),
            },
        };
        assert_eq!(
            err.to_string(),
            "failed to notify webhook 'ops': timed out after 250ms"
        );
        assert_eq!(
            DeliveryFailure::RejectedCapacity { limit: 4 }.to_string(),
            "rejected: all 4 dispatch workers busy"
        );
    }

    #[test]
    fn template_errors_keep_their_source() {
        use std::error::Error as _;

        let err = NotifierError::TemplateExpansion {
            template: "${X".to_string(),
            source: TemplateError::Unterminated { offset: 0 },
        };
        assert!(err.source().is_some());
    }
}
