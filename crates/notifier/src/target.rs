//! Webhook target configuration as seen by the notifier.
//!
//! Targets are owned by external configuration storage. The notifier receives
//! an immutable snapshot per event and never mutates it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{EventKind, TargetName};

/// Timeout applied when a target does not configure one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// A declarative condition over a lifecycle event.
///
/// A rule with no `status` matches every event of its `kind`. The status is
/// kept as configured text and compared case-insensitively with the event's
/// canonical status name (e.g. `"failure"` matches `FAILURE`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Rule {
    /// Rule matching every "started" event.
    pub fn started() -> Self {
        Self {
            kind: EventKind::Started,
            status: None,
        }
    }

    /// Rule matching "completed" events, optionally only with `status`.
    pub fn completed(status: Option<&str>) -> Self {
        Self {
            kind: EventKind::Completed,
            status: status.map(str::to_string),
        }
    }
}

// ---------------------------------------------------------------------------
// Status gate
// ---------------------------------------------------------------------------

/// Coarse per-outcome switches: does this target report on an outcome at all.
///
/// Evaluated independently of, and combined with AND against, the detailed
/// [`Rule`] set. Every switch defaults to `true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusGate {
    pub notify_success: bool,
    pub notify_back_to_normal: bool,
    pub notify_failure: bool,
    pub notify_repeated_failure: bool,
    pub notify_unstable: bool,
    pub notify_aborted: bool,
    pub notify_not_built: bool,
}

impl Default for StatusGate {
    fn default() -> Self {
        Self::all()
    }
}

impl StatusGate {
    /// Gate that passes every outcome.
    pub fn all() -> Self {
        Self {
            notify_success: true,
            notify_back_to_normal: true,
            notify_failure: true,
            notify_repeated_failure: true,
            notify_unstable: true,
            notify_aborted: true,
            notify_not_built: true,
        }
    }

    /// Gate that passes no outcome.
    pub fn none() -> Self {
        Self {
            notify_success: false,
            notify_back_to_normal: false,
            notify_failure: false,
            notify_repeated_failure: false,
            notify_unstable: false,
            notify_aborted: false,
            notify_not_built: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Custom messages
// ---------------------------------------------------------------------------

/// A user-defined fact appended to every card sent to a target.
///
/// `value` is a template expanded against the host environment at
/// notification time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomMessageSpec {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

impl CustomMessageSpec {
    /// Creates a spec; absent parts normalize to empty strings.
    pub fn new(name: Option<impl Into<String>>, value: Option<impl Into<String>>) -> Self {
        Self {
            name: name.map(Into::into).unwrap_or_default(),
            value: value.map(Into::into).unwrap_or_default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unexpanded value template.
    pub fn value(&self) -> &str {
        &self.value
    }
}

// ---------------------------------------------------------------------------
// Target
// ---------------------------------------------------------------------------

/// One configured outbound webhook destination.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// Name used in log lines.
    pub name: TargetName,
    /// Destination URL; may contain environment placeholders.
    pub url: String,
    /// Upper bound for one delivery attempt.
    pub timeout: Duration,
    /// Whether "started" events are reported at all.
    pub notify_on_start: bool,
    /// Outcome switches for "completed" events.
    pub status_gate: StatusGate,
    /// Detailed rules; all must match. Empty means no additional filtering.
    pub rules: Vec<Rule>,
    /// Extra facts appended to every card, in order.
    pub custom_messages: Vec<CustomMessageSpec>,
}

impl Target {
    /// Creates a target with default settings.
    pub fn new(name: TargetName, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
            timeout: DEFAULT_TIMEOUT,
            notify_on_start: false,
            status_gate: StatusGate::default(),
            rules: Vec::new(),
            custom_messages: Vec::new(),
        }
    }

    /// Ad-hoc target for a manual message sent to an explicit URL.
    ///
    /// Returns `None` if `url` is blank.
    pub fn synthesized(url: &str) -> Option<Self> {
        let url = url.trim();
        TargetName::new(url).map(|name| Self::new(name, url))
    }
}
