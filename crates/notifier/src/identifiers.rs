//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`JobName`] with a [`TargetName`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed (configuration names)
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a job on the build host (e.g. `"nightly-release"`).
    ///
    /// Targets are looked up per job; the name also appears as a fact on every
    /// card.
    JobName
}

string_id! {
    /// Human-readable name of one configured webhook target.
    ///
    /// Used only for logging; it is never sent on the wire. Synthesized
    /// targets use their URL as the name.
    TargetName
}

// ---------------------------------------------------------------------------
// Identifiers — integer-backed
// ---------------------------------------------------------------------------

/// Sequential build number assigned by the host for one run of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildNumber(u64);

impl BuildNumber {
    /// Creates a build number from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for BuildNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one pass of the notifier over a single lifecycle event.
///
/// Generated fresh for every event; propagated through tracing spans so all
/// deliveries fanned out from one event can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationRunId(Uuid);

impl NotificationRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for NotificationRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        assert!(JobName::new("").is_none());
        assert!(TargetName::new(String::new()).is_none());
        assert_eq!(JobName::new("nightly").unwrap().as_str(), "nightly");
    }

    #[test]
    fn run_ids_are_unique() {
        assert_ne!(NotificationRunId::new_random(), NotificationRunId::new_random());
    }
}
