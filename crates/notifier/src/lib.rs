//! Core notification domain for the build notifier.
//!
//! This crate decides which webhook targets hear about a build lifecycle
//! event, builds the card each of them receives, and fans the deliveries out
//! through the [`Dispatcher`] port. Infrastructure crates implement the port
//! traits defined here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`JobName`, `TargetName`, `BuildNumber`, ...) |
//! | [`types`] | Build status, outcome categories, build snapshot |
//! | [`card`] | The wire payload: `Card`, `Section`, `Fact`, `ActionLink` |
//! | [`environment`] | Environment snapshot and `$NAME` / `${NAME}` expansion |
//! | [`target`] | Target configuration: rules, status gate, custom messages |
//! | [`rules`] | The two-stage "should notify" decision |
//! | [`builder`] | Card assembly per lifecycle event |
//! | [`ports`] | `BuildHost`, `TargetSource`, `Dispatcher` |
//! | [`orchestrator`] | `Notifier`: one pass over all targets per event |
//! | [`errors`] | Error types |

pub mod builder;
pub mod card;
pub mod environment;
pub mod errors;
pub mod identifiers;
pub mod orchestrator;
pub mod ports;
pub mod rules;
pub mod target;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use builder::{CardBuilder, STARTED_THEME_COLOR};
pub use card::{ActionLink, Card, Fact, Section};
pub use environment::Environment;
pub use errors::{DeliveryFailure, EnvironmentError, NotifierError, TemplateError};
pub use identifiers::{BuildNumber, JobName, NotificationRunId, TargetName};
pub use orchestrator::{ManualMessage, NotificationReport, Notifier, LOG_TAG};
pub use ports::{BuildHost, DeliveryRequest, DeliveryResult, Dispatcher, TargetSource};
pub use rules::{should_notify, LifecycleEvent};
pub use target::{CustomMessageSpec, Rule, StatusGate, Target, DEFAULT_TIMEOUT};
pub use types::{
    format_duration, BuildSnapshot, BuildStatus, CompletedOutcome, EventKind, JobKind, Timestamp,
};
