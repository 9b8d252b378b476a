//! Build notifier HTTP dispatch adapter.
//!
//! Implements the [`notifier::Dispatcher`] trait over `reqwest`. Each delivery
//! is a single JSON `POST` with no retries and no redirects, bounded by the
//! target's timeout.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, the worker pool and timeout handling
//! live here. The [`notifier`] crate sees only [`notifier::Dispatcher`].
//!
//! ## Worker pool
//!
//! All deliveries share one pool of `max_concurrent` workers. A delivery that
//! finds the pool saturated is rejected immediately with
//! [`notifier::DeliveryFailure::RejectedCapacity`]; it is never queued.
//! A worker is released when its delivery finishes, fails, times out, or
//! panics.

mod dispatcher;
mod settings;

pub use dispatcher::{DispatchError, HttpDispatcher};
pub use settings::DispatchSettings;
