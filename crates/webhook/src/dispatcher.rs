//! Webhook dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notifier::{DeliveryFailure, DeliveryRequest, DeliveryResult, Dispatcher};
use reqwest::header::CONTENT_TYPE;
use reqwest::{redirect, Client};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::DispatchSettings;

const USER_AGENT: &str = concat!("build-notifier/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";

/// The dispatcher could not be constructed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Delivers cards over HTTP through a bounded worker pool.
///
/// Cheap to share behind an `Arc`; one instance serves every target.
#[derive(Debug)]
pub struct HttpDispatcher {
    client: Client,
    workers: Arc<Semaphore>,
    settings: DispatchSettings,
}

impl HttpDispatcher {
    /// Creates a dispatcher with its own HTTP client.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Client`] if the TLS backend cannot be initialised.
    pub fn new(settings: DispatchSettings) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::none())
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    /// Creates a dispatcher around an existing client.
    pub fn with_client(client: Client, settings: DispatchSettings) -> Self {
        Self {
            client,
            workers: Arc::new(Semaphore::new(settings.workers())),
            settings,
        }
    }

    /// Size of the worker pool.
    pub fn capacity(&self) -> usize {
        self.settings.workers()
    }

    /// Workers not currently running a delivery.
    pub fn available_workers(&self) -> usize {
        self.workers.available_permits()
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn deliver(&self, request: DeliveryRequest) -> DeliveryResult {
        let DeliveryRequest {
            target,
            url,
            payload,
            timeout,
        } = request;
        let timeout = if timeout.is_zero() {
            self.settings.default_timeout()
        } else {
            timeout
        };

        let Ok(permit) = Arc::clone(&self.workers).try_acquire_owned() else {
            warn!(%target, limit = self.capacity(), "dispatch pool saturated");
            return DeliveryResult::failed(
                target,
                DeliveryFailure::RejectedCapacity {
                    limit: self.capacity(),
                },
            );
        };

        let client = self.client.clone();
        let worker = tokio::spawn(async move {
            let _permit = permit;
            post(&client, &url, payload, timeout).await
        });

        let outcome = match worker.await {
            Ok(outcome) => outcome,
            Err(e) => Err(DeliveryFailure::Connection {
                message: format!("dispatch worker failed: {e}"),
            }),
        };

        match &outcome {
            Ok(status) => debug!(%target, status, "delivered"),
            Err(failure) => debug!(%target, %failure, "delivery failed"),
        }
        DeliveryResult { target, outcome }
    }
}

async fn post(
    client: &Client,
    url: &str,
    payload: Vec<u8>,
    timeout: Duration,
) -> Result<u16, DeliveryFailure> {
    let send = client
        .post(url)
        .header(CONTENT_TYPE, JSON)
        .timeout(timeout)
        .body(payload)
        .send();

    match tokio::time::timeout(timeout, send).await {
        Err(_) => Err(DeliveryFailure::Timeout { after: timeout }),
        Ok(Err(e)) if e.is_timeout() => Err(DeliveryFailure::Timeout { after: timeout }),
        Ok(Err(e)) => Err(DeliveryFailure::Connection {
            message: e.to_string(),
        }),
        Ok(Ok(response)) => {
            let status = response.status();
            if status.is_success() {
                Ok(status.as_u16())
            } else {
                Err(DeliveryFailure::Status {
                    status: status.as_u16(),
                })
            }
        }
    }
}
