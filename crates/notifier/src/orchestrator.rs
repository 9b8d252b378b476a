//! Coordinates one lifecycle event across every configured target.
//!
//! Each event is handled in a single pass: fetch targets, gate them, build a
//! card per qualifying target, expand its URL, and dispatch all of them
//! concurrently. No failure escapes: the result is a [`NotificationReport`]
//! that callers may log or ignore, and the triggering build is never affected.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::ports::{BuildHost, DeliveryRequest, DeliveryResult, Dispatcher, TargetSource};
use crate::rules::{should_notify, LifecycleEvent};
use crate::{
    BuildStatus, Card, CardBuilder, DeliveryFailure, Environment, NotificationRunId,
    NotifierError, Target,
};

/// Prefix of every line the notifier writes to the build log.
pub const LOG_TAG: &str = "[BuildNotifier]";

/// On-demand message request, e.g. from a scripted "notify now" step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualMessage {
    /// Message text; when blank, a started or completed card is sent instead.
    pub text: String,
    /// Destination used only when the job has no configured targets.
    pub url: Option<String>,
    /// Free-text status; `"started"` selects the started card.
    pub status: Option<String>,
    /// Explicit theme color (hex RGB).
    pub color: Option<String>,
}

/// What happened to each dispatch for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationReport {
    pub run_id: NotificationRunId,
    pub results: Vec<DeliveryResult>,
}

impl NotificationReport {
    fn empty(run_id: NotificationRunId) -> Self {
        Self {
            run_id,
            results: Vec::new(),
        }
    }

    /// Number of dispatch attempts made.
    pub fn attempted(&self) -> usize {
        self.results.len()
    }

    pub fn delivered(&self) -> usize {
        self.results.iter().filter(|r| r.is_delivered()).count()
    }

    pub fn failed(&self) -> usize {
        self.attempted() - self.delivered()
    }
}

/// The notification pipeline for one build run.
#[derive(Clone)]
pub struct Notifier {
    host: Arc<dyn BuildHost>,
    targets: Arc<dyn TargetSource>,
    dispatcher: Arc<dyn Dispatcher>,
}

impl Notifier {
    pub fn new(
        host: Arc<dyn BuildHost>,
        targets: Arc<dyn TargetSource>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            host,
            targets,
            dispatcher,
        }
    }

    /// Handles a "build started" event raised from either build phase.
    ///
    /// Only the phase matching the job's kind produces notifications, so
    /// every run reports "started" exactly once.
    pub async fn on_start(&self, is_pre_build_phase: bool) -> NotificationReport {
        let run_id = NotificationRunId::new_random();
        let span = info_span!("notify", %run_id, event = "started", pre_build = is_pre_build_phase);

        async {
            let targets = self.configured_targets();
            if targets.is_empty() {
                return NotificationReport::empty(run_id);
            }
            if !self.host.job_kind().fires_started_from(is_pre_build_phase) {
                debug!("started event ignored for this build phase");
                return NotificationReport::empty(run_id);
            }

            let env = self.environment();
            let snapshot = self.host.snapshot();
            let builder = CardBuilder::new(&snapshot, &env);

            let requests = targets
                .iter()
                .filter(|t| should_notify(t, LifecycleEvent::Started))
                .map(|t| self.prepare(t, &builder.started(&t.custom_messages), &env))
                .collect();

            self.dispatch_all(run_id, requests).await
        }
        .instrument(span)
        .await
    }

    /// Handles a "build completed" event.
    pub async fn on_complete(&self) -> NotificationReport {
        let run_id = NotificationRunId::new_random();
        let span = info_span!("notify", %run_id, event = "completed");

        async {
            let targets = self.configured_targets();
            if targets.is_empty() {
                return NotificationReport::empty(run_id);
            }

            let env = self.environment();
            let snapshot = self.host.snapshot();
            let builder = CardBuilder::new(&snapshot, &env);
            let event = LifecycleEvent::Completed {
                status: snapshot.status,
                previous: snapshot.previous_status,
            };

            let requests = targets
                .iter()
                .filter(|t| should_notify(t, event))
                .map(|t| self.prepare(t, &builder.completed(&t.custom_messages), &env))
                .collect();

            self.dispatch_all(run_id, requests).await
        }
        .instrument(span)
        .await
    }

    /// Sends an on-demand message, bypassing rules and status gates.
    ///
    /// Goes to every configured target; when none are configured, to a
    /// single target synthesized from `message.url`.
    pub async fn on_custom_message(&self, message: &ManualMessage) -> NotificationReport {
        let run_id = NotificationRunId::new_random();
        let span = info_span!("notify", %run_id, event = "message");

        async {
            let mut targets = self.configured_targets();
            if targets.is_empty() {
                match message.url.as_deref().and_then(Target::synthesized) {
                    Some(target) => targets.push(target),
                    None => {
                        info!("no webhook configured and no URL given; message not sent");
                        return NotificationReport::empty(run_id);
                    }
                }
            }

            let env = self.environment();
            let snapshot = self.host.snapshot();
            let builder = CardBuilder::new(&snapshot, &env);
            let card = manual_card(&builder, message);

            let requests = targets
                .iter()
                .map(|t| self.prepare(t, &card, &env))
                .collect();

            self.dispatch_all(run_id, requests).await
        }
        .instrument(span)
        .await
    }

    fn configured_targets(&self) -> Vec<Target> {
        let job = self.host.job_name();
        let targets = self.targets.targets(&job);
        if targets.is_empty() {
            let reason = NotifierError::ConfigMissing {
                job: job.to_string(),
            };
            debug!(%reason, "nothing to notify");
        }
        targets
    }

    fn environment(&self) -> Environment {
        match self.host.environment() {
            Ok(env) => env,
            Err(err) => {
                let err = NotifierError::from(err);
                warn!(error = %err, "continuing with an empty environment");
                self.host
                    .log_line(&format!("{LOG_TAG} {err}; placeholders will not be expanded"));
                Environment::new()
            }
        }
    }

    /// Expands the target URL and serializes the card.
    ///
    /// A failure here becomes the target's result without a dispatch.
    fn prepare(
        &self,
        target: &Target,
        card: &Card,
        env: &Environment,
    ) -> Result<DeliveryRequest, DeliveryResult> {
        let (url, err) = env.expand_lossy(&target.url);
        if let Some(source) = err {
            let err = NotifierError::TemplateExpansion {
                template: target.url.clone(),
                source,
            };
            warn!(target = %target.name, error = %err, "webhook URL left unexpanded");
        }

        let payload = card.to_json_bytes().map_err(|e| {
            DeliveryResult::failed(
                target.name.clone(),
                DeliveryFailure::Serialization {
                    message: e.to_string(),
                },
            )
        })?;

        Ok(DeliveryRequest {
            target: target.name.clone(),
            url,
            payload,
            timeout: target.timeout,
        })
    }

    async fn dispatch_all(
        &self,
        run_id: NotificationRunId,
        prepared: Vec<Result<DeliveryRequest, DeliveryResult>>,
    ) -> NotificationReport {
        let mut results = Vec::with_capacity(prepared.len());
        let mut requests = Vec::with_capacity(prepared.len());
        for item in prepared {
            match item {
                Ok(request) => requests.push(request),
                Err(result) => results.push(result),
            }
        }

        debug!(count = requests.len(), "dispatching");
        results.extend(join_all(requests.into_iter().map(|r| self.dispatcher.deliver(r))).await);

        for result in &results {
            if let Some(failure) = result.failure() {
                let err = NotifierError::Delivery {
                    target: result.target.to_string(),
                    failure: failure.clone(),
                };
                warn!(error = %err, "delivery failed");
                self.host.log_line(&format!(
                    "{LOG_TAG} Failed to notify webhook: {} ({failure})",
                    result.target
                ));
            }
        }

        let report = NotificationReport { run_id, results };
        info!(
            attempted = report.attempted(),
            delivered = report.delivered(),
            failed = report.failed(),
            "notification pass finished"
        );
        report
    }
}

fn manual_card(builder: &CardBuilder<'_>, message: &ManualMessage) -> Card {
    let status = message.status.as_deref().map(str::trim);
    if !message.text.trim().is_empty() {
        return builder.message(&message.text, status, message.color.as_deref());
    }
    match status {
        Some(s) if s.eq_ignore_ascii_case("started") => builder.started(&[]),
        Some(s) => match BuildStatus::parse(s) {
            Some(explicit) => builder.completed_as(explicit),
            None => builder.completed(&[]),
        },
        None => builder.completed(&[]),
    }
}
