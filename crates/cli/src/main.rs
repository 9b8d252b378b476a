//! Build notifier CLI entry point.
//!
//! This binary is the composition root for the entire system. Responsibilities:
//!
//! 1. **Parse configuration** — load `build-notifier.toml` and validate it.
//! 2. **Wire observability** — configure `tracing-subscriber` (text or JSON
//!    on stderr) and, when `OTEL_EXPORTER_OTLP_ENDPOINT` is set, an
//!    OpenTelemetry OTLP exporter. All `tracing` spans and structured events
//!    emitted by every crate in the workspace flow through this layer.
//! 3. **Construct infrastructure** — create the [`host::ProcessHost`], the
//!    configured target source, and the [`webhook::HttpDispatcher`], and
//!    inject them into a [`notifier::Notifier`].
//! 4. **Raise the event** — map the subcommand onto one lifecycle event:
//!    - `started` — `Notifier::on_start`, from the pre-build or post-setup phase.
//!    - `completed` — `Notifier::on_complete`.
//!    - `message` — `Notifier::on_custom_message`, the on-demand path.
//!
//! Notification failures are reported in the build log and never change the
//! exit status; only start-up errors (unreadable configuration, subscriber
//! installation) make the process fail.

mod config;
mod host;
mod observability;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use notifier::{
    BuildHost, BuildNumber, BuildStatus, JobKind, JobName, ManualMessage, Notifier, Timestamp,
    LOG_TAG,
};
use webhook::HttpDispatcher;

use crate::config::NotifierConfig;
use crate::host::ProcessHost;
use crate::observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "build-notifier", version, about = "Notify webhooks about build lifecycle events")]
struct Cli {
    /// Path to the configuration file.
    #[arg(long, env = "BUILD_NOTIFIER_CONFIG", default_value = "build-notifier.toml")]
    config: PathBuf,

    /// Format of diagnostic output on stderr.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(flatten)]
    build: BuildArgs,

    #[command(subcommand)]
    command: Command,
}

/// Identity and context of the build being reported on.
#[derive(Debug, Args)]
struct BuildArgs {
    /// Job name.
    #[arg(long, env = "JOB_NAME")]
    job: String,

    /// Build number.
    #[arg(long, env = "BUILD_NUMBER")]
    build_number: u64,

    /// Link to the build.
    #[arg(long, env = "BUILD_URL")]
    build_url: Option<String>,

    /// Kind of job; decides which phase reports "started".
    #[arg(long, value_enum, default_value_t = Kind::Pipeline)]
    job_kind: Kind,

    /// Build start time (RFC 3339); defaults to now.
    #[arg(long)]
    started_at: Option<DateTime<Utc>>,

    /// Trigger cause (repeatable).
    #[arg(long = "cause")]
    causes: Vec<String>,

    /// One-line change summary (repeatable).
    #[arg(long = "change")]
    changes: Vec<String>,

    /// Author of an included change (repeatable).
    #[arg(long = "culprit")]
    culprits: Vec<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Freestyle,
    Pipeline,
}

impl From<Kind> for JobKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Freestyle => JobKind::Freestyle,
            Kind::Pipeline => JobKind::Pipeline,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// The build has started.
    Started {
        /// Raised from the pre-build phase rather than after workspace setup.
        #[arg(long)]
        pre_build: bool,
    },
    /// The build has completed.
    Completed {
        /// Result of the build.
        #[arg(long, value_parser = parse_status)]
        status: BuildStatus,
        /// Result of the previous build of the job.
        #[arg(long, value_parser = parse_status)]
        previous_status: Option<BuildStatus>,
        /// Build duration in seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Send a message now, to every configured target or to `--url`.
    Message {
        /// Message text; when omitted a started or completed card is sent.
        #[arg(long, default_value = "")]
        text: String,
        /// Webhook URL used when the job has no configured targets.
        #[arg(long)]
        url: Option<String>,
        /// Free-text status; `started` selects the started card.
        #[arg(long)]
        status: Option<String>,
        /// Theme color (hex RGB).
        #[arg(long)]
        color: Option<String>,
    },
}

fn parse_status(value: &str) -> Result<BuildStatus, String> {
    BuildStatus::parse(value).ok_or_else(|| {
        format!("unknown status '{value}' (expected success, unstable, failure, not_built, aborted)")
    })
}

fn build_host(args: &BuildArgs, command: &Command) -> anyhow::Result<ProcessHost> {
    let job = JobName::new(args.job.trim()).context("job name must not be empty")?;
    let started_at = args
        .started_at
        .map_or_else(Timestamp::now, Timestamp::from_utc);

    let host = ProcessHost::new(
        job,
        BuildNumber::new(args.build_number),
        args.job_kind.into(),
        started_at,
    )
    .with_url(args.build_url.clone())
    .with_context(args.causes.clone(), args.changes.clone(), args.culprits.clone());

    Ok(match command {
        Command::Completed {
            status,
            previous_status,
            duration_secs,
        } => host.with_result(
            Some(*status),
            *previous_status,
            duration_secs.map(Duration::from_secs),
        ),
        _ => host,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let telemetry = observability::init(cli.log_format)?;

    let config = NotifierConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let targets = config.target_source()?;
    let dispatcher = HttpDispatcher::new(config.dispatch.clone())
        .context("failed to initialise the webhook dispatcher")?;
    let host = Arc::new(build_host(&cli.build, &cli.command)?);

    let notifier = Notifier::new(host.clone(), Arc::new(targets), Arc::new(dispatcher));

    let report = match cli.command {
        Command::Started { pre_build } => notifier.on_start(pre_build).await,
        Command::Completed { .. } => notifier.on_complete().await,
        Command::Message {
            text,
            url,
            status,
            color,
        } => {
            notifier
                .on_custom_message(&ManualMessage {
                    text,
                    url,
                    status,
                    color,
                })
                .await
        }
    };

    if report.attempted() > 0 {
        host.log_line(&format!(
            "{LOG_TAG} Notified {} of {} webhook(s)",
            report.delivered(),
            report.attempted()
        ));
    }

    telemetry.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn completed_command_sets_the_result() {
        let cli = Cli::try_parse_from([
            "build-notifier",
            "--job",
            "nightly",
            "--build-number",
            "12",
            "--cause",
            "Started by timer",
            "completed",
            "--status",
            "Failure",
            "--previous-status",
            "failure",
            "--duration-secs",
            "90",
        ])
        .unwrap();

        let host = build_host(&cli.build, &cli.command).unwrap();
        let snapshot = host.snapshot();
        assert_eq!(snapshot.job.as_str(), "nightly");
        assert_eq!(snapshot.number, BuildNumber::new(12));
        assert_eq!(snapshot.status, Some(BuildStatus::Failure));
        assert_eq!(snapshot.previous_status, Some(BuildStatus::Failure));
        assert_eq!(snapshot.duration, Some(Duration::from_secs(90)));
        assert_eq!(snapshot.causes, vec!["Started by timer".to_string()]);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let parsed = Cli::try_parse_from([
            "build-notifier",
            "--job",
            "nightly",
            "--build-number",
            "1",
            "completed",
            "--status",
            "exploded",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn started_defaults_to_post_setup_phase() {
        let cli = Cli::try_parse_from([
            "build-notifier",
            "--job",
            "nightly",
            "--build-number",
            "1",
            "--job-kind",
            "freestyle",
            "started",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Started { pre_build: false }));
        let host = build_host(&cli.build, &cli.command).unwrap();
        assert_eq!(host.job_kind(), JobKind::Freestyle);
        assert_eq!(host.snapshot().status, None);
    }
}
