//! Assembles cards for lifecycle events.
//!
//! Cards are built only from the [`BuildSnapshot`] and [`Environment`] handed
//! in, so the same inputs always produce an identical card.

use chrono::TimeDelta;
use tracing::warn;

use crate::types::format_duration;
use crate::{
    ActionLink, BuildSnapshot, BuildStatus, Card, CompletedOutcome, CustomMessageSpec,
    Environment, Fact, NotifierError, Section, Timestamp,
};

/// Theme color for "started" cards and messages without a status.
pub const STARTED_THEME_COLOR: &str = "3479BF";

const VIEW_BUILD: &str = "View Build";

/// Builds cards for one build run.
#[derive(Debug, Clone, Copy)]
pub struct CardBuilder<'a> {
    snapshot: &'a BuildSnapshot,
    env: &'a Environment,
}

impl<'a> CardBuilder<'a> {
    pub fn new(snapshot: &'a BuildSnapshot, env: &'a Environment) -> Self {
        Self { snapshot, env }
    }

    /// Card announcing that the build has started.
    pub fn started(&self, messages: &[CustomMessageSpec]) -> Card {
        let summary = self.headline("Started");

        let mut facts = self.identity_facts();
        facts.push(Fact::new("Status", "Build Started"));
        facts.push(Fact::new("Start Time", self.snapshot.started_at.to_string()));
        facts.extend(self.context_facts());
        facts.extend(self.custom_facts(messages));

        self.card(summary, Some(STARTED_THEME_COLOR), facts)
    }

    /// Card reporting the build's result.
    ///
    /// Summary and theme color depend on the outcome; a build without a
    /// recorded result is reported as plainly "completed".
    pub fn completed(&self, messages: &[CustomMessageSpec]) -> Card {
        self.completed_with(self.snapshot.outcome(), messages)
    }

    /// Card for an on-demand message.
    ///
    /// `status` is free text shown as-is; if it names a build status it also
    /// selects the theme color, unless `color` is given explicitly.
    pub fn message(&self, text: &str, status: Option<&str>, color: Option<&str>) -> Card {
        let summary = format!("{} - #{}: {}", self.snapshot.job, self.snapshot.number, text);

        let mut facts = self.identity_facts();
        if let Some(status) = status.filter(|s| !s.trim().is_empty()) {
            facts.push(Fact::new("Status", status));
        }
        facts.push(Fact::new("Message", text));

        let theme = color
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.trim().trim_start_matches('#').to_string())
            .or_else(|| {
                status
                    .and_then(BuildStatus::parse)
                    .map(|s| CompletedOutcome::classify(s, None).theme_color().to_string())
            })
            .unwrap_or_else(|| STARTED_THEME_COLOR.to_string());

        self.card(summary, Some(theme.as_str()), facts)
    }

    /// Card reporting an explicit status rather than the recorded one.
    pub fn completed_as(&self, status: BuildStatus) -> Card {
        let outcome = CompletedOutcome::classify(status, self.snapshot.previous_status);
        self.completed_with(Some(outcome), &[])
    }

    fn completed_with(
        &self,
        outcome: Option<CompletedOutcome>,
        messages: &[CustomMessageSpec],
    ) -> Card {
        let label = outcome.map_or("Build Completed", CompletedOutcome::label);
        let summary = self.headline(label);

        let mut facts = self.identity_facts();
        facts.push(Fact::new("Status", label));
        facts.push(Fact::new("Start Time", self.snapshot.started_at.to_string()));
        if let Some(duration) = self.snapshot.duration {
            facts.push(Fact::new("Duration", format_duration(duration)));
            if let Ok(delta) = TimeDelta::from_std(duration) {
                if let Some(end) = self.snapshot.started_at.as_datetime().checked_add_signed(delta)
                {
                    facts.push(Fact::new("Completion Time", Timestamp::from_utc(end).to_string()));
                }
            }
        }
        facts.extend(self.context_facts());
        facts.extend(self.custom_facts(messages));

        self.card(summary, outcome.map(CompletedOutcome::theme_color), facts)
    }

    /// Expands each custom message against the environment, in order.
    ///
    /// A malformed template keeps its literal text and is logged; it never
    /// removes the fact or affects its siblings.
    pub fn custom_facts(&self, messages: &[CustomMessageSpec]) -> Vec<Fact> {
        messages
            .iter()
            .map(|message| {
                let (value, err) = self.env.expand_lossy(message.value());
                if let Some(source) = err {
                    let err = NotifierError::TemplateExpansion {
                        template: message.value().to_string(),
                        source,
                    };
                    warn!(fact = message.name(), error = %err, "custom message left unexpanded");
                }
                Fact::new(message.name(), value)
            })
            .collect()
    }

    fn headline(&self, label: &str) -> String {
        format!("{} - #{} {}", self.snapshot.job, self.snapshot.number, label)
    }

    fn identity_facts(&self) -> Vec<Fact> {
        vec![
            Fact::new("Job", self.snapshot.job.as_str()),
            Fact::new("Build Number", self.snapshot.number.to_string()),
        ]
    }

    fn context_facts(&self) -> Vec<Fact> {
        let mut facts = Vec::new();
        if !self.snapshot.causes.is_empty() {
            facts.push(Fact::new("Remarks", self.snapshot.causes.join(". ")));
        }
        if !self.snapshot.changes.is_empty() {
            facts.push(Fact::new("Changes", self.snapshot.changes.join("\n")));
        }
        if !self.snapshot.culprits.is_empty() {
            facts.push(Fact::new("Developers", self.snapshot.culprits.join(", ")));
        }
        facts
    }

    fn card(&self, summary: String, theme: Option<&str>, facts: Vec<Fact>) -> Card {
        let section = Section::new(
            format!("Latest status of build #{}", self.snapshot.number),
            facts,
        );
        let actions = self
            .snapshot
            .url
            .iter()
            .map(|url| ActionLink::open_uri(VIEW_BUILD, url.as_str()))
            .collect();
        Card::new(
            summary.clone(),
            summary,
            theme.map(str::to_string),
            vec![section],
            actions,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{BuildNumber, JobName};

    fn snapshot() -> BuildSnapshot {
        let started = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        BuildSnapshot {
            url: Some("https://ci.example/job/nightly/42/".to_string()),
            duration: Some(Duration::from_secs(125)),
            status: Some(BuildStatus::Failure),
            causes: vec!["Started by timer".to_string()],
            ..BuildSnapshot::new(
                JobName::new("nightly").unwrap(),
                BuildNumber::new(42),
                Timestamp::from_utc(started),
            )
        }
    }

    fn env() -> Environment {
        [("BRANCH", "main")].into_iter().collect()
    }

    #[test]
    fn started_card_carries_identity_and_custom_facts() {
        let snap = snapshot();
        let env = env();
        let messages = vec![CustomMessageSpec::new(Some("Branch"), Some("${BRANCH}"))];

        let card = CardBuilder::new(&snap, &env).started(&messages);

        assert_eq!(card.summary(), "nightly - #42 Started");
        assert_eq!(card.theme_color(), Some(STARTED_THEME_COLOR));
        assert_eq!(card.fact("Job"), Some("nightly"));
        assert_eq!(card.fact("Build Number"), Some("42"));
        assert_eq!(card.fact("Status"), Some("Build Started"));
        assert_eq!(card.fact("Remarks"), Some("Started by timer"));
        assert_eq!(card.fact("Branch"), Some("main"));
        assert_eq!(card.fact("Duration"), None);
        assert_eq!(card.actions()[0].uri(), Some("https://ci.example/job/nightly/42/"));
    }

    #[test]
    fn completed_card_reflects_outcome() {
        let snap = snapshot();
        let env = env();

        let card = CardBuilder::new(&snap, &env).completed(&[]);

        assert_eq!(card.summary(), "nightly - #42 Build Failed");
        assert_eq!(card.theme_color(), Some("E81123"));
        assert_eq!(card.fact("Duration"), Some("2 min 5 sec"));
        assert_eq!(card.fact("Completion Time"), Some("2024-05-01T12:02:05+00:00"));
    }

    #[test]
    fn completed_card_themes_differ_per_outcome() {
        let env = env();
        let mut themes = Vec::new();
        for status in [
            BuildStatus::Success,
            BuildStatus::Failure,
            BuildStatus::Unstable,
            BuildStatus::Aborted,
        ] {
            let snap = BuildSnapshot {
                status: Some(status),
                ..snapshot()
            };
            themes.push(
                CardBuilder::new(&snap, &env)
                    .completed(&[])
                    .theme_color()
                    .map(str::to_string),
            );
        }
        themes.dedup();
        assert_eq!(themes.len(), 4);
    }

    #[test]
    fn completed_without_result_has_no_theme() {
        let snap = BuildSnapshot {
            status: None,
            ..snapshot()
        };
        let env = Environment::new();
        let card = CardBuilder::new(&snap, &env).completed(&[]);
        assert_eq!(card.fact("Status"), Some("Build Completed"));
        assert_eq!(card.theme_color(), None);
    }

    #[test]
    fn malformed_template_does_not_drop_other_facts() {
        let snap = snapshot();
        let env = env();
        let messages = vec![
            CustomMessageSpec::new(Some("Broken"), Some("${BRANCH")),
            CustomMessageSpec::new(Some("Branch"), Some("$BRANCH")),
        ];

        let card = CardBuilder::new(&snap, &env).completed(&messages);

        assert_eq!(card.fact("Broken"), Some("${BRANCH"));
        assert_eq!(card.fact("Branch"), Some("main"));
        assert_eq!(card.fact("Status"), Some("Build Failed"));
    }

    #[test]
    fn builder_is_deterministic() {
        let snap = snapshot();
        let env = env();
        let messages = vec![CustomMessageSpec::new(Some("Branch"), Some("${BRANCH}"))];
        let builder = CardBuilder::new(&snap, &env);

        let first = builder.completed(&messages).to_json_bytes().unwrap();
        let second = builder.completed(&messages).to_json_bytes().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn message_card_prefers_explicit_color() {
        let snap = snapshot();
        let env = env();
        let builder = CardBuilder::new(&snap, &env);

        let card = builder.message("deployed", Some("Success"), Some("#00FF00"));
        assert_eq!(card.summary(), "nightly - #42: deployed");
        assert_eq!(card.fact("Message"), Some("deployed"));
        assert_eq!(card.fact("Status"), Some("Success"));
        assert_eq!(card.theme_color(), Some("00FF00"));

        let card = builder.message("deployed", Some("failure"), None);
        assert_eq!(card.theme_color(), Some("E81123"));

        let card = builder.message("deployed", Some("queued"), None);
        assert_eq!(card.theme_color(), Some(STARTED_THEME_COLOR));
    }

    #[test]
    fn explicit_status_overrides_recorded_result() {
        let snap = snapshot();
        let env = env();
        let card = CardBuilder::new(&snap, &env).completed_as(BuildStatus::Success);
        assert_eq!(card.fact("Status"), Some("Build Success"));
    }
}
