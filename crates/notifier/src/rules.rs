//! Decides, per target, whether a lifecycle event produces a notification.
//!
//! Two independent predicates are combined with AND:
//!
//! 1. **Applicability**: for "started" events the target's `notify_on_start`
//!    flag; for "completed" events the [`StatusGate`] for the outcome.
//! 2. **Rule conjunction**: every configured [`Rule`] must match the event.
//!    An empty rule set adds no filtering.
//!
//! Everything here is a pure function over immutable inputs.

use crate::{BuildStatus, CompletedOutcome, EventKind, Rule, StatusGate, Target};

/// A lifecycle event, reduced to the attributes rules can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The build has started.
    Started,
    /// The build has completed.
    Completed {
        /// Result of the build; `None` if the host recorded none.
        status: Option<BuildStatus>,
        /// Result of the previous build of the same job.
        previous: Option<BuildStatus>,
    },
}

impl LifecycleEvent {
    pub fn kind(self) -> EventKind {
        match self {
            Self::Started => EventKind::Started,
            Self::Completed { .. } => EventKind::Completed,
        }
    }
}

/// Returns `true` if `target` should be notified about `event`.
pub fn should_notify(target: &Target, event: LifecycleEvent) -> bool {
    let applicable = match event {
        LifecycleEvent::Started => target.notify_on_start,
        LifecycleEvent::Completed { status, previous } => status
            .map(|s| CompletedOutcome::classify(s, previous))
            .is_some_and(|outcome| status_gate_passes(&target.status_gate, outcome)),
    };
    applicable && all_rules_match(&target.rules, event)
}

/// Returns `true` if the gate reports on `outcome` at all.
///
/// A build that is back to normal is reported when either the back-to-normal
/// or the plain success switch is on.
pub fn status_gate_passes(gate: &StatusGate, outcome: CompletedOutcome) -> bool {
    match outcome {
        CompletedOutcome::Success => gate.notify_success,
        CompletedOutcome::BackToNormal => gate.notify_back_to_normal || gate.notify_success,
        CompletedOutcome::Failure => gate.notify_failure,
        CompletedOutcome::RepeatedFailure => gate.notify_repeated_failure,
        CompletedOutcome::Unstable => gate.notify_unstable,
        CompletedOutcome::Aborted => gate.notify_aborted,
        CompletedOutcome::NotBuilt => gate.notify_not_built,
    }
}

/// Returns `true` if every rule matches; vacuously `true` for no rules.
pub fn all_rules_match(rules: &[Rule], event: LifecycleEvent) -> bool {
    rules.iter().all(|rule| rule_matches(rule, event))
}

/// Returns `true` if a single rule matches `event`.
pub fn rule_matches(rule: &Rule, event: LifecycleEvent) -> bool {
    if rule.kind != event.kind() {
        return false;
    }
    let LifecycleEvent::Completed { status, .. } = event else {
        return true;
    };
    match rule.status.as_deref().map(str::trim) {
        None | Some("") => true,
        Some(required) => status.is_some_and(|actual| status_equals(required, actual)),
    }
}

fn status_equals(required: &str, actual: BuildStatus) -> bool {
    required.eq_ignore_ascii_case(actual.as_str()) || BuildStatus::parse(required) == Some(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TargetName;
    use rstest::rstest;

    fn target(notify_on_start: bool, rules: Vec<Rule>) -> Target {
        Target {
            notify_on_start,
            rules,
            ..Target::new(TargetName::new("ops").unwrap(), "https://hook.example")
        }
    }

    fn completed(status: BuildStatus) -> LifecycleEvent {
        LifecycleEvent::Completed {
            status: Some(status),
            previous: None,
        }
    }

    #[rstest]
    #[case(true, true)]
    #[case(false, false)]
    fn started_without_rules_follows_flag(#[case] flag: bool, #[case] expected: bool) {
        assert_eq!(should_notify(&target(flag, Vec::new()), LifecycleEvent::Started), expected);
    }

    #[test]
    fn started_requires_flag_even_when_rules_match() {
        let t = target(false, vec![Rule::started()]);
        assert!(!should_notify(&t, LifecycleEvent::Started));

        let t = target(true, vec![Rule::started()]);
        assert!(should_notify(&t, LifecycleEvent::Started));
    }

    #[test]
    fn started_is_suppressed_by_a_completed_rule() {
        let t = target(true, vec![Rule::completed(None)]);
        assert!(!should_notify(&t, LifecycleEvent::Started));
    }

    #[test]
    fn completed_without_rules_uses_legacy_default() {
        for status in [
            BuildStatus::Success,
            BuildStatus::Failure,
            BuildStatus::Unstable,
            BuildStatus::Aborted,
            BuildStatus::NotBuilt,
        ] {
            assert!(should_notify(&target(false, Vec::new()), completed(status)));
        }
    }

    #[test]
    fn completed_without_result_is_never_reported() {
        let event = LifecycleEvent::Completed {
            status: None,
            previous: None,
        };
        assert!(!should_notify(&target(false, Vec::new()), event));
    }

    #[rstest]
    #[case("failure", BuildStatus::Failure, true)]
    #[case("FAILURE", BuildStatus::Failure, true)]
    #[case("Failure", BuildStatus::Success, false)]
    #[case("not built", BuildStatus::NotBuilt, true)]
    #[case("", BuildStatus::Aborted, true)]
    fn completed_rule_compares_status_case_insensitively(
        #[case] required: &str,
        #[case] actual: BuildStatus,
        #[case] expected: bool,
    ) {
        let rule = Rule::completed(Some(required));
        assert_eq!(rule_matches(&rule, completed(actual)), expected);
    }

    #[test]
    fn all_rules_must_match() {
        let t = target(
            false,
            vec![Rule::completed(None), Rule::completed(Some("unstable"))],
        );
        assert!(!should_notify(&t, completed(BuildStatus::Failure)));
        assert!(should_notify(&t, completed(BuildStatus::Unstable)));
    }

    #[test]
    fn conflicting_rules_never_fire() {
        let t = target(
            true,
            vec![Rule::completed(Some("success")), Rule::completed(Some("failure"))],
        );
        for status in [BuildStatus::Success, BuildStatus::Failure] {
            assert!(!should_notify(&t, completed(status)));
        }
        assert!(!should_notify(&t, LifecycleEvent::Started));
    }

    #[test]
    fn status_gate_and_rules_are_both_required() {
        let mut t = target(false, vec![Rule::completed(Some("failure"))]);
        t.status_gate.notify_failure = false;
        assert!(!should_notify(&t, completed(BuildStatus::Failure)));

        t.status_gate.notify_failure = true;
        assert!(should_notify(&t, completed(BuildStatus::Failure)));
    }

    #[rstest]
    #[case(Some(BuildStatus::Success), false)]
    #[case(Some(BuildStatus::Failure), true)]
    fn repeated_failure_has_its_own_switch(
        #[case] previous: Option<BuildStatus>,
        #[case] expected: bool,
    ) {
        let mut t = target(false, Vec::new());
        t.status_gate.notify_failure = false;
        let event = LifecycleEvent::Completed {
            status: Some(BuildStatus::Failure),
            previous,
        };
        assert_eq!(should_notify(&t, event), expected);
    }

    #[test]
    fn back_to_normal_passes_on_either_switch() {
        let mut gate = StatusGate::none();
        assert!(!status_gate_passes(&gate, CompletedOutcome::BackToNormal));

        gate.notify_back_to_normal = true;
        assert!(status_gate_passes(&gate, CompletedOutcome::BackToNormal));
        assert!(!status_gate_passes(&gate, CompletedOutcome::Success));

        gate = StatusGate {
            notify_success: true,
            ..StatusGate::none()
        };
        assert!(status_gate_passes(&gate, CompletedOutcome::BackToNormal));
    }
}
