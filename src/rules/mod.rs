//! Policy rule evaluation.
//!
//! Rules are kept in a dispatch table keyed by (subject, action). Evaluation
//! walks the table in declaration order and runs every check that matches
//! the event, so message order in a report is stable and adding a rule is a
//! one-line table change.
//!
//! Checks are independent: each appends zero or more human-readable
//! violation messages to a shared list and never looks at what earlier
//! checks found.

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use thiserror::Error;

use crate::config::RuleSettings;
use crate::webhooks::{Action, ClassifiedEvent, Subject};

/// Timestamp format GitHub uses for `repository.created_at`.
const GITHUB_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Error type for rule evaluation failures.
///
/// These are malformed-payload conditions discovered inside a check, not
/// violations; violations are ordinary strings in the result list.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleError {
    /// The payload is missing a field a check needs.
    #[error("payload is missing required field {0}")]
    MissingField(&'static str),

    /// A timestamp field is not in the expected format.
    #[error("invalid timestamp in field {field}: {value}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// One check function. Appends violation messages for the given event.
type Check = fn(&ClassifiedEvent, &RuleSettings, &mut Vec<String>) -> Result<(), RuleError>;

/// A table entry binding a check to the (subject, action) pair it applies to.
struct Rule {
    subject: Subject,
    action: Action,
    check: Check,
}

/// The rule table. Declaration order is report order.
const RULES: &[Rule] = &[
    Rule {
        subject: Subject::Push,
        action: Action::Created,
        check: check_push_window,
    },
    Rule {
        subject: Subject::Team,
        action: Action::Created,
        check: check_team_name,
    },
    Rule {
        subject: Subject::Repository,
        action: Action::Created,
        check: check_repo_creation,
    },
    Rule {
        subject: Subject::Repository,
        action: Action::Deleted,
        check: check_repo_deletion,
    },
];

/// Runs every rule applicable to the event's (subject, action) pair.
///
/// Returns the accumulated violation messages, empty when the event is
/// clean. An `Err` means a check could not run because the payload is
/// malformed.
pub fn evaluate(
    event: &ClassifiedEvent,
    settings: &RuleSettings,
) -> Result<Vec<String>, RuleError> {
    let mut violations = Vec::new();

    for rule in RULES {
        if rule.subject == event.subject && rule.action == event.action {
            (rule.check)(event, settings, &mut violations)?;
        }
    }

    Ok(violations)
}

/// Flags pushes whose timestamp falls inside the illegal window.
///
/// The window is `[start, end)` in UTC hours, default `[14, 16)`.
fn check_push_window(
    event: &ClassifiedEvent,
    settings: &RuleSettings,
    violations: &mut Vec<String>,
) -> Result<(), RuleError> {
    let hour = event.timestamp.hour();
    if settings.illegal_push_start_hour <= hour && hour < settings.illegal_push_end_hour {
        violations.push("Push event timestamp is not within legal bounds".to_string());
    }
    Ok(())
}

/// Flags new teams with a forbidden name prefix, and optionally a forbidden
/// suffix when one is configured.
fn check_team_name(
    event: &ClassifiedEvent,
    settings: &RuleSettings,
    violations: &mut Vec<String>,
) -> Result<(), RuleError> {
    if event.name.starts_with(&settings.forbidden_team_prefix) {
        violations.push(format!(
            "Team name starts with '{}'",
            settings.forbidden_team_prefix
        ));
    }

    if let Some(suffix) = &settings.forbidden_team_suffix {
        if event.name.ends_with(suffix.as_str()) {
            violations.push(format!("Team name ends with '{suffix}'"));
        }
    }

    Ok(())
}

/// Checks to run when a new repository is created.
///
/// Flags nothing right now; the table slot is reserved for future rules.
fn check_repo_creation(
    _event: &ClassifiedEvent,
    _settings: &RuleSettings,
    _violations: &mut Vec<String>,
) -> Result<(), RuleError> {
    Ok(())
}

/// Flags repositories deleted sooner than the configured minimum lifetime
/// after their recorded creation time.
fn check_repo_deletion(
    event: &ClassifiedEvent,
    settings: &RuleSettings,
    violations: &mut Vec<String>,
) -> Result<(), RuleError> {
    let created_at = event
        .payload
        .get("repository")
        .and_then(|r| r.get("created_at"))
        .and_then(|c| c.as_str())
        .ok_or(RuleError::MissingField("repository.created_at"))?;

    let created_at = NaiveDateTime::parse_from_str(created_at, GITHUB_TIMESTAMP_FORMAT)
        .map_err(|_| RuleError::InvalidTimestamp {
            field: "repository.created_at",
            value: created_at.to_string(),
        })?
        .and_utc();

    if event.timestamp - created_at < TimeDelta::minutes(settings.min_repo_lifetime_minutes) {
        violations.push(format!(
            "Repository deleted less than {} minutes after creation!",
            settings.min_repo_lifetime_minutes
        ));
    }

    Ok(())
}
