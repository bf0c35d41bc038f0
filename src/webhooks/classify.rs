//! Webhook payload classifier.
//!
//! Turns an event-type header plus JSON payload into a [`ClassifiedEvent`].
//!
//! # Classification contract
//!
//! 1. The subject comes from the `X-GitHub-Event` header value
//! 2. The action comes from the payload's `action` field (pushes have none
//!    and default to `created`)
//! 3. Unknown subjects or actions return `Ok(None)` (ignored, not an error)
//! 4. A recognized subject whose payload is missing the field we take the
//!    name from returns `Err` (malformed payload)
//!
//! Classification is pure; the caller decides whether to persist the result.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::events::{Action, ClassifiedEvent, Subject};

/// Error type for classification failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifyError {
    /// A recognized event type is missing a field we require.
    #[error("payload is missing required field {0}")]
    MissingField(&'static str),
}

/// Classifies a webhook delivery.
///
/// # Arguments
///
/// * `event_type` - The value of the `X-GitHub-Event` header
/// * `payload` - The parsed JSON payload
/// * `received_at` - Receipt time, used as the event timestamp
///
/// # Returns
///
/// * `Ok(Some(event))` - A (subject, action) pair we track
/// * `Ok(None)` - Event type or action outside the tracked set
/// * `Err(e)` - Recognized event type with a malformed payload
pub fn classify(
    event_type: &str,
    payload: &serde_json::Value,
    received_at: DateTime<Utc>,
) -> Result<Option<ClassifiedEvent>, ClassifyError> {
    let Some(subject) = Subject::from_header(event_type) else {
        return Ok(None);
    };

    // Pushes carry no "action" field; everything else must name one we track.
    let action = match subject {
        Subject::Push => Action::Created,
        _ => {
            let Some(action) = payload
                .get("action")
                .and_then(|a| a.as_str())
                .and_then(Action::from_payload)
            else {
                return Ok(None);
            };
            action
        }
    };

    let name = extract_name(subject, payload)?;

    Ok(Some(ClassifiedEvent {
        subject,
        action,
        name,
        timestamp: received_at,
        payload: payload.clone(),
    }))
}

/// Extracts the display name of the affected object.
///
/// The field depends on the subject: repositories and teams have a `name`,
/// pushes are identified by the head commit id, issues by their title, and
/// users by their login.
fn extract_name(
    subject: Subject,
    payload: &serde_json::Value,
) -> Result<String, ClassifyError> {
    let (field, value) = match subject {
        Subject::Repository => ("repository.name", lookup(payload, &["repository", "name"])),
        Subject::Team => ("team.name", lookup(payload, &["team", "name"])),
        Subject::Push => ("head_commit.id", lookup(payload, &["head_commit", "id"])),
        Subject::Issue => ("issue.title", lookup(payload, &["issue", "title"])),
        Subject::User => ("user.login", lookup(payload, &["user", "login"])),
    };

    value
        .map(|s| s.to_string())
        .ok_or(ClassifyError::MissingField(field))
}

/// Walks a path of object keys, expecting a string at the end.
fn lookup<'a>(payload: &'a serde_json::Value, path: &[&str]) -> Option<&'a str> {
    let mut value = payload;
    for key in path {
        value = value.get(key)?;
    }
    value.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn repository_created_classifies() {
        let payload = json!({
            "action": "created",
            "repository": { "name": "hello-world" }
        });

        let event = classify("repository", &payload, now()).unwrap().unwrap();
        assert_eq!(event.subject, Subject::Repository);
        assert_eq!(event.action, Action::Created);
        assert_eq!(event.name, "hello-world");
    }

    #[test]
    fn team_deleted_classifies() {
        let payload = json!({
            "action": "deleted",
            "team": { "name": "backend" }
        });

        let event = classify("team", &payload, now()).unwrap().unwrap();
        assert_eq!(event.subject, Subject::Team);
        assert_eq!(event.action, Action::Deleted);
        assert_eq!(event.name, "backend");
    }

    #[test]
    fn push_defaults_to_created_and_uses_commit_id() {
        let payload = json!({
            "head_commit": { "id": "1234567890abcdef1234567890abcdef12345678" }
        });

        let event = classify("push", &payload, now()).unwrap().unwrap();
        assert_eq!(event.subject, Subject::Push);
        assert_eq!(event.action, Action::Created);
        assert_eq!(event.name, "1234567890abcdef1234567890abcdef12345678");
    }

    #[test]
    fn issue_uses_title() {
        let payload = json!({
            "action": "created",
            "issue": { "title": "Crash on startup" }
        });

        let event = classify("issue", &payload, now()).unwrap().unwrap();
        assert_eq!(event.subject, Subject::Issue);
        assert_eq!(event.name, "Crash on startup");
    }

    #[test]
    fn user_uses_login() {
        let payload = json!({
            "action": "created",
            "user": { "login": "octocat" }
        });

        let event = classify("user", &payload, now()).unwrap().unwrap();
        assert_eq!(event.subject, Subject::User);
        assert_eq!(event.name, "octocat");
    }

    #[test]
    fn unknown_event_type_returns_none() {
        let payload = json!({ "action": "created" });
        assert_eq!(classify("pull_request", &payload, now()), Ok(None));
        assert_eq!(classify("workflow_run", &payload, now()), Ok(None));
    }

    #[test]
    fn unknown_action_returns_none() {
        // "privatized" is a real GitHub repository action we do not track
        let payload = json!({
            "action": "privatized",
            "repository": { "name": "hello-world" }
        });
        assert_eq!(classify("repository", &payload, now()), Ok(None));
    }

    #[test]
    fn missing_action_returns_none() {
        let payload = json!({
            "repository": { "name": "hello-world" }
        });
        assert_eq!(classify("repository", &payload, now()), Ok(None));
    }

    #[test]
    fn missing_name_field_is_an_error() {
        let payload = json!({ "action": "created" });
        assert_eq!(
            classify("repository", &payload, now()),
            Err(ClassifyError::MissingField("repository.name"))
        );
        assert_eq!(
            classify("team", &payload, now()),
            Err(ClassifyError::MissingField("team.name"))
        );
    }

    #[test]
    fn push_without_head_commit_is_an_error() {
        // e.g. a branch deletion push has no head_commit
        let payload = json!({ "ref": "refs/heads/gone", "deleted": true });
        assert_eq!(
            classify("push", &payload, now()),
            Err(ClassifyError::MissingField("head_commit.id"))
        );
    }

    #[test]
    fn timestamp_is_the_receipt_time() {
        let received = "2024-01-15T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let payload = json!({
            "head_commit": { "id": "abc" }
        });

        let event = classify("push", &payload, received).unwrap().unwrap();
        assert_eq!(event.timestamp, received);
    }
}
