//! Typed representations of the webhook events the sentinel tracks.
//!
//! GitHub names the event type in the `X-GitHub-Event` header and the action
//! in the payload's `action` field. Both are open sets on GitHub's side; here
//! they are closed enums, and anything outside them is simply not classified
//! (no sentinel value, no unmapped integer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of object the event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// A repository was created, deleted, or changed.
    Repository,
    /// Commits were pushed. Pushes carry no `action` field; they are
    /// treated as `created` by convention.
    Push,
    /// A team was created, deleted, or changed.
    Team,
    /// A user account event.
    User,
    /// An issue event.
    Issue,
}

impl Subject {
    /// Maps an `X-GitHub-Event` header value to a subject.
    ///
    /// Returns `None` for event types we do not track.
    pub fn from_header(value: &str) -> Option<Subject> {
        match value {
            "repository" => Some(Subject::Repository),
            "push" => Some(Subject::Push),
            "team" => Some(Subject::Team),
            "user" => Some(Subject::User),
            "issue" => Some(Subject::Issue),
            _ => None,
        }
    }

    /// The wire/storage name of this subject.
    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Repository => "repository",
            Subject::Push => "push",
            Subject::Team => "team",
            Subject::User => "user",
            Subject::Issue => "issue",
        }
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// The object was created.
    Created,
    /// The object was deleted.
    Deleted,
    /// The object was updated.
    Updated,
}

impl Action {
    /// Maps a payload `action` value to an action.
    ///
    /// Returns `None` for actions we do not track (GitHub sends many more,
    /// e.g. `privatized`, `renamed`).
    pub fn from_payload(value: &str) -> Option<Action> {
        match value {
            "created" => Some(Action::Created),
            "deleted" => Some(Action::Deleted),
            "updated" => Some(Action::Updated),
            _ => None,
        }
    }

    /// The wire/storage name of this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Created => "created",
            Action::Deleted => "deleted",
            Action::Updated => "updated",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A webhook delivery classified into something we track.
///
/// Carries the raw payload alongside the extracted fields because some rule
/// checks need payload details that are not part of the stored event (e.g.
/// the repository's `created_at` for the deletion-lifetime rule).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedEvent {
    /// What the event is about.
    pub subject: Subject,

    /// What happened to it.
    pub action: Action,

    /// Display name of the affected object: repository name, team name,
    /// head commit id, issue title, or user login.
    pub name: String,

    /// When the action occurred. The payload does not carry a usable event
    /// time, so this is the receipt time (UTC).
    pub timestamp: DateTime<Utc>,

    /// The raw webhook payload, kept for the rule checks.
    pub payload: serde_json::Value,
}
