//! The ingestion pipeline: classify, evaluate, persist.
//!
//! One webhook delivery runs through this synchronously:
//!
//! 1. Classify the payload; unrecognized deliveries stop here, persisting
//!    nothing
//! 2. Evaluate the policy rules for the event's (subject, action) pair
//! 3. Join any violations into a report
//! 4. Persist the event and report in one transaction
//!
//! Every failure is terminal for the delivery; there are no retries and no
//! partial persistence.

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::RuleSettings;
use crate::persistence::{EventId, ReportId, Store, StoreError};
use crate::report::build_report;
use crate::rules::{evaluate, RuleError};
use crate::webhooks::{classify, ClassifyError};

/// Error type for pipeline failures.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The payload is malformed for its recognized event type.
    #[error(transparent)]
    Classify(#[from] ClassifyError),

    /// A rule check could not run because the payload is malformed.
    #[error(transparent)]
    Rule(#[from] RuleError),

    /// Persisting the event failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A violation report produced and persisted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    /// The stored event the report is linked to.
    pub event_id: EventId,
    /// The stored report row.
    pub report_id: ReportId,
    /// The `"; "`-joined violation messages, in evaluation order.
    pub content: String,
}

/// Processes one webhook delivery.
///
/// Returns the persisted violation report, or `None` when the delivery was
/// either clean (event persisted, no report) or not a tracked event type
/// (nothing persisted).
pub fn process_webhook(
    store: &mut Store,
    settings: &RuleSettings,
    event_type: &str,
    payload: &serde_json::Value,
    received_at: DateTime<Utc>,
) -> Result<Option<ViolationReport>, IngestError> {
    let Some(event) = classify(event_type, payload, received_at)? else {
        debug!(event_type, "Ignoring untracked webhook delivery");
        return Ok(None);
    };

    let violations = evaluate(&event, settings)?;
    let content = build_report(&violations);

    let (event_id, report_id) = store.record(&event, content.as_deref())?;

    match (content, report_id) {
        (Some(content), Some(report_id)) => {
            warn!(
                %event_id,
                %report_id,
                subject = %event.subject,
                action = %event.action,
                name = %event.name,
                report = %content,
                "Policy violation recorded"
            );
            Ok(Some(ViolationReport {
                event_id,
                report_id,
                content,
            }))
        }
        _ => {
            debug!(
                %event_id,
                subject = %event.subject,
                action = %event.action,
                "Event recorded, no violation"
            );
            Ok(None)
        }
    }
}
