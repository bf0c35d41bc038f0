//! Report assembly.
//!
//! A report is the single free-text record attached to an event when rule
//! evaluation found violations. No violations means no report at all, not an
//! empty one.

/// Separator between violation messages in a report.
const SEPARATOR: &str = "; ";

/// Joins violation messages into report content.
///
/// Returns `None` for an empty list; message order is preserved.
pub fn build_report(violations: &[String]) -> Option<String> {
    if violations.is_empty() {
        None
    } else {
        Some(violations.join(SEPARATOR))
    }
}
