//! Webhook Sentinel - a GitHub webhook receiver that records events and flags
//! policy violations.
//!
//! Each inbound delivery is classified into a typed event, checked against a
//! small set of policy rules, and persisted. Violations are recorded as
//! reports linked to the stored event.

pub mod config;
pub mod ingest;
pub mod persistence;
pub mod report;
pub mod rules;
pub mod server;
pub mod webhooks;
