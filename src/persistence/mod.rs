//! SQLite persistence for events and their violation reports.

pub mod store;

pub use store::{EventId, EventRow, ReportId, ReportRow, Store, StoreError};
