//! SQLite-backed event and report store.
//!
//! Two tables with a one-to-many relationship: `events` owns zero or more
//! `reports`, and reports are cascade-deleted with their event. An event
//! with zero reports means no policy violation was found for it.
//!
//! The store wraps one connection and is opened per request; there is no
//! shared global session. Writes that span both tables happen in a single
//! transaction.

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::webhooks::{Action, ClassifiedEvent, Subject};

/// Error type for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying SQLite operation failed.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// A stored row does not decode (bad enum text or timestamp).
    #[error("corrupt row in {table}: {detail}")]
    Corrupt { table: &'static str, detail: String },
}

/// Row id of a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(pub i64);

/// Row id of a stored report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReportId(pub i64);

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored event.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
    pub id: EventId,
    pub subject: Subject,
    pub action: Action,
    pub name: String,
    /// When the action occurred.
    pub timestamp: DateTime<Utc>,
    /// When the row was inserted.
    pub created_at: DateTime<Utc>,
    /// When the row was last modified.
    pub modified: DateTime<Utc>,
}

/// A stored report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub id: ReportId,
    /// The `"; "`-joined violation messages.
    pub content: String,
    /// The event this report belongs to.
    pub event_id: EventId,
    pub created_at: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// An event/report store over one SQLite connection.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Opens (or creates) the store at the given path.
    ///
    /// Enables WAL mode and foreign-key enforcement, and creates the tables
    /// and indices if they do not exist.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::init(conn)
    }

    /// Opens an in-memory store. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                modified TEXT NOT NULL,
                subject TEXT NOT NULL,
                action TEXT NOT NULL,
                name TEXT NOT NULL DEFAULT '',
                timestamp TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_subject ON events(subject);
            CREATE INDEX IF NOT EXISTS idx_events_action ON events(action);
            CREATE INDEX IF NOT EXISTS idx_events_name ON events(name);
            CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp);
            CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at);

            CREATE TABLE IF NOT EXISTS reports (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL,
                modified TEXT NOT NULL,
                content TEXT NOT NULL DEFAULT '',
                event_id INTEGER NOT NULL
                    REFERENCES events(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_reports_content ON reports(content);
            CREATE INDEX IF NOT EXISTS idx_reports_event_id ON reports(event_id);",
        )?;

        Ok(Store { conn })
    }

    /// Persists an event and, when given, its violation report, in one
    /// transaction. Nothing is written if any step fails.
    pub fn record(
        &mut self,
        event: &ClassifiedEvent,
        report_content: Option<&str>,
    ) -> Result<(EventId, Option<ReportId>), StoreError> {
        let now = Utc::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO events (created_at, modified, subject, action, name, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                now,
                event.subject.as_str(),
                event.action.as_str(),
                event.name,
                event.timestamp.to_rfc3339(),
            ],
        )?;
        let event_id = EventId(tx.last_insert_rowid());

        let report_id = match report_content {
            Some(content) => {
                tx.execute(
                    "INSERT INTO reports (created_at, modified, content, event_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![now, now, content, event_id.0],
                )?;
                Some(ReportId(tx.last_insert_rowid()))
            }
            None => None,
        };

        tx.commit()?;

        debug!(
            event_id = %event_id,
            subject = %event.subject,
            action = %event.action,
            has_report = report_id.is_some(),
            "Recorded event"
        );

        Ok((event_id, report_id))
    }

    /// Fetches an event by id.
    pub fn get_event(&self, id: EventId) -> Result<Option<EventRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at, modified, subject, action, name, timestamp
                 FROM events WHERE id = ?1",
                params![id.0],
                raw_event_row,
            )
            .optional()?;

        row.map(decode_event_row).transpose()
    }

    /// Fetches the most recently inserted event for a (subject, action) pair.
    pub fn latest_event(
        &self,
        subject: Subject,
        action: Action,
    ) -> Result<Option<EventRow>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, created_at, modified, subject, action, name, timestamp
                 FROM events WHERE subject = ?1 AND action = ?2
                 ORDER BY id DESC LIMIT 1",
                params![subject.as_str(), action.as_str()],
                raw_event_row,
            )
            .optional()?;

        row.map(decode_event_row).transpose()
    }

    /// Fetches all reports linked to an event, oldest first.
    pub fn reports_for(&self, event_id: EventId) -> Result<Vec<ReportRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, created_at, modified, content, event_id
             FROM reports WHERE event_id = ?1 ORDER BY id",
        )?;
        let raw: Vec<RawReportRow> = stmt
            .query_map(params![event_id.0], raw_report_row)?
            .collect::<Result<_, _>>()?;

        raw.into_iter().map(decode_report_row).collect()
    }

    /// Deletes an event; its reports go with it via the cascade.
    ///
    /// Returns whether an event row was actually removed.
    pub fn delete_event(&self, id: EventId) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1", params![id.0])?;
        Ok(removed > 0)
    }

    /// Number of stored events.
    pub fn event_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM events", [], |row| row.get(0))?)
    }

    /// Number of stored reports.
    pub fn report_count(&self) -> Result<i64, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?)
    }
}

// Raw rows come out of SQLite as text and are decoded into enums and
// timestamps in a second step, so decode failures surface as StoreError
// rather than panics inside a row-mapping closure.

type RawEventRow = (i64, String, String, String, String, String, String);
type RawReportRow = (i64, String, String, String, i64);

fn raw_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEventRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

fn raw_report_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawReportRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn decode_event_row(raw: RawEventRow) -> Result<EventRow, StoreError> {
    let (id, created_at, modified, subject, action, name, timestamp) = raw;
    Ok(EventRow {
        id: EventId(id),
        subject: Subject::from_header(&subject).ok_or_else(|| StoreError::Corrupt {
            table: "events",
            detail: format!("unknown subject {subject:?}"),
        })?,
        action: Action::from_payload(&action).ok_or_else(|| StoreError::Corrupt {
            table: "events",
            detail: format!("unknown action {action:?}"),
        })?,
        name,
        timestamp: decode_timestamp("events", &timestamp)?,
        created_at: decode_timestamp("events", &created_at)?,
        modified: decode_timestamp("events", &modified)?,
    })
}

fn decode_report_row(raw: RawReportRow) -> Result<ReportRow, StoreError> {
    let (id, created_at, modified, content, event_id) = raw;
    Ok(ReportRow {
        id: ReportId(id),
        content,
        event_id: EventId(event_id),
        created_at: decode_timestamp("reports", &created_at)?,
        modified: decode_timestamp("reports", &modified)?,
    })
}

fn decode_timestamp(table: &'static str, text: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt {
            table,
            detail: format!("bad timestamp {text:?}: {e}"),
        })
}
