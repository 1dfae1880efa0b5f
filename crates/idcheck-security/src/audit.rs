// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail — append-only SQLite log of every verification decision.
//
// Schema:
//   audit_log(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     action        TEXT    NOT NULL,   -- "register" or "verify-face"
//     subject       TEXT    NOT NULL,   -- claimed email identity
//     document_hash TEXT    NOT NULL,   -- SHA-256 hex digest of the upload
//     outcome       TEXT    NOT NULL,   -- "accepted", rejection code, match result
//     success       INTEGER NOT NULL,   -- 0 = rejected/failed, 1 = accepted/matched
//     details       TEXT
//   )

use std::path::Path;

use chrono::Utc;
use idcheck_core::error::IdCheckError;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

fn db_err(e: rusqlite::Error) -> IdCheckError {
    IdCheckError::Database(e.to_string())
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS audit_log (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp     TEXT    NOT NULL,
    action        TEXT    NOT NULL,
    subject       TEXT    NOT NULL,
    document_hash TEXT    NOT NULL,
    outcome       TEXT    NOT NULL,
    success       INTEGER NOT NULL,
    details       TEXT
);
CREATE INDEX IF NOT EXISTS audit_log_subject ON audit_log(subject);";

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, action, subject, document_hash, outcome, success, details FROM audit_log";

/// Which pipeline produced an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditAction {
    Register,
    VerifyFace,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::VerifyFace => "verify-face",
        }
    }
}

/// A single entry in the audit log, used for queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub action: String,
    pub subject: String,
    pub document_hash: String,
    pub outcome: String,
    pub success: bool,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            action: row.get(2)?,
            subject: row.get(3)?,
            document_hash: row.get(4)?,
            outcome: row.get(5)?,
            success: row.get::<_, i32>(6)? != 0,
            details: row.get(7)?,
        })
    }
}

/// Append-only audit log backed by a SQLite database.
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdCheckError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, IdCheckError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Append one decision.
    #[instrument(skip(self, details), fields(action = action.as_str(), %outcome, success))]
    pub fn record(
        &self,
        action: AuditAction,
        subject: &str,
        document_hash: &str,
        outcome: &str,
        success: bool,
        details: Option<&str>,
    ) -> Result<(), IdCheckError> {
        self.conn
            .execute(
                "INSERT INTO audit_log (timestamp, action, subject, document_hash, outcome, success, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    Utc::now().to_rfc3339(),
                    action.as_str(),
                    subject,
                    document_hash,
                    outcome,
                    i32::from(success),
                    details
                ],
            )
            .map_err(db_err)?;
        Ok(())
    }

    /// All entries for one claimed identity, oldest first.
    pub fn entries_for_subject(&self, subject: &str) -> Result<Vec<AuditEntry>, IdCheckError> {
        self.query(
            &format!("{SELECT_COLUMNS} WHERE subject = ?1 ORDER BY id ASC"),
            params![subject],
        )
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, IdCheckError> {
        self.query(
            &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"),
            params![limit],
        )
    }

    pub fn count(&self) -> Result<u64, IdCheckError> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audit_log", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn query(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<AuditEntry>, IdCheckError> {
        let mut stmt = self.conn.prepare(sql).map_err(db_err)?;
        let rows = stmt.query_map(params, AuditEntry::from_row).map_err(db_err)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);

        log.record(AuditAction::Register, "a@x.in", "h1", "accepted", true, None)
            .unwrap();
        log.record(
            AuditAction::VerifyFace,
            "a@x.in",
            "h1",
            "match",
            true,
            Some("distance=0.31"),
        )
        .unwrap();

        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_are_grouped_by_subject() {
        let log = make_log();
        log.record(AuditAction::Register, "a@x.in", "h1", "checksum-failed", false, None)
            .unwrap();
        log.record(AuditAction::Register, "b@x.in", "h2", "accepted", true, None)
            .unwrap();
        log.record(AuditAction::Register, "a@x.in", "h3", "accepted", true, None)
            .unwrap();

        let entries = log.entries_for_subject("a@x.in").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, "checksum-failed");
        assert!(!entries[0].success);
        assert_eq!(entries[1].document_hash, "h3");
        assert!(entries[1].success);
    }

    #[test]
    fn details_are_kept() {
        let log = make_log();
        log.record(
            AuditAction::Register,
            "a@x.in",
            "deadbeef",
            "unreadable-file",
            false,
            Some("Invalid file header"),
        )
        .unwrap();

        let entries = log.entries_for_subject("a@x.in").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].document_hash, "deadbeef");
        assert_eq!(entries[0].action, "register");
        assert_eq!(entries[0].details.as_deref(), Some("Invalid file header"));
    }

    #[test]
    fn recent_entries_are_newest_first() {
        let log = make_log();
        for i in 0..5 {
            log.record(AuditAction::Register, "a@x.in", &format!("h{i}"), "accepted", true, None)
                .unwrap();
        }

        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
    }

    #[test]
    fn file_backed_log_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        {
            let log = AuditLog::open(&path).unwrap();
            log.record(AuditAction::Register, "a@x.in", "h", "accepted", true, None)
                .unwrap();
        }
        assert_eq!(AuditLog::open(&path).unwrap().count().unwrap(), 1);
    }
}
