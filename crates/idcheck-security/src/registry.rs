// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registration store — one accepted identity document per email address.
//
// Schema:
//   registrations(
//     email         TEXT PRIMARY KEY,
//     photo         BLOB NOT NULL,   -- document bytes, possibly age-encrypted
//     content_type  TEXT NOT NULL,   -- MIME type of the original upload
//     document_hash TEXT NOT NULL,   -- SHA-256 hex digest of the original upload
//     registered_at TEXT NOT NULL    -- RFC 3339
//   )
//
// The PRIMARY KEY turns "insert if absent" into a single conditional write:
// two concurrent registrations for the same email cannot both succeed.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use idcheck_core::error::IdCheckError;
use idcheck_core::types::{ContentType, RegistrationRecord};
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use tracing::{debug, info, instrument};

fn db_err(e: rusqlite::Error) -> IdCheckError {
    IdCheckError::Database(e.to_string())
}

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS registrations (
    email         TEXT PRIMARY KEY,
    photo         BLOB NOT NULL,
    content_type  TEXT NOT NULL,
    document_hash TEXT NOT NULL,
    registered_at TEXT NOT NULL
);";

/// Persistence seam for accepted registrations.
pub trait RegistrationStore: Send + Sync {
    /// Look up the record registered under `email`.
    fn find_by_email(&self, email: &str) -> Result<Option<RegistrationRecord>, IdCheckError>;

    /// Insert `record`, failing with [`IdCheckError::DuplicateRegistration`]
    /// if its email is already taken.
    fn insert(&self, record: &RegistrationRecord) -> Result<(), IdCheckError>;

    fn exists(&self, email: &str) -> Result<bool, IdCheckError> {
        Ok(self.find_by_email(email)?.is_some())
    }
}

/// SQLite-backed [`RegistrationStore`].
///
/// Cloning is cheap and shares the underlying connection.
#[derive(Clone)]
pub struct SqliteRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegistry").finish_non_exhaustive()
    }
}

impl SqliteRegistry {
    /// Open (or create) the registration database at `path` in WAL mode.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdCheckError> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;

        debug!("registration store opened");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory registration database (useful for tests).
    pub fn open_in_memory() -> Result<Self, IdCheckError> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(CREATE_TABLE_SQL).map_err(db_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn count(&self) -> Result<u64, IdCheckError> {
        self.lock()?
            .query_row("SELECT COUNT(*) FROM registrations", [], |row| row.get(0))
            .map_err(db_err)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, IdCheckError> {
        self.conn
            .lock()
            .map_err(|_| IdCheckError::Database("registration store lock poisoned".into()))
    }
}

impl RegistrationStore for SqliteRegistry {
    #[instrument(skip(self))]
    fn find_by_email(&self, email: &str) -> Result<Option<RegistrationRecord>, IdCheckError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT email, photo, content_type, document_hash, registered_at
                 FROM registrations WHERE email = ?1",
                params![email],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(db_err)?;

        let Some((email, photo_bytes, mime, document_hash, registered_at)) = row else {
            return Ok(None);
        };

        let content_type = ContentType::from_mime(&mime)?;
        let registered_at = DateTime::parse_from_rfc3339(&registered_at)
            .map_err(|e| IdCheckError::Database(format!("bad registered_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Some(RegistrationRecord {
            email,
            photo_bytes,
            content_type,
            document_hash,
            registered_at,
        }))
    }

    #[instrument(skip_all, fields(email = %record.email, photo_len = record.photo_bytes.len()))]
    fn insert(&self, record: &RegistrationRecord) -> Result<(), IdCheckError> {
        let result = self.lock()?.execute(
            "INSERT INTO registrations (email, photo, content_type, document_hash, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.email,
                record.photo_bytes,
                record.content_type.mime_type(),
                record.document_hash,
                record.registered_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => {
                info!("registration stored");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(IdCheckError::DuplicateRegistration(record.email.clone()))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    fn exists(&self, email: &str) -> Result<bool, IdCheckError> {
        self.lock()?
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM registrations WHERE email = ?1)",
                params![email],
                |row| row.get(0),
            )
            .map_err(db_err)
    }
}
