use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::date::AppliedDate;
use crate::error::{Result, StorageContext, TrackError};
use crate::models::Record;

const COLUMNS: &str = "id, company, position, location, salary_range, workplace_type, status, notes, website, date_applied";

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path).during("open database")?;
        conn.busy_timeout(Duration::from_secs(5))
            .during("configure database")?;
        let db = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        db.init()?;
        tracing::debug!(path = %path.display(), "database opened");
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().during("open database")?;
        let db = Self { conn, path: None };
        db.init()?;
        Ok(db)
    }

    /// File backing this database, `None` when in memory.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Flushes and closes the connection.
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, source)| TrackError::Storage {
                operation: "close database",
                source,
            })
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
            CREATE TABLE IF NOT EXISTS apps (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                company TEXT NOT NULL,
                position TEXT NOT NULL,
                location TEXT NOT NULL DEFAULT '',
                salary_range TEXT NOT NULL DEFAULT '',
                workplace_type TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL DEFAULT 'SUBMITTED' CHECK (status IN
                    ('SUBMITTED', 'REJECTED', 'PHONE_SCREEN', 'REMOTE_INTERVIEW', 'ON_SITE_INTERVIEW')),
                notes TEXT NOT NULL DEFAULT '',
                website TEXT NOT NULL DEFAULT '',
                date_applied TEXT,
                UNIQUE (company, position, date_applied)
            );

            CREATE INDEX IF NOT EXISTS idx_apps_date ON apps(date_applied);

            CREATE VIRTUAL TABLE IF NOT EXISTS apps_fts USING fts5(
                company,
                position,
                notes,
                content='apps',
                content_rowid='id'
            );

            CREATE TRIGGER IF NOT EXISTS apps_fts_insert AFTER INSERT ON apps BEGIN
                INSERT INTO apps_fts(rowid, company, position, notes)
                VALUES (new.id, new.company, new.position, new.notes);
            END;

            CREATE TRIGGER IF NOT EXISTS apps_fts_delete AFTER DELETE ON apps BEGIN
                INSERT INTO apps_fts(apps_fts, rowid, company, position, notes)
                VALUES ('delete', old.id, old.company, old.position, old.notes);
            END;

            CREATE TRIGGER IF NOT EXISTS apps_fts_update AFTER UPDATE ON apps BEGIN
                INSERT INTO apps_fts(apps_fts, rowid, company, position, notes)
                VALUES ('delete', old.id, old.company, old.position, old.notes);
                INSERT INTO apps_fts(rowid, company, position, notes)
                VALUES (new.id, new.company, new.position, new.notes);
            END;
            "#,
            )
            .during("initialize schema")
    }

    fn write_tx(&mut self, operation: &'static str) -> Result<Transaction<'_>> {
        self.conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .during(operation)
    }

    // --- Record operations ---

    /// Persists a new record and returns its id. The lookup for an existing
    /// (company, position, date) row and the insert share one transaction.
    pub fn create(&mut self, record: &Record) -> Result<i64> {
        const OP: &str = "create application";
        record.validate()?;

        let tx = self.write_tx(OP)?;
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM apps WHERE company = ?1 AND position = ?2 AND date_applied = ?3",
                params![record.company, record.position, record.date_applied],
                |row| row.get(0),
            )
            .optional()
            .during(OP)?;
        if existing.is_some() {
            return Err(duplicate(record));
        }

        tx.execute(
            "INSERT INTO apps (company, position, location, salary_range, workplace_type,
                               status, notes, website, date_applied)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                record.company,
                record.position,
                record.location,
                record.salary_range,
                record.workplace_type,
                record.status,
                record.notes,
                record.website,
                record.date_applied,
            ],
        )
        .map_err(|e| unique_violation(e, record, OP))?;
        let id = tx.last_insert_rowid();
        tx.commit().during(OP)?;
        Ok(id)
    }

    /// Newest applications first, at most `limit` of them.
    pub fn list_all(&self, limit: usize) -> Result<Vec<Record>> {
        const OP: &str = "list applications";
        let sql = format!(
            "SELECT {COLUMNS} FROM apps ORDER BY date_applied DESC, id DESC LIMIT ?1"
        );
        let mut stmt = self.conn.prepare(&sql).during(OP)?;
        let rows = stmt
            .query_map([limit as i64], Self::row_to_record)
            .during(OP)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().during(OP)
    }

    pub fn get(&self, id: i64) -> Result<Option<Record>> {
        let sql = format!("SELECT {COLUMNS} FROM apps WHERE id = ?1");
        self.conn
            .query_row(&sql, [id], Self::row_to_record)
            .optional()
            .during("get application")
    }

    /// Overwrites every field of the stored record with `record`'s values.
    pub fn update(&mut self, record: &Record) -> Result<()> {
        const OP: &str = "update application";
        let id = record
            .id
            .ok_or_else(|| TrackError::Validation("cannot update an unsaved application".to_string()))?;
        record.validate()?;

        let tx = self.write_tx(OP)?;
        let changed = tx
            .execute(
                "UPDATE apps SET company = ?1, position = ?2, location = ?3, salary_range = ?4,
                        workplace_type = ?5, status = ?6, notes = ?7, website = ?8, date_applied = ?9
                 WHERE id = ?10",
                params![
                    record.company,
                    record.position,
                    record.location,
                    record.salary_range,
                    record.workplace_type,
                    record.status,
                    record.notes,
                    record.website,
                    record.date_applied,
                    id,
                ],
            )
            .map_err(|e| unique_violation(e, record, OP))?;
        if changed == 0 {
            return Err(TrackError::NotFound(id));
        }
        tx.commit().during(OP)
    }

    pub fn delete(&mut self, id: i64) -> Result<()> {
        const OP: &str = "delete application";
        let tx = self.write_tx(OP)?;
        let changed = tx
            .execute("DELETE FROM apps WHERE id = ?1", [id])
            .during(OP)?;
        if changed == 0 {
            return Err(TrackError::NotFound(id));
        }
        tx.commit().during(OP)
    }

    // --- Search ---

    /// Case-insensitive substring match on company name, newest first.
    ///
    /// Folding happens in Rust because SQLite's `LOWER` only handles ASCII.
    /// Rows are streamed and the scan stops at `limit` matches.
    pub fn search_by_company(&self, needle: &str, limit: usize) -> Result<Vec<Record>> {
        const OP: &str = "search by company";
        let needle = needle.to_lowercase();
        let sql = format!("SELECT {COLUMNS} FROM apps ORDER BY date_applied DESC, id DESC");
        let mut stmt = self.conn.prepare(&sql).during(OP)?;
        let rows = stmt.query_map([], Self::row_to_record).during(OP)?;
        rows.filter(|row| match row {
            Ok(record) => record.company.to_lowercase().contains(&needle),
            Err(_) => true,
        })
        .take(limit)
        .collect::<rusqlite::Result<Vec<_>>>()
        .during(OP)
    }

    /// Full-text search over company, position and notes, best match first.
    pub fn full_text_search(&self, query: &str) -> Result<Vec<Record>> {
        const OP: &str = "full-text search";
        let Some(fts_query) = fts_query(query) else {
            return Ok(Vec::new());
        };
        let mut stmt = self
            .conn
            .prepare(
                "SELECT a.id, a.company, a.position, a.location, a.salary_range, a.workplace_type,
                        a.status, a.notes, a.website, a.date_applied
                 FROM apps a
                 JOIN (SELECT rowid, bm25(apps_fts) AS score FROM apps_fts WHERE apps_fts MATCH ?1) f
                   ON a.id = f.rowid
                 ORDER BY f.score, a.id",
            )
            .during(OP)?;
        let rows = stmt
            .query_map([fts_query], Self::row_to_record)
            .during(OP)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().during(OP)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get(0)?,
            company: row.get(1)?,
            position: row.get(2)?,
            location: row.get(3)?,
            salary_range: row.get(4)?,
            workplace_type: row.get(5)?,
            status: row.get(6)?,
            notes: row.get(7)?,
            website: row.get(8)?,
            date_applied: row.get::<_, AppliedDate>(9)?,
        })
    }
}

fn duplicate(record: &Record) -> TrackError {
    TrackError::DuplicateRecord {
        company: record.company.clone(),
        position: record.position.clone(),
        date_applied: record.date_applied,
    }
}

fn unique_violation(err: rusqlite::Error, record: &Record, operation: &'static str) -> TrackError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) if err.to_string().contains("UNIQUE") => duplicate(record),
        _ => TrackError::Storage {
            operation,
            source: err,
        },
    }
}

/// Rewrites free text into an FTS5 expression: double-quoted spans become
/// phrases, every other word becomes a quoted term, and all of them must match.
fn fts_query(input: &str) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();
    for (i, chunk) in input.split('"').enumerate() {
        let in_phrase = i % 2 == 1;
        if in_phrase {
            let phrase = chunk.split_whitespace().collect::<Vec<_>>().join(" ");
            if !phrase.is_empty() {
                parts.push(format!("\"{phrase}\""));
            }
        } else {
            parts.extend(
                chunk
                    .split_whitespace()
                    .filter(|word| word.chars().any(char::is_alphanumeric))
                    .map(|word| format!("\"{word}\"")),
            );
        }
    }
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}
