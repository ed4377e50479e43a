use std::time::Duration;

use crate::backup::{self, BackupSink};
use crate::config::BACKUP_WAIT;
use crate::db::Database;
use crate::error::{Result, TrackError};
use crate::models::{Record, Status};
use crate::parser::{self, Platform};

/// Entry point for the UI/CLI layer: extraction plus storage, with an optional
/// backup run when the tracker shuts down.
pub struct Tracker {
    db: Database,
    backup: Option<Box<dyn BackupSink>>,
    backup_timeout: Duration,
    page_size: usize,
}

impl Tracker {
    pub fn new(db: Database, backup: Option<Box<dyn BackupSink>>, page_size: usize) -> Self {
        Self {
            db,
            backup,
            backup_timeout: BACKUP_WAIT,
            page_size,
        }
    }

    pub fn with_backup_timeout(mut self, timeout: Duration) -> Self {
        self.backup_timeout = timeout;
        self
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Parses pasted page content for the tagged platform. Unknown tags are
    /// read with the default (LinkedIn) parser.
    pub fn extract(&self, raw: &str, platform_tag: &str) -> Result<Record> {
        let platform = Platform::from_tag(platform_tag);
        tracing::debug!(%platform, bytes = raw.len(), "extracting application");
        Ok(parser::extract(raw, platform)?)
    }

    /// Persists a new record, stores the assigned id on it and returns the id.
    pub fn save(&mut self, record: &mut Record) -> Result<i64> {
        let id = self.db.create(record)?;
        record.id = Some(id);
        tracing::info!(id, company = %record.company, position = %record.position, "saved application");
        Ok(id)
    }

    pub fn get(&self, id: i64) -> Result<Option<Record>> {
        self.db.get(id)
    }

    pub fn list_all(&self) -> Result<Vec<Record>> {
        self.db.list_all(self.page_size)
    }

    pub fn update(&mut self, record: &Record) -> Result<()> {
        self.db.update(record)?;
        tracing::info!(id = ?record.id, "updated application");
        Ok(())
    }

    pub fn set_status(&mut self, id: i64, status: Status) -> Result<Record> {
        let mut record = self.db.get(id)?.ok_or(TrackError::NotFound(id))?;
        record.status = status;
        self.update(&record)?;
        Ok(record)
    }

    pub fn add_note(&mut self, id: i64, note: &str) -> Result<Record> {
        let mut record = self.db.get(id)?.ok_or(TrackError::NotFound(id))?;
        record.append_note(note.trim());
        self.update(&record)?;
        Ok(record)
    }

    pub fn delete(&mut self, id: i64) -> Result<()> {
        self.db.delete(id)?;
        tracing::info!(id, "deleted application");
        Ok(())
    }

    pub fn search_by_company(&self, needle: &str) -> Result<Vec<Record>> {
        self.db.search_by_company(needle, self.page_size)
    }

    pub fn full_text_search(&self, query: &str) -> Result<Vec<Record>> {
        self.db.full_text_search(query)
    }

    /// Closes the database, then backs it up if a sink is configured. Backup
    /// problems are logged only.
    pub fn shutdown(self) -> Result<()> {
        let path = self.db.path().map(|p| p.to_path_buf());
        self.db.close()?;

        match (self.backup, path) {
            (Some(sink), Some(path)) => {
                backup::run_backup(sink, path, self.backup_timeout);
            }
            (Some(_), None) => tracing::debug!("in-memory database, skipping backup"),
            (None, _) => {}
        }
        Ok(())
    }
}
