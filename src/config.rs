use std::path::PathBuf;
use std::time::Duration;

/// Default cap on list and company-search results.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Upper bound on a single backup request.
pub const BACKUP_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long shutdown waits for a backup before leaving it behind.
pub const BACKUP_WAIT: Duration = Duration::from_secs(5);

const DB_FILE: &str = "job_apps.db";

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub page_size: usize,
    pub backup: BackupConfig,
}

#[derive(Debug, Clone, Default)]
pub struct BackupConfig {
    pub dir: Option<PathBuf>,
    pub url: Option<String>,
    pub token: Option<String>,
    pub timeout: Duration,
    pub wait: Duration,
}

impl Config {
    pub fn new(db_path: Option<PathBuf>, page_size: usize) -> Self {
        Self {
            db_path: db_path.unwrap_or_else(default_db_path),
            page_size: page_size.max(1),
            backup: BackupConfig {
                timeout: BACKUP_REQUEST_TIMEOUT,
                wait: BACKUP_WAIT,
                ..Default::default()
            },
        }
    }

    pub fn with_backup_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.backup.dir = dir;
        self
    }

    pub fn with_backup_url(mut self, url: Option<String>, token: Option<String>) -> Self {
        self.backup.url = url;
        self.backup.token = token.filter(|t| !t.trim().is_empty());
        self
    }
}

fn default_db_path() -> PathBuf {
    // Use XDG data directory or fallback
    if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "trackjobs") {
        proj_dirs.data_dir().join(DB_FILE)
    } else {
        PathBuf::from(DB_FILE)
    }
}
