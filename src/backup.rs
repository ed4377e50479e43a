use anyhow::{Context, Result, anyhow};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::config::BackupConfig;

const BACKUP_FILE: &str = "job_apps_backup.db";

/// Somewhere a copy of the database file can be pushed to.
pub trait BackupSink: Send {
    fn name(&self) -> &str;
    fn upload(&self, db_path: &Path) -> Result<()>;
}

/// Copies the database into a local (often cloud-synced) directory.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create backup directory: {}", dir.display()))?;
        Ok(Self { dir })
    }
}

impl BackupSink for DirectorySink {
    fn name(&self) -> &str {
        "directory"
    }

    fn upload(&self, db_path: &Path) -> Result<()> {
        let target = self.dir.join(BACKUP_FILE);
        fs::copy(db_path, &target)
            .with_context(|| format!("Failed to copy database to {}", target.display()))?;
        Ok(())
    }
}

/// PUTs the database file to a remote URL, replacing any previous copy.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    url: String,
    token: String,
}

impl HttpSink {
    pub fn new(url: String, token: Option<String>, timeout: Duration) -> Result<Self> {
        let token = token.ok_or_else(|| anyhow!("TRACKJOBS_BACKUP_TOKEN not set"))?;
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, url, token })
    }
}

impl BackupSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn upload(&self, db_path: &Path) -> Result<()> {
        let bytes = fs::read(db_path)
            .with_context(|| format!("Failed to read database file: {}", db_path.display()))?;
        self.client
            .put(&self.url)
            .bearer_auth(&self.token)
            .header("Content-Type", "application/vnd.sqlite3")
            .body(bytes)
            .send()
            .context("Backup upload failed")?
            .error_for_status()
            .context("Backup server rejected upload")?;
        Ok(())
    }
}

/// Builds the configured sink, if any. A sink that fails to initialise is
/// logged and treated as absent.
pub fn resolve_backup(config: &BackupConfig) -> Option<Box<dyn BackupSink>> {
    let sink: Result<Box<dyn BackupSink>> = if let Some(url) = &config.url {
        HttpSink::new(url.clone(), config.token.clone(), config.timeout)
            .map(|s| Box::new(s) as Box<dyn BackupSink>)
    } else if let Some(dir) = &config.dir {
        DirectorySink::new(dir.clone()).map(|s| Box::new(s) as Box<dyn BackupSink>)
    } else {
        return None;
    };

    match sink {
        Ok(sink) => {
            tracing::debug!(sink = sink.name(), "backup enabled");
            Some(sink)
        }
        Err(e) => {
            tracing::warn!("backup disabled: {e:#}");
            None
        }
    }
}

/// Uploads on a background thread and waits at most `timeout`. Never fails:
/// errors and timeouts are logged and reported as `false`.
pub fn run_backup(sink: Box<dyn BackupSink>, db_path: PathBuf, timeout: Duration) -> bool {
    let name = sink.name().to_string();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(sink.upload(&db_path));
    });

    match rx.recv_timeout(timeout) {
        Ok(Ok(())) => {
            tracing::info!(sink = %name, "database backed up");
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(sink = %name, "backup failed: {e:#}");
            false
        }
        Err(_) => {
            tracing::warn!(sink = %name, "backup did not finish within {:?}", timeout);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(test_name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "trackjobs_backup_{test_name}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    struct SlowSink;

    impl BackupSink for SlowSink {
        fn name(&self) -> &str {
            "slow"
        }

        fn upload(&self, _db_path: &Path) -> Result<()> {
            thread::sleep(Duration::from_secs(5));
            Ok(())
        }
    }

    #[test]
    fn test_no_backup_configured() {
        assert!(resolve_backup(&BackupConfig::default()).is_none());
    }

    #[test]
    fn test_http_backup_without_token_is_absent() {
        let config = BackupConfig {
            url: Some("https://backup.example.com/apps.db".to_string()),
            timeout: Duration::from_secs(1),
            ..Default::default()
        };
        assert!(resolve_backup(&config).is_none());
    }

    #[test]
    fn test_directory_backup_overwrites_copy() {
        let dir = temp_dir("overwrite");
        let source = dir.join("job_apps.db");
        fs::write(&source, b"first").unwrap();

        let config = BackupConfig {
            dir: Some(dir.join("backups")),
            ..Default::default()
        };
        let sink = resolve_backup(&config).unwrap();
        assert_eq!(sink.name(), "directory");
        assert!(run_backup(sink, source.clone(), Duration::from_secs(5)));

        fs::write(&source, b"second").unwrap();
        let sink = resolve_backup(&config).unwrap();
        assert!(run_backup(sink, source, Duration::from_secs(5)));

        let copied = fs::read(dir.join("backups").join(BACKUP_FILE)).unwrap();
        assert_eq!(copied, b"second");
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_failed_backup_is_reported_not_raised() {
        let dir = temp_dir("missing_source");
        let sink = DirectorySink::new(dir.clone()).unwrap();
        assert!(!run_backup(
            Box::new(sink),
            dir.join("does_not_exist.db"),
            Duration::from_secs(5)
        ));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_slow_backup_times_out() {
        assert!(!run_backup(
            Box::new(SlowSink),
            PathBuf::from("unused.db"),
            Duration::from_millis(50)
        ));
    }
}
