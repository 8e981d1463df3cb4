//! Database backups with rotation.

use std::path::PathBuf;

use chrono::Utc;
use tracing::{info, warn};

use crate::database::Database;
use crate::error::BotResult;

const FILE_PREFIX: &str = "bot_data_backup_";
const FILE_SUFFIX: &str = ".db";

/// Writes timestamped database copies into one directory and keeps only
/// the newest `keep` of them.
#[derive(Clone, Debug)]
pub struct BackupManager {
    dir: PathBuf,
    keep: usize,
}

impl BackupManager {
    pub fn new(dir: impl Into<PathBuf>, keep: usize) -> Self {
        Self {
            dir: dir.into(),
            keep: keep.max(1),
        }
    }

    /// Create a backup and prune old ones. Returns the new file's path.
    pub async fn create(&self, db: &Database) -> BotResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let name = format!(
            "{FILE_PREFIX}{}{FILE_SUFFIX}",
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        );
        let path = self.dir.join(name);

        db.backup_to(&path).await?;
        info!("Database backup created: {}", path.display());

        self.prune().await?;
        Ok(path)
    }

    /// Backup files in the directory, newest first.
    pub async fn list(&self) -> BotResult<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(FILE_PREFIX) && name.ends_with(FILE_SUFFIX) {
                backups.push(entry.path());
            }
        }

        // Timestamps in the name sort chronologically.
        backups.sort();
        backups.reverse();
        Ok(backups)
    }

    async fn prune(&self) -> BotResult<()> {
        for old in self.list().await?.into_iter().skip(self.keep) {
            match tokio::fs::remove_file(&old).await {
                Ok(()) => info!("Removed old backup: {}", old.display()),
                Err(e) => warn!("Failed to remove backup {}: {}", old.display(), e),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::UserRepository;
    use crate::error::BotError;
    use crate::testing::{contact, file_db, memory_db};

    #[tokio::test]
    async fn keeps_only_newest_backups() {
        let dir = tempfile::tempdir().unwrap();
        for day in 1..=6 {
            let stale = dir.path().join(format!("{FILE_PREFIX}2020010{day}_000000_000{FILE_SUFFIX}"));
            std::fs::write(stale, b"old").unwrap();
        }
        std::fs::write(dir.path().join("unrelated.txt"), b"keep me").unwrap();

        let live = tempfile::tempdir().unwrap();
        let db = file_db(live.path()).await;
        UserRepository::new(&db).ensure(&contact(1, "Ana")).await.unwrap();

        let manager = BackupManager::new(dir.path(), 5);
        let created = manager.create(&db).await.unwrap();

        let remaining = manager.list().await.unwrap();
        assert_eq!(remaining.len(), 5);
        assert_eq!(remaining[0], created);
        assert!(std::fs::metadata(&created).unwrap().len() > 0);
        assert!(!dir.path().join(format!("{FILE_PREFIX}20200101_000000_000{FILE_SUFFIX}")).exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[tokio::test]
    async fn unwritten_backup_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path(), 5);

        let result = manager.create(&memory_db().await).await;
        assert!(matches!(result, Err(BotError::Io(_))));
        assert!(manager.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let manager = BackupManager::new(dir.path().join("nope"), 5);
        assert!(manager.list().await.unwrap().is_empty());
    }
}
