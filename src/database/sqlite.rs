//! SQLite database wrapper.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::ConnectOptions;
use tracing::{debug, info};

use crate::error::BotResult;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Database wrapper around a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database file and apply pending migrations.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or a migration fails.
    pub async fn connect(url: &str) -> BotResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        info!("Successfully opened SQLite database at {}", url);

        Ok(Self { pool })
    }

    /// Private in-memory database, used by tests.
    ///
    /// A single connection that never idles out, otherwise the data would
    /// vanish with the connection.
    #[cfg(test)]
    pub async fn in_memory() -> BotResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Write a consistent copy of the database to `path`.
    pub async fn backup_to(&self, path: &Path) -> BotResult<()> {
        let target = path.to_string_lossy().into_owned();
        sqlx::query("VACUUM INTO ?")
            .bind(&target)
            .execute(&self.pool)
            .await?;

        // An in-memory database reports success without writing anything.
        if !tokio::fs::try_exists(path).await? {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("backup was not written to {target}"),
            )
            .into());
        }
        debug!("Database copied to {}", target);
        Ok(())
    }

    pub async fn close(&self) {
        info!("Closing database connections...");
        self.pool.close().await;
    }
}
