use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteRow,
};
use sqlx::Row;
use tracing::{debug, info};

use super::{Override, OverrideRepository};
use crate::error::{MediaError, Result};
use crate::types::{MediaKey, MediaType};
use crate::MIGRATOR;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct SqliteOverrideRepository {
    pool: SqlitePool,
}

impl SqliteOverrideRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        MIGRATOR.run(&pool).await?;
        info!(path = %path.display(), "override store ready");

        Ok(Self::new(pool))
    }

    fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn map_row(row: &SqliteRow) -> Result<Override> {
        let media_type: String = row.try_get("type")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Override {
            media_type: MediaType::from_str(&media_type).map_err(|e| {
                MediaError::Internal(format!(
                    "Invalid media type stored in overrides: {e}"
                ))
            })?,
            name: row.try_get("name")?,
            api_id_override: row.try_get("api_id_override")?,
            api_type: row.try_get("api_type")?,
            created_at,
            updated_at,
        })
    }
}

#[async_trait]
impl OverrideRepository for SqliteOverrideRepository {
    async fn get(&self, key: &MediaKey) -> Result<Option<Override>> {
        let row = sqlx::query(
            r#"
            SELECT type, name, api_id_override, api_type, created_at, updated_at
            FROM media_overrides
            WHERE type = ?1 AND name = ?2
            "#,
        )
        .bind(key.media_type().as_str())
        .bind(key.name())
        .fetch_optional(self.pool())
        .await?;

        row.as_ref().map(Self::map_row).transpose()
    }

    async fn set(
        &self,
        key: &MediaKey,
        api_id: i64,
        api_type: &str,
    ) -> Result<Override> {
        let now = Utc::now();

        let row = sqlx::query(
            r#"
            INSERT INTO media_overrides (type, name, api_id_override, api_type, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(type, name) DO UPDATE SET
                api_id_override = excluded.api_id_override,
                api_type = excluded.api_type,
                updated_at = excluded.updated_at
            RETURNING type, name, api_id_override, api_type, created_at, updated_at
            "#,
        )
        .bind(key.media_type().as_str())
        .bind(key.name())
        .bind(api_id)
        .bind(api_type)
        .bind(now)
        .fetch_one(self.pool())
        .await?;

        debug!(%key, api_id, api_type, "override stored");
        Self::map_row(&row)
    }

    async fn remove(&self, key: &MediaKey) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM media_overrides WHERE type = ?1 AND name = ?2",
        )
        .bind(key.media_type().as_str())
        .bind(key.name())
        .execute(self.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, key: &MediaKey) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM media_overrides WHERE type = ?1 AND name = ?2",
        )
        .bind(key.media_type().as_str())
        .bind(key.name())
        .fetch_one(self.pool())
        .await?;

        u64::try_from(count).map_err(|e| {
            MediaError::Internal(format!("Negative override count: {e}"))
        })
    }
}
