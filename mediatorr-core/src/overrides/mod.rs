pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{MediaKey, MediaType};

pub use sqlite::SqliteOverrideRepository;

/// An administrator-assigned external catalog ID for one media item. The
/// scan job prefers it over its own matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Override {
    pub media_type: MediaType,
    pub name: String,
    pub api_id_override: i64,
    pub api_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Wire view of an override embedded in detail responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideView {
    pub id: i64,
    pub api_type: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Override> for OverrideView {
    fn from(value: &Override) -> Self {
        Self {
            id: value.api_id_override,
            api_type: value.api_type.clone(),
            updated_at: value.updated_at,
        }
    }
}

/// Repository port for catalog ID overrides.
#[async_trait]
pub trait OverrideRepository: Send + Sync {
    async fn get(&self, key: &MediaKey) -> Result<Option<Override>>;

    /// Insert or replace the override for `key`. Last write wins.
    async fn set(
        &self,
        key: &MediaKey,
        api_id: i64,
        api_type: &str,
    ) -> Result<Override>;

    /// Returns whether a row was deleted.
    async fn remove(&self, key: &MediaKey) -> Result<bool>;

    /// Number of stored rows for `key`; at most one.
    async fn count(&self, key: &MediaKey) -> Result<u64>;
}
