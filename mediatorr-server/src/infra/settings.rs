//! The scan job's own settings file, edited through `/api/config`.

use std::path::{Path, PathBuf};

use mediatorr_core::util::write_atomic;
use serde_json::{Map, Value};
use tracing::warn;

pub const API_KEY_FIELD: &str = "tmdbApiKey";

/// Number of trailing characters left visible when masking a secret.
const VISIBLE_SUFFIX: usize = 4;

#[derive(Debug, Clone)]
pub struct JobSettingsStore {
    path: PathBuf,
}

impl JobSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current settings. A missing or unreadable file yields an empty object.
    pub async fn load(&self) -> Map<String, Value> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %self.path.display(), error = %e, "failed to read job settings");
                }
                return Map::new();
            }
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                warn!(path = %self.path.display(), "job settings are not a JSON object");
                Map::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "job settings are not valid JSON");
                Map::new()
            }
        }
    }

    /// Settings with the API key masked for display.
    pub async fn load_masked(&self) -> Map<String, Value> {
        let mut settings = self.load().await;
        if let Some(Value::String(key)) = settings.get_mut(API_KEY_FIELD) {
            *key = mask_secret(key);
        }
        settings
    }

    /// Persist `incoming`. A masked API key is replaced by the stored one so
    /// round-tripping the masked view never destroys the secret.
    pub async fn save(&self, mut incoming: Map<String, Value>) -> std::io::Result<()> {
        let submitted_masked = matches!(
            incoming.get(API_KEY_FIELD),
            Some(Value::String(key)) if is_masked(key)
        );
        if submitted_masked {
            match self.load().await.remove(API_KEY_FIELD) {
                Some(stored) => {
                    incoming.insert(API_KEY_FIELD.to_string(), stored);
                }
                None => {
                    incoming.remove(API_KEY_FIELD);
                }
            }
        }

        let body = serde_json::to_vec_pretty(&Value::Object(incoming))?;
        write_atomic(&self.path, &body).await
    }
}

/// All but the last four characters replaced by `*`. Secrets of four
/// characters or fewer are masked entirely.
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= VISIBLE_SUFFIX {
        return "*".repeat(len);
    }
    let visible: String = secret.chars().skip(len - VISIBLE_SUFFIX).collect();
    format!("{}{visible}", "*".repeat(len - VISIBLE_SUFFIX))
}

pub fn is_masked(value: &str) -> bool {
    value.starts_with('*')
}
