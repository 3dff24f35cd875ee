use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::loader::ConfigLoadError;

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub server: FileServerConfig,
    #[serde(default)]
    pub library: FileLibraryConfig,
    #[serde(default)]
    pub database: FileDatabaseConfig,
    #[serde(default)]
    pub scan: FileScanConfig,
    #[serde(default)]
    pub events: FileEventsConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileServerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileLibraryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torrent_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tmdb_cache: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub itunes_cache: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings_file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileDatabaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileScanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poll_interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_grace_ms: Option<u64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileEventsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_subscribers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broadcast_capacity: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive_secs: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub server_host: Option<String>,
    pub server_port: Option<u16>,
    pub static_dir: Option<PathBuf>,
    pub torrent_root: Option<PathBuf>,
    pub tmdb_cache: Option<PathBuf>,
    pub itunes_cache: Option<PathBuf>,
    pub status_file: Option<PathBuf>,
    pub settings_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub scan_program: Option<String>,
    pub scan_args: Option<Vec<String>>,
    pub poll_interval_ms: Option<u64>,
    pub stop_grace_ms: Option<u64>,
    pub log_capacity: Option<usize>,
    pub max_subscribers: Option<usize>,
    pub broadcast_capacity: Option<usize>,
    pub keep_alive_secs: Option<u64>,
}

impl EnvConfig {
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let path = |key: &str| var(key).map(PathBuf::from);

        Ok(Self {
            config_path: path("MEDIATORR_CONFIG"),
            server_host: var("SERVER_HOST"),
            server_port: parse_var(&var, "SERVER_PORT")?,
            static_dir: path("STATIC_DIR"),
            torrent_root: path("TORRENT_ROOT"),
            tmdb_cache: path("CACHE_DIR_TMDB"),
            itunes_cache: path("CACHE_DIR_ITUNES"),
            status_file: path("STATUS_FILE"),
            settings_file: path("SETTINGS_FILE"),
            database_path: path("DB_PATH"),
            scan_program: var("SCAN_PROGRAM"),
            scan_args: var("SCAN_ARGS").map(|raw| {
                raw.split_whitespace().map(str::to_string).collect()
            }),
            poll_interval_ms: parse_var(&var, "STATUS_POLL_INTERVAL_MS")?,
            stop_grace_ms: parse_var(&var, "SCAN_STOP_GRACE_MS")?,
            log_capacity: parse_var(&var, "LOG_BUFFER_SIZE")?,
            max_subscribers: parse_var(&var, "EVENT_MAX_SUBSCRIBERS")?,
            broadcast_capacity: parse_var(&var, "EVENT_BROADCAST_CAPACITY")?,
            keep_alive_secs: parse_var(&var, "SSE_KEEPALIVE_SECS")?,
        })
    }
}

fn parse_var<T, F>(var: &F, key: &str) -> Result<Option<T>, ConfigLoadError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(key)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigLoadError::InvalidEnv {
                key: key.to_string(),
                value: raw.clone(),
            })
        })
        .transpose()
}
