use std::path::PathBuf;
use std::time::Duration;

use mediatorr_core::scan::{
    EventBusConfig, ScanCommand, ScanProcessConfig, WatcherConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub server: ServerConfig,
    pub library: LibraryConfig,
    pub database: DatabaseConfig,
    pub scan: ScanConfig,
    pub events: EventsConfig,
    pub metadata: ConfigMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory of the web UI, served for every unmatched route.
    pub static_dir: Option<PathBuf>,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryConfig {
    pub torrent_root: PathBuf,
    pub tmdb_cache: PathBuf,
    pub itunes_cache: PathBuf,
    pub status_file: PathBuf,
    /// JSON settings file owned by the scan job.
    pub settings_file: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    pub program: String,
    pub args: Vec<String>,
    pub poll_interval: Duration,
    pub stop_grace: Duration,
}

impl ScanConfig {
    pub fn command(&self) -> ScanCommand {
        ScanCommand::new(self.program.clone(), self.args.iter().cloned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsConfig {
    pub log_capacity: usize,
    pub max_subscribers: usize,
    pub broadcast_capacity: usize,
    pub keep_alive: Duration,
}

impl EventsConfig {
    pub fn bus_config(&self) -> EventBusConfig {
        EventBusConfig {
            log_capacity: self.log_capacity,
            broadcast_capacity: self.broadcast_capacity,
            max_subscribers: self.max_subscribers,
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

impl Config {
    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig::new(&self.library.status_file)
            .with_poll_interval(self.scan.poll_interval)
    }

    pub fn process_config(&self) -> ScanProcessConfig {
        ScanProcessConfig::new(self.scan.command(), &self.library.status_file)
            .with_stop_grace(self.scan.stop_grace)
    }
}
