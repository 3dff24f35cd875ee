use once_cell::sync::Lazy;
use std::{fs, path::PathBuf, time::Duration};
use thiserror::Error;
use tracing::debug;

use crate::models::{
    Config, ConfigMetadata, DatabaseConfig, EventsConfig, LibraryConfig,
    ScanConfig, ServerConfig,
};
use crate::sources::{EnvConfig, FileConfig};
use crate::warnings::ConfigWarnings;

static DEFAULT_CONFIG_LOCATIONS: Lazy<Vec<PathBuf>> = Lazy::new(|| {
    vec![
        PathBuf::from("mediatorr.toml"),
        PathBuf::from("config/mediatorr.toml"),
    ]
});

const DEFAULT_SCAN_SCRIPT: &str = "/app/scene-maker.js";

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    /// Skip `.env` handling entirely.
    pub skip_env_file: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    /// Candidates probed when no path is given explicitly or via
    /// `MEDIATORR_CONFIG`. `None` uses the built-in locations.
    pub default_locations: Option<Vec<PathBuf>>,
}

#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_default_locations(mut self, locations: Vec<PathBuf>) -> Self {
        self.options.default_locations = Some(locations);
        self
    }

    pub fn with_server_overrides(
        mut self,
        host: Option<String>,
        port: Option<u16>,
    ) -> Self {
        self.options.host = host;
        self.options.port = port;
        self
    }

    /// Load from `.env`, the process environment and the config file.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = if self.options.skip_env_file {
            false
        } else {
            self.load_env_file()?
        };
        let env = EnvConfig::gather()?;
        self.compose(env, env_file_loaded)
    }

    /// Load with an injected environment lookup. No `.env` file is read.
    pub fn load_with<F>(&self, lookup: F) -> Result<ConfigLoad, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = EnvConfig::from_lookup(lookup)?;
        self.compose(env, false)
    }

    fn load_env_file(&self) -> Result<bool, ConfigLoadError> {
        let loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true),
            None => dotenvy::dotenv().map(|_| true),
        };
        loaded.or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(false),
            _ => Err(ConfigLoadError::EnvFile(err)),
        })
    }

    fn compose(
        &self,
        env: EnvConfig,
        env_file_loaded: bool,
    ) -> Result<ConfigLoad, ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();
        let (file, config_path) = self.load_file_config(&env)?;

        if config_path.is_none() {
            warnings.push_with_hint(
                "No mediatorr.toml detected; using environment variables and defaults",
                "Pass --config or set MEDIATORR_CONFIG to use a configuration file",
            );
        }

        let file = file.unwrap_or_default();
        let FileConfig {
            server: file_server,
            library: file_library,
            database: file_database,
            scan: file_scan,
            events: file_events,
        } = file;

        let server = ServerConfig {
            host: self
                .options
                .host
                .clone()
                .or(env.server_host)
                .or(file_server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: self
                .options
                .port
                .or(env.server_port)
                .or(file_server.port)
                .unwrap_or(3000),
            static_dir: env.static_dir.or(file_server.static_dir),
        };

        let library = LibraryConfig {
            torrent_root: env
                .torrent_root
                .or(file_library.torrent_root)
                .unwrap_or_else(|| PathBuf::from("/data/torrent")),
            tmdb_cache: env
                .tmdb_cache
                .or(file_library.tmdb_cache)
                .unwrap_or_else(|| PathBuf::from("/data/cache_tmdb")),
            itunes_cache: env
                .itunes_cache
                .or(file_library.itunes_cache)
                .unwrap_or_else(|| PathBuf::from("/data/cache_itunes")),
            status_file: env
                .status_file
                .or(file_library.status_file)
                .unwrap_or_else(|| PathBuf::from("/data/status.json")),
            settings_file: env
                .settings_file
                .or(file_library.settings_file)
                .unwrap_or_else(|| PathBuf::from("/data/config.json")),
        };

        let database = DatabaseConfig {
            path: env
                .database_path
                .or(file_database.path)
                .unwrap_or_else(|| PathBuf::from("/data/mediatorr.db")),
        };

        let poll_interval_ms = env
            .poll_interval_ms
            .or(file_scan.poll_interval_ms)
            .unwrap_or(1000);
        if poll_interval_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                field: "scan.poll_interval_ms",
                reason: "must be greater than zero".into(),
            });
        }

        let scan = ScanConfig {
            program: env
                .scan_program
                .or(file_scan.program)
                .unwrap_or_else(|| "node".to_string()),
            args: env
                .scan_args
                .or(file_scan.args)
                .unwrap_or_else(|| vec![DEFAULT_SCAN_SCRIPT.to_string()]),
            poll_interval: Duration::from_millis(poll_interval_ms),
            stop_grace: Duration::from_millis(
                env.stop_grace_ms.or(file_scan.stop_grace_ms).unwrap_or(5000),
            ),
        };

        let keep_alive_secs = env
            .keep_alive_secs
            .or(file_events.keep_alive_secs)
            .unwrap_or(30);
        if keep_alive_secs == 0 {
            return Err(ConfigLoadError::Invalid {
                field: "events.keep_alive_secs",
                reason: "must be greater than zero".into(),
            });
        }

        let events = EventsConfig {
            log_capacity: env
                .log_capacity
                .or(file_events.log_capacity)
                .unwrap_or(200),
            max_subscribers: env
                .max_subscribers
                .or(file_events.max_subscribers)
                .unwrap_or(50),
            broadcast_capacity: env
                .broadcast_capacity
                .or(file_events.broadcast_capacity)
                .unwrap_or(256),
            keep_alive: Duration::from_secs(keep_alive_secs),
        };

        if events.log_capacity == 0 {
            warnings.push("events.log_capacity is 0; one log entry will be kept");
        }
        if let Some(dir) = &server.static_dir
            && !dir.is_dir()
        {
            warnings.push(format!(
                "static directory {} does not exist; UI will not be served",
                dir.display()
            ));
        }

        let config = Config {
            server,
            library,
            database,
            scan,
            events,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded,
            },
        };

        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let explicit = self
            .options
            .config_path
            .clone()
            .or_else(|| env.config_path.clone());

        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigLoadError::MissingConfig { path });
                }
                path
            }
            None => {
                let defaults = self
                    .options
                    .default_locations
                    .as_deref()
                    .unwrap_or(DEFAULT_CONFIG_LOCATIONS.as_slice());
                match defaults.iter().find(|candidate| candidate.exists()) {
                    Some(path) => path.clone(),
                    None => return Ok((None, None)),
                }
            }
        };

        debug!(path = %path.display(), "loading configuration file");
        let contents =
            fs::read_to_string(&path).map_err(|err| ConfigLoadError::Io {
                path: path.clone(),
                source: err,
            })?;
        let file_config: FileConfig =
            toml::from_str(&contents).map_err(|err| ConfigLoadError::Parse {
                path: path.clone(),
                source: err,
            })?;

        Ok((Some(file_config), Some(path)))
    }
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    InvalidEnv { key: String, value: String },
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
