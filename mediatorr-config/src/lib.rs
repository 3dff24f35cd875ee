//! Configuration for Mediatorr.
//!
//! Values are resolved from, highest priority first: explicit loader
//! overrides (CLI flags), the process environment (optionally seeded from a
//! `.env` file), a TOML file, and built-in defaults.

pub mod loader;
pub mod models;
pub mod sources;
pub mod warnings;

pub use loader::{ConfigLoad, ConfigLoadError, ConfigLoader, ConfigLoaderOptions};
pub use models::{
    Config, ConfigMetadata, DatabaseConfig, EventsConfig, LibraryConfig,
    ScanConfig, ServerConfig,
};
pub use warnings::{ConfigWarning, ConfigWarnings};
