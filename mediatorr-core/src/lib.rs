//! # Mediatorr Core
//!
//! Core library for Mediatorr: the media catalog that reports on a
//! torrent-artifact library, and the scan lifecycle that keeps it fresh.
//!
//! ## Overview
//!
//! - **Library**: filesystem conventions for sidecar artifacts, the metadata
//!   cache reader, and the [`library::MediaCatalog`] that composes them into
//!   listings, detail views and statistics
//! - **Overrides**: administrator-assigned catalog IDs persisted in SQLite
//! - **Scan**: the single-flight [`scan::ScanProcessManager`], the polling
//!   [`scan::StatusWatcher`], and the [`scan::ScanEventBus`] that fans their
//!   events out to the log ring buffer and live subscribers
//!
//! ## Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use mediatorr_core::scan::{EventBusConfig, ScanEventBus, StatusWatcher, WatcherConfig};
//!
//! # async fn run() {
//! let bus = Arc::new(ScanEventBus::new(EventBusConfig::default()));
//! let watcher = StatusWatcher::new(
//!     WatcherConfig::new("/data/status.json"),
//!     Arc::clone(&bus),
//! );
//! watcher.start();
//! let mut subscription = bus.subscribe();
//! while let Some(frame) = subscription.recv().await {
//!     println!("{}: {:?}", frame.event.event_name(), frame.event);
//! }
//! # }
//! ```

/// Error types shared by the catalog and the override store
pub mod error;

/// Media catalog, artifact store and metadata cache
pub mod library;

/// Persisted catalog ID overrides
pub mod overrides;

/// Scan process control, status watching and event fan-out
pub mod scan;

/// Plain data types shared across the crate and its consumers
pub mod types;

pub mod util;

pub use error::{MediaError, Result};
pub use types::{
    ArtifactKind, ArtifactSet, BestEffort, LogEntry, LogLevel, LogStream,
    MediaKey, MediaType, ScanCompletion, ScanEvent, ScanState, ScanStatus,
};

/// Embedded schema migrations for the override store.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
