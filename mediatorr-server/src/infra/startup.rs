use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use mediatorr_config::Config;
use mediatorr_core::library::{ArtifactStore, MediaCatalog, MetadataCache};
use mediatorr_core::overrides::SqliteOverrideRepository;
use mediatorr_core::scan::{ScanEventBus, ScanProcessManager, StatusWatcher};
use tracing::info;

use super::app_state::{AppState, TMDB_IMAGE_BASE_URL};
use super::settings::JobSettingsStore;

const IMAGE_PROXY_TIMEOUT: Duration = Duration::from_secs(10);

/// Wire every component from configuration. The status watcher is created
/// but not started.
pub async fn build_state(config: Config) -> anyhow::Result<AppState> {
    let overrides = SqliteOverrideRepository::connect(&config.database.path)
        .await
        .with_context(|| {
            format!(
                "failed to open override store at {}",
                config.database.path.display()
            )
        })?;

    let store = ArtifactStore::new(
        &config.library.torrent_root,
        MetadataCache::new(&config.library.tmdb_cache, &config.library.itunes_cache),
    );
    let catalog = MediaCatalog::new(
        store,
        Arc::new(overrides),
        &config.library.status_file,
    );

    let events = Arc::new(ScanEventBus::new(config.events.bus_config()));
    let watcher = StatusWatcher::new(config.watcher_config(), Arc::clone(&events));
    let scan = ScanProcessManager::new(config.process_config(), Arc::clone(&events));

    let http = reqwest::Client::builder()
        .timeout(IMAGE_PROXY_TIMEOUT)
        .build()
        .context("failed to build HTTP client")?;

    info!(
        root = %config.library.torrent_root.display(),
        status_file = %config.library.status_file.display(),
        command = %config.scan.command(),
        "application state ready"
    );

    Ok(AppState {
        settings: Arc::new(JobSettingsStore::new(&config.library.settings_file)),
        config: Arc::new(config),
        catalog: Arc::new(catalog),
        scan,
        watcher: Arc::new(watcher),
        events,
        http,
        image_base_url: Arc::from(TMDB_IMAGE_BASE_URL),
    })
}
