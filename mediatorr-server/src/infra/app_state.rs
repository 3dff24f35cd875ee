use std::{fmt, sync::Arc};

use mediatorr_config::Config;
use mediatorr_core::library::MediaCatalog;
use mediatorr_core::scan::{ScanEventBus, ScanProcessManager, StatusWatcher};

use super::settings::JobSettingsStore;

pub const TMDB_IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub catalog: Arc<MediaCatalog>,
    pub scan: ScanProcessManager,
    pub watcher: Arc<StatusWatcher>,
    pub events: Arc<ScanEventBus>,
    pub settings: Arc<JobSettingsStore>,
    pub http: reqwest::Client,
    pub image_base_url: Arc<str>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
