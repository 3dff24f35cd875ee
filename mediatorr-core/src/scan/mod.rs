pub mod event_bus;
pub mod process;
pub mod status_file;
pub mod status_watcher;

pub use event_bus::{EventBusConfig, ScanEventBus, ScanEventFrame, ScanSubscription};
pub use process::{
    ScanCommand, ScanControlError, ScanPhase, ScanProcessConfig,
    ScanProcessManager, ScanStarted, ScanStopped,
};
pub use status_watcher::{StatusWatcher, WatcherConfig};
