use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::event_bus::ScanEventBus;
use super::status_file;
use crate::types::{BestEffort, ScanCompletion, ScanEvent, ScanState, ScanStatus};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    pub status_file: PathBuf,
    pub poll_interval: Duration,
}

impl WatcherConfig {
    pub fn new(status_file: impl Into<PathBuf>) -> Self {
        Self {
            status_file: status_file.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

#[derive(Debug)]
struct WatcherInner {
    config: WatcherConfig,
    bus: Arc<ScanEventBus>,
    last_known: Mutex<Option<ScanStatus>>,
}

#[derive(Debug)]
struct PollTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Polls the shared status file and turns semantic changes into events.
///
/// A change to any field, including ones this crate does not interpret,
/// produces exactly one event. Rewrites with identical content produce
/// none.
#[derive(Debug)]
pub struct StatusWatcher {
    inner: Arc<WatcherInner>,
    task: Mutex<Option<PollTask>>,
}

impl StatusWatcher {
    pub fn new(config: WatcherConfig, bus: Arc<ScanEventBus>) -> Self {
        Self {
            inner: Arc::new(WatcherInner {
                config,
                bus,
                last_known: Mutex::new(None),
            }),
            task: Mutex::new(None),
        }
    }

    /// Run one tick now. Returns the event it emitted, if any.
    pub async fn poll_once(&self) -> Option<ScanEvent> {
        self.inner.tick().await
    }

    /// Last status seen by the poller, else a direct read, else idle.
    pub async fn last_status(&self) -> ScanStatus {
        if let Some(status) = self.inner.last_known.lock().clone() {
            return status;
        }
        status_file::read(&self.inner.config.status_file)
            .await
            .ok()
            .unwrap_or_else(ScanStatus::idle)
    }

    /// Spawn the polling task. Calling it while already started is a no-op.
    pub fn start(&self) {
        let mut task = self.task.lock();
        if task.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(inner.config.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        inner.tick().await;
                    }
                }
            }
            debug!("status watcher stopped");
        });

        info!(
            file = %self.inner.config.status_file.display(),
            interval_ms = self.inner.config.poll_interval.as_millis() as u64,
            "status watcher started"
        );
        *task = Some(PollTask { cancel, handle });
    }

    /// Cancel the polling task. Idempotent.
    pub fn stop(&self) {
        if let Some(task) = self.task.lock().take() {
            task.cancel.cancel();
            drop(task.handle);
        }
    }

    pub fn is_started(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl Drop for StatusWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl WatcherInner {
    async fn tick(&self) -> Option<ScanEvent> {
        let status = match status_file::read(&self.config.status_file).await {
            BestEffort::Present(status) => status,
            BestEffort::Absent => {
                debug!("status file absent");
                return None;
            }
            BestEffort::Malformed(reason) => {
                debug!(%reason, "status file unreadable; skipping tick");
                return None;
            }
        };

        {
            let mut last_known = self.last_known.lock();
            if last_known.as_ref() == Some(&status) {
                return None;
            }
            *last_known = Some(status.clone());
        }

        match status.state() {
            ScanState::Running => {
                Some(self.bus.publish_progress(status).event)
            }
            ScanState::Idle => Some(
                self.bus
                    .publish_complete(ScanCompletion::Status(status))
                    .event,
            ),
            ScanState::Unknown => {
                debug!("status file has an unrecognised state");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::EventBusConfig;

    fn watcher(dir: &tempfile::TempDir) -> (StatusWatcher, Arc<ScanEventBus>, PathBuf) {
        let path = dir.path().join("status.json");
        let bus = Arc::new(ScanEventBus::new(EventBusConfig::default()));
        let watcher = StatusWatcher::new(WatcherConfig::new(&path), Arc::clone(&bus));
        (watcher, bus, path)
    }

    #[tokio::test]
    async fn unchanged_status_emits_once() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _bus, path) = watcher(&dir);
        std::fs::write(&path, r#"{"state":"running","current":1,"total":3}"#).unwrap();

        let first = watcher.poll_once().await;
        assert!(matches!(first, Some(ScanEvent::Progress(_))));
        assert!(watcher.poll_once().await.is_none());

        // Same content, rewritten.
        std::fs::write(&path, r#"{"state":"running","current":1,"total":3}"#).unwrap();
        assert!(watcher.poll_once().await.is_none());
    }

    #[tokio::test]
    async fn idle_transition_completes() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _bus, path) = watcher(&dir);
        std::fs::write(&path, r#"{"state":"running"}"#).unwrap();
        watcher.poll_once().await;

        std::fs::write(&path, r#"{"state":"idle","stats":{"processed":3}}"#).unwrap();
        match watcher.poll_once().await {
            Some(ScanEvent::Complete(ScanCompletion::Status(status))) => {
                assert_eq!(status.state(), ScanState::Idle);
            }
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn loosely_typed_documents_still_emit() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _bus, path) = watcher(&dir);

        std::fs::write(&path, r#"{"state":"running","current":1,"total":3}"#).unwrap();
        assert!(matches!(watcher.poll_once().await, Some(ScanEvent::Progress(_))));

        std::fs::write(
            &path,
            r#"{"state":"running","current":1,"total":3,"lastScan":1760000000000}"#,
        )
        .unwrap();
        assert!(matches!(watcher.poll_once().await, Some(ScanEvent::Progress(_))));

        std::fs::write(&path, r#"{"state":"running","current":2.5,"currentItem":42}"#)
            .unwrap();
        assert!(matches!(watcher.poll_once().await, Some(ScanEvent::Progress(_))));

        std::fs::write(&path, r#"{"state":"idle","lastScan":1760000000000}"#).unwrap();
        assert!(matches!(
            watcher.poll_once().await,
            Some(ScanEvent::Complete(ScanCompletion::Status(_)))
        ));
        assert_eq!(watcher.last_status().await.state(), ScanState::Idle);
    }

    #[tokio::test]
    async fn unknown_state_updates_last_known_silently() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _bus, path) = watcher(&dir);
        std::fs::write(&path, r#"{"state":"paused"}"#).unwrap();

        assert!(watcher.poll_once().await.is_none());
        assert_eq!(watcher.last_status().await.state(), ScanState::Unknown);
    }

    #[tokio::test]
    async fn unreadable_file_is_skipped_and_last_status_defaults_to_idle() {
        let dir = tempfile::tempdir().unwrap();
        let (watcher, _bus, path) = watcher(&dir);

        assert!(watcher.poll_once().await.is_none());
        assert_eq!(watcher.last_status().await, ScanStatus::idle());

        std::fs::write(&path, "not json").unwrap();
        assert!(watcher.poll_once().await.is_none());
        assert_eq!(watcher.last_status().await, ScanStatus::idle());
    }

    #[tokio::test]
    async fn background_polling_publishes_to_the_bus() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("status.json");
        let bus = Arc::new(ScanEventBus::new(EventBusConfig::default()));
        let watcher = StatusWatcher::new(
            WatcherConfig::new(&path).with_poll_interval(Duration::from_millis(20)),
            Arc::clone(&bus),
        );
        let mut subscription = bus.subscribe();
        std::fs::write(&path, r#"{"state":"running","current":2}"#).unwrap();

        watcher.start();
        watcher.start();
        let frame = tokio::time::timeout(Duration::from_secs(5), subscription.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.event.event_name(), "scan:progress");

        watcher.stop();
        watcher.stop();
        assert!(!watcher.is_started());
    }
}
