use std::{
    collections::VecDeque,
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::warn;

use crate::types::{LogEntry, LogStream, ScanCompletion, ScanEvent, ScanStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventBusConfig {
    /// Capacity of the log ring buffer replayed to late clients.
    pub log_capacity: usize,
    /// Per-subscriber backlog before a slow subscriber starts lagging.
    pub broadcast_capacity: usize,
    /// Live subscribers above this count are reported as a probable leak.
    pub max_subscribers: usize,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            log_capacity: 200,
            broadcast_capacity: 256,
            max_subscribers: 50,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanEventFrame {
    pub sequence: u64,
    pub emitted_at: Instant,
    pub event: ScanEvent,
}

/// Publish/subscribe hub for scan activity.
///
/// Producers never block: a subscriber that falls more than
/// `broadcast_capacity` frames behind skips ahead instead.
#[derive(Debug)]
pub struct ScanEventBus {
    tx: broadcast::Sender<ScanEventFrame>,
    logs: Mutex<VecDeque<LogEntry>>,
    log_capacity: usize,
    max_subscribers: usize,
    sequence: AtomicU64,
}

impl ScanEventBus {
    pub fn new(config: EventBusConfig) -> Self {
        let log_capacity = config.log_capacity.max(1);
        let (tx, _rx) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            tx,
            logs: Mutex::new(VecDeque::with_capacity(log_capacity)),
            log_capacity,
            max_subscribers: config.max_subscribers,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> ScanSubscription {
        let current = self.tx.receiver_count();
        if current >= self.max_subscribers {
            warn!(
                subscribers = current + 1,
                limit = self.max_subscribers,
                "scan event subscribers above limit; possible leak"
            );
        }
        ScanSubscription {
            rx: self.tx.subscribe(),
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Classify a raw output line, record it, and broadcast it.
    pub fn publish_log(
        &self,
        stream: LogStream,
        message: impl Into<String>,
    ) -> LogEntry {
        let entry = LogEntry::new(stream, message);
        {
            let mut logs = self.logs.lock();
            if logs.len() == self.log_capacity {
                logs.pop_front();
            }
            logs.push_back(entry.clone());
        }
        self.publish(ScanEvent::Log(entry.clone()));
        entry
    }

    pub fn publish_progress(&self, status: ScanStatus) -> ScanEventFrame {
        self.publish(ScanEvent::Progress(status))
    }

    pub fn publish_complete(&self, completion: ScanCompletion) -> ScanEventFrame {
        self.publish(ScanEvent::Complete(completion))
    }

    /// Ring buffer contents, oldest first.
    pub fn log_buffer(&self) -> Vec<LogEntry> {
        self.logs.lock().iter().cloned().collect()
    }

    fn publish(&self, event: ScanEvent) -> ScanEventFrame {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = ScanEventFrame {
            sequence,
            emitted_at: Instant::now(),
            event,
        };
        // No receivers is not an error.
        let _ = self.tx.send(frame.clone());
        frame
    }
}

/// A live registration on the bus. Dropping it deregisters.
#[derive(Debug)]
pub struct ScanSubscription {
    rx: broadcast::Receiver<ScanEventFrame>,
}

impl ScanSubscription {
    /// Next frame, or `None` once the bus is gone. Lagged frames are
    /// skipped with a warning.
    pub async fn recv(&mut self) -> Option<ScanEventFrame> {
        loop {
            match self.rx.recv().await {
                Ok(frame) => return Some(frame),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "scan event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_receiver(self) -> broadcast::Receiver<ScanEventFrame> {
        self.rx
    }
}
