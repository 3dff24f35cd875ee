//! Reading and writing the status document shared with the scan job.

use std::path::Path;

use crate::types::{BestEffort, ScanStatus};
use crate::util::write_atomic;

pub async fn read(path: &Path) -> BestEffort<ScanStatus> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return BestEffort::Absent;
        }
        Err(e) => return BestEffort::Malformed(e.to_string()),
    };

    match serde_json::from_str(&raw) {
        Ok(status) => BestEffort::Present(status),
        Err(e) => BestEffort::Malformed(e.to_string()),
    }
}

/// Replace the file atomically so the scan job and the watcher never
/// observe a half-written document.
pub async fn write(path: &Path, status: &ScanStatus) -> std::io::Result<()> {
    let body = serde_json::to_vec_pretty(status)?;
    write_atomic(path, &body).await
}
