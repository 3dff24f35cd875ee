use std::fmt;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::event_bus::ScanEventBus;
use super::status_file;
use crate::types::{
    LogStream, ProcessExit, ScanCompletion, ScanState, ScanStatus,
};

pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(5);

/// Upper bound on waiting for the output readers after the child exits.
/// Grandchildren can keep the pipes open long after the child is gone.
const READER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum ScanControlError {
    #[error("scan already in progress")]
    AlreadyRunning,
    #[error("no scan is running")]
    NotRunning,
    #[error("scan is already stopping")]
    StopInProgress,
    #[error("failed to start scan: {0}")]
    Spawn(#[source] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ScanCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ScanCommand {
    fn default() -> Self {
        Self::new("node", ["/app/scene-maker.js"])
    }
}

impl fmt::Display for ScanCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProcessConfig {
    pub command: ScanCommand,
    pub status_file: PathBuf,
    /// Time between SIGTERM and SIGKILL on stop.
    pub stop_grace: Duration,
}

impl ScanProcessConfig {
    pub fn new(command: ScanCommand, status_file: impl Into<PathBuf>) -> Self {
        Self {
            command,
            status_file: status_file.into(),
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }

    pub fn with_stop_grace(mut self, stop_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Starting,
    Running,
    Stopping,
    /// The process has exited and its output is being drained.
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStarted {
    pub pid: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanStopped {
    pub pid: Option<u32>,
}

#[derive(Debug)]
enum PhaseState {
    Idle,
    Starting,
    Running {
        pid: Option<u32>,
        stop_tx: oneshot::Sender<()>,
    },
    Stopping {
        pid: Option<u32>,
    },
    Exiting {
        pid: Option<u32>,
    },
}

impl PhaseState {
    fn phase(&self) -> ScanPhase {
        match self {
            PhaseState::Idle => ScanPhase::Idle,
            PhaseState::Starting => ScanPhase::Starting,
            PhaseState::Running { .. } => ScanPhase::Running,
            PhaseState::Stopping { .. } => ScanPhase::Stopping,
            PhaseState::Exiting { .. } => ScanPhase::Exiting,
        }
    }
}

#[derive(Debug)]
struct ManagerInner {
    config: ScanProcessConfig,
    bus: Arc<ScanEventBus>,
    state: Mutex<PhaseState>,
}

/// Owner of the single external scan process.
///
/// The phase is the only gate: a scan can start only from `Idle`, and the
/// supervisor task returns the phase to `Idle` before announcing the exit,
/// so a subscriber reacting to the completion can immediately trigger again.
#[derive(Debug, Clone)]
pub struct ScanProcessManager {
    inner: Arc<ManagerInner>,
}

impl ScanProcessManager {
    pub fn new(config: ScanProcessConfig, bus: Arc<ScanEventBus>) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                bus,
                state: Mutex::new(PhaseState::Idle),
            }),
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.inner.state.lock().phase()
    }

    pub fn is_running(&self) -> bool {
        self.phase() != ScanPhase::Idle
    }

    /// Start the scan job. Must be called from within a Tokio runtime.
    #[instrument(skip(self))]
    pub fn trigger(&self) -> Result<ScanStarted, ScanControlError> {
        {
            let mut state = self.inner.state.lock();
            if !matches!(*state, PhaseState::Idle) {
                return Err(ScanControlError::AlreadyRunning);
            }
            *state = PhaseState::Starting;
        }

        let command = &self.inner.config.command;
        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                *self.inner.state.lock() = PhaseState::Idle;
                error!(%command, error = %e, "failed to spawn scan");
                self.inner.bus.publish_log(
                    LogStream::System,
                    format!("\u{274C} Failed to start scan: {e}"),
                );
                return Err(ScanControlError::Spawn(e));
            }
        };

        let pid = child.id();
        let mut readers = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(
                stdout,
                LogStream::Stdout,
                Arc::clone(&self.inner.bus),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(
                stderr,
                LogStream::Stderr,
                Arc::clone(&self.inner.bus),
            ));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        *self.inner.state.lock() = PhaseState::Running { pid, stop_tx };

        info!(%command, pid, "scan started");
        self.inner
            .bus
            .publish_log(LogStream::System, format!("Scan started ({command})"));

        tokio::spawn(supervise(
            Arc::clone(&self.inner),
            child,
            stop_rx,
            readers,
        ));

        Ok(ScanStarted { pid })
    }

    /// Ask the running scan to terminate and mark the status file as
    /// manually stopped. The completion event follows once the process has
    /// actually exited.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> Result<ScanStopped, ScanControlError> {
        let (pid, stop_tx) = {
            let mut state = self.inner.state.lock();
            match std::mem::replace(&mut *state, PhaseState::Idle) {
                PhaseState::Running { pid, stop_tx } => {
                    *state = PhaseState::Stopping { pid };
                    (pid, stop_tx)
                }
                other => {
                    let err = match &other {
                        PhaseState::Stopping { pid } => {
                            debug!(pid, "stop already requested");
                            ScanControlError::StopInProgress
                        }
                        PhaseState::Exiting { pid } => {
                            debug!(pid, "scan already exited; nothing to stop");
                            ScanControlError::NotRunning
                        }
                        _ => ScanControlError::NotRunning,
                    };
                    *state = other;
                    return Err(err);
                }
            }
        };

        if stop_tx.send(()).is_err() {
            debug!(pid, "supervisor already finished");
        }

        info!(pid, "scan stop requested");
        self.inner
            .bus
            .publish_log(LogStream::System, "Scan stop requested");

        let path = &self.inner.config.status_file;
        let previous = status_file::read(path).await.ok();
        if let Err(e) =
            status_file::write(path, &ScanStatus::stopped_manually(previous))
                .await
        {
            warn!(
                path = %path.display(),
                error = %e,
                "failed to mark status file as stopped"
            );
        }

        Ok(ScanStopped { pid })
    }
}

fn spawn_reader<R>(
    reader: R,
    stream: LogStream,
    bus: Arc<ScanEventBus>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        bus.publish_log(stream, line);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(?stream, error = %e, "scan output reader stopped");
                    break;
                }
            }
        }
    })
}

async fn supervise(
    inner: Arc<ManagerInner>,
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
    readers: Vec<JoinHandle<()>>,
) {
    let status = tokio::select! {
        status = child.wait() => status,
        Ok(()) = &mut stop_rx => terminate(&mut child, inner.config.stop_grace).await,
    };

    // An exited run is no longer stoppable while its output drains.
    {
        let mut state = inner.state.lock();
        let exited_pid = match &*state {
            PhaseState::Running { pid, .. } => Some(*pid),
            _ => None,
        };
        if let Some(pid) = exited_pid {
            *state = PhaseState::Exiting { pid };
        }
    }

    if tokio::time::timeout(
        READER_DRAIN_TIMEOUT,
        futures::future::join_all(readers),
    )
    .await
    .is_err()
    {
        debug!("scan output readers still open after exit; detaching");
    }

    let (exit_code, signal) = match &status {
        Ok(status) => exit_details(status),
        Err(e) => {
            error!(error = %e, "failed to wait for scan process");
            (None, None)
        }
    };

    *inner.state.lock() = PhaseState::Idle;

    info!(exit_code, signal, "scan process exited");
    inner.bus.publish_complete(ScanCompletion::ProcessExit(ProcessExit {
        state: ScanState::Idle,
        exit_code,
        signal,
        timestamp: Utc::now(),
    }));
}

/// Graceful termination first, then SIGKILL once `grace` has elapsed.
async fn terminate(
    child: &mut Child,
    grace: Duration,
) -> std::io::Result<ExitStatus> {
    if let Err(e) = request_termination(child) {
        warn!(error = %e, "failed to signal scan process");
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(status) => status,
        Err(_) => {
            warn!(
                grace_ms = grace.as_millis() as u64,
                "scan ignored termination request; killing"
            );
            child.kill().await?;
            child.wait().await
        }
    }
}

#[cfg(unix)]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(std::io::Error::other)?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(std::io::Error::from)
}

#[cfg(not(unix))]
fn request_termination(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}

#[cfg(unix)]
fn exit_details(status: &ExitStatus) -> (Option<i32>, Option<i32>) {
    use std::os::unix::process::ExitStatusExt;
    (status.code(), status.signal())
}

#[cfg(not(unix))]
fn exit_details(status: &ExitStatus) -> (Option<i32>, Option<i32>) {
    (status.code(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::EventBusConfig;

    fn manager(program: &str) -> ScanProcessManager {
        let bus = Arc::new(ScanEventBus::new(EventBusConfig::default()));
        ScanProcessManager::new(
            ScanProcessConfig::new(
                ScanCommand::new(program, Vec::<String>::new()),
                "/nonexistent/status.json",
            ),
            bus,
        )
    }

    #[tokio::test]
    async fn stop_without_a_scan_is_rejected() {
        let manager = manager("/bin/true");
        assert!(matches!(
            manager.stop().await,
            Err(ScanControlError::NotRunning)
        ));
        assert_eq!(manager.phase(), ScanPhase::Idle);
    }

    #[tokio::test]
    async fn spawn_failure_returns_to_idle() {
        let manager = manager("/definitely/not/a/binary");
        assert!(matches!(
            manager.trigger(),
            Err(ScanControlError::Spawn(_))
        ));
        assert!(!manager.is_running());
    }

    #[test]
    fn command_display_joins_args() {
        let command = ScanCommand::default();
        assert_eq!(command.to_string(), "node /app/scene-maker.js");
    }
}
