//! Child-process lifecycle management.
//!
//! Spawning with per-stream redirection, asynchronous wait, and signal
//! delivery. Resolved addresses feed into connection establishment elsewhere;
//! this subsystem is the runtime's other native collaborator and follows the
//! same rule as resolution: blocking work never runs on a scheduler thread
//! (waiting is async via the runtime's process integration).

use std::collections::HashMap;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::Stdio;

use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

/// Highest deliverable signal number (POSIX real-time range included).
pub const SIGNAL_MAX: i32 = 64;

/// Returns `true` if `sig` is in the valid signal range `[1, SIGNAL_MAX]`.
#[must_use]
pub const fn valid_signal(sig: i32) -> bool {
    sig >= 1 && sig <= SIGNAL_MAX
}

/// Failure of a process lifecycle operation.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The child could not be started.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    /// No tracked child with this pid.
    #[error("process {0} is not tracked")]
    NotFound(u32),

    /// Waiting on the child failed.
    #[error("wait on process {pid} failed: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// The signal number is outside `[1, SIGNAL_MAX]`.
    #[error("signal {0} out of range")]
    InvalidSignal(i32),

    /// The kernel refused the signal delivery.
    #[error("delivering signal {signal} to process {pid} failed: {source}")]
    Signal {
        pid: u32,
        signal: i32,
        #[source]
        source: io::Error,
    },
}

/// Disposition of one standard stream of a child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StdioPolicy {
    /// Share the parent's descriptor.
    #[default]
    Inherit,
    /// Attach the null device.
    Null,
    /// Redirect through a pipe owned by the parent.
    Piped,
}

impl StdioPolicy {
    fn to_stdio(self) -> Stdio {
        match self {
            StdioPolicy::Inherit => Stdio::inherit(),
            StdioPolicy::Null => Stdio::null(),
            StdioPolicy::Piped => Stdio::piped(),
        }
    }
}

/// Everything needed to start a child process.
#[derive(Debug, Clone, Default)]
pub struct SpawnConfig {
    /// Program to execute (resolved through `PATH` unless absolute).
    pub program: String,
    /// Arguments, not including the program name.
    pub args: Vec<String>,
    /// Extra environment entries.
    pub env: Vec<(String, String)>,
    /// Start from an empty environment instead of inheriting.
    pub clear_env: bool,
    /// Working directory for the child.
    pub cwd: Option<PathBuf>,
    /// Standard input disposition.
    pub stdin: StdioPolicy,
    /// Standard output disposition.
    pub stdout: StdioPolicy,
    /// Standard error disposition.
    pub stderr: StdioPolicy,
}

impl SpawnConfig {
    /// A config that inherits all three streams.
    pub fn new(program: impl Into<String>) -> Self {
        SpawnConfig {
            program: program.into(),
            ..SpawnConfig::default()
        }
    }
}

/// Pipe ends handed back for a freshly spawned child.
///
/// Each field is present only when the matching stream was `Piped`.
#[derive(Debug)]
pub struct SpawnedProcess {
    /// OS process id of the child.
    pub pid: u32,
    pub stdin: Option<ChildStdin>,
    pub stdout: Option<ChildStdout>,
    pub stderr: Option<ChildStderr>,
}

/// Captured result of a run-to-completion child.
#[derive(Debug)]
pub struct CapturedOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Registry of live children.
///
/// Spawn inserts; wait and kill remove before consuming the handle, so a pid
/// is owned by exactly one waiter.
#[derive(Default)]
pub struct ProcessManager {
    table: Mutex<HashMap<u32, Child>>,
}

impl ProcessManager {
    pub fn new() -> Self {
        ProcessManager::default()
    }

    /// Starts a child and registers it.
    pub fn spawn(&self, config: &SpawnConfig) -> Result<SpawnedProcess, ProcessError> {
        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args)
            .stdin(config.stdin.to_stdio())
            .stdout(config.stdout.to_stdio())
            .stderr(config.stderr.to_stdio());
        if config.clear_env {
            cmd.env_clear();
        }
        for (key, value) in &config.env {
            cmd.env(key, value);
        }
        if let Some(ref dir) = config.cwd {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: config.program.clone(),
            source,
        })?;
        let Some(pid) = child.id() else {
            return Err(ProcessError::Spawn {
                command: config.program.clone(),
                source: io::Error::other("child exited before its pid was read"),
            });
        };
        debug!("spawned `{}` as pid {pid}", config.program);

        let spawned = SpawnedProcess {
            pid,
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            stderr: child.stderr.take(),
        };
        self.table.lock().insert(pid, child);
        Ok(spawned)
    }

    /// Waits for a child to exit and returns its exit code.
    ///
    /// A signal-terminated child reports the shell convention
    /// `128 + signal`. The pid is removed from the registry before waiting.
    pub async fn wait(&self, pid: u32) -> Result<i32, ProcessError> {
        let mut child = self
            .table
            .lock()
            .remove(&pid)
            .ok_or(ProcessError::NotFound(pid))?;
        let status = child
            .wait()
            .await
            .map_err(|source| ProcessError::Wait { pid, source })?;
        let code = status
            .code()
            .unwrap_or_else(|| 128 + status.signal().unwrap_or(0));
        debug!("pid {pid} exited with code {code}");
        Ok(code)
    }

    /// Forcibly terminates a child and reaps it.
    pub async fn kill(&self, pid: u32) -> Result<(), ProcessError> {
        let mut child = self
            .table
            .lock()
            .remove(&pid)
            .ok_or(ProcessError::NotFound(pid))?;
        child
            .kill()
            .await
            .map_err(|source| ProcessError::Wait { pid, source })?;
        debug!("killed pid {pid}");
        Ok(())
    }

    /// Delivers `signal` to a tracked child without reaping it.
    pub fn signal(&self, pid: u32, signal: i32) -> Result<(), ProcessError> {
        if !valid_signal(signal) {
            return Err(ProcessError::InvalidSignal(signal));
        }
        if !self.table.lock().contains_key(&pid) {
            return Err(ProcessError::NotFound(pid));
        }
        // SAFETY: plain kill(2) on a pid this registry spawned.
        let rc = unsafe { libc::kill(pid as i32, signal) };
        if rc != 0 {
            let source = io::Error::last_os_error();
            warn!("signal {signal} to pid {pid} failed: {source}");
            return Err(ProcessError::Signal {
                pid,
                signal,
                source,
            });
        }
        Ok(())
    }

    /// Pids currently tracked (spawned and not yet waited or killed).
    pub fn running(&self) -> Vec<u32> {
        self.table.lock().keys().copied().collect()
    }

    /// Runs a child to completion with both output streams captured.
    ///
    /// Streams are drained before waiting so a chatty child cannot deadlock
    /// on a full pipe.
    pub async fn run_captured(&self, config: &SpawnConfig) -> Result<CapturedOutput, ProcessError> {
        let mut config = config.clone();
        config.stdin = StdioPolicy::Null;
        config.stdout = StdioPolicy::Piped;
        config.stderr = StdioPolicy::Piped;

        let mut spawned = self.spawn(&config)?;
        let pid = spawned.pid;
        // Drained together: one stream at a time would deadlock on a child
        // that fills the other pipe first.
        let (stdout, stderr) = tokio::join!(
            drain_pipe(spawned.stdout.take()),
            drain_pipe(spawned.stderr.take()),
        );
        let stdout = stdout.map_err(|source| ProcessError::Wait { pid, source })?;
        let stderr = stderr.map_err(|source| ProcessError::Wait { pid, source })?;
        let exit_code = self.wait(pid).await?;
        Ok(CapturedOutput {
            exit_code,
            stdout,
            stderr,
        })
    }
}

async fn drain_pipe<R>(pipe: Option<R>) -> io::Result<Vec<u8>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_range_is_validated() {
        assert!(valid_signal(1));
        assert!(valid_signal(9));
        assert!(valid_signal(SIGNAL_MAX));
        assert!(!valid_signal(0));
        assert!(!valid_signal(-1));
        assert!(!valid_signal(SIGNAL_MAX + 1));
    }

    #[test]
    fn default_config_inherits_all_streams() {
        let config = SpawnConfig::new("true");
        assert_eq!(config.stdin, StdioPolicy::Inherit);
        assert_eq!(config.stdout, StdioPolicy::Inherit);
        assert_eq!(config.stderr, StdioPolicy::Inherit);
        assert!(!config.clear_env);
    }

    #[tokio::test]
    async fn wait_on_unknown_pid_is_not_found() {
        let manager = ProcessManager::new();
        assert!(matches!(
            manager.wait(424242).await,
            Err(ProcessError::NotFound(424242))
        ));
    }

    #[tokio::test]
    async fn invalid_signal_is_rejected_before_lookup() {
        let manager = ProcessManager::new();
        assert!(matches!(
            manager.signal(1, 0),
            Err(ProcessError::InvalidSignal(0))
        ));
    }
}
