//! Process management - Launching and terminating script interpreters

use std::collections::HashMap;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::error::ProcessError;
use crate::platform;

/// Opaque handle to a launched script process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub started_at: DateTime<Utc>,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            started_at: Utc::now(),
        }
    }

    /// Format uptime as human-readable string
    pub fn uptime_string(&self) -> String {
        let secs = (Utc::now() - self.started_at).num_seconds().max(0);
        if secs < 60 {
            format!("{}s", secs)
        } else if secs < 3600 {
            format!("{}m {}s", secs / 60, secs % 60)
        } else if secs < 86400 {
            format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
        } else {
            format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
        }
    }
}

/// Starts and stops the OS processes that run scripts
pub trait ProcessLauncher: Send + Sync {
    /// Run `script` with the interpreter at `executable`
    fn launch(&self, executable: &Path, script: &Path) -> Result<ProcessHandle, ProcessError>;

    /// Terminate a previously launched process
    fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError>;

    /// Whether the process behind `handle` is still alive
    fn is_alive(&self, handle: &ProcessHandle) -> bool;
}

/// [`ProcessLauncher`] backed by `std::process`
#[derive(Default)]
pub struct ProcessManager {
    /// Running child processes keyed by pid
    children: RwLock<HashMap<u32, Child>>,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of running processes
    pub fn running_count(&self) -> usize {
        self.children.read().map(|c| c.len()).unwrap_or(0)
    }
}

impl ProcessLauncher for ProcessManager {
    fn launch(&self, executable: &Path, script: &Path) -> Result<ProcessHandle, ProcessError> {
        info!("Launching {:?} with {:?}", script, executable);

        // Bare names are resolved through PATH by the OS
        if executable.components().count() > 1 && !executable.exists() {
            return Err(ProcessError::ExecutableNotFound(executable.to_path_buf()));
        }
        if !script.is_file() {
            return Err(ProcessError::ScriptNotFound(script.to_path_buf()));
        }

        let mut cmd = Command::new(executable);
        cmd.arg(script);
        if let Some(parent) = script.parent() {
            cmd.current_dir(parent);
        }
        platform::detach(&mut cmd);

        let child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ProcessError::Spawn(e.to_string()))?;

        let pid = child.id();
        info!("Spawned process with PID {}", pid);

        self.children
            .write()
            .map_err(|_| ProcessError::Poisoned)?
            .insert(pid, child);

        Ok(ProcessHandle::new(pid))
    }

    fn terminate(&self, handle: &ProcessHandle) -> Result<(), ProcessError> {
        let mut children = self.children.write().map_err(|_| ProcessError::Poisoned)?;

        let Some(mut child) = children.remove(&handle.pid) else {
            if platform::is_process_running(handle.pid) {
                return Err(ProcessError::Terminate {
                    pid: handle.pid,
                    reason: "process is not owned by this session".to_string(),
                });
            }
            debug!("Process {} already gone", handle.pid);
            return Ok(());
        };

        if let Ok(Some(status)) = child.try_wait() {
            debug!("Process {} had already exited: {}", handle.pid, status);
            return Ok(());
        }

        if let Err(e) = child.kill() {
            warn!("Failed to kill process {}: {}", handle.pid, e);
            let reason = e.to_string();
            children.insert(handle.pid, child);
            return Err(ProcessError::Terminate {
                pid: handle.pid,
                reason,
            });
        }

        // Reap so the pid is not left as a zombie
        if let Err(e) = child.wait() {
            warn!("Failed to reap process {}: {}", handle.pid, e);
        }
        info!("Terminated process {}", handle.pid);
        Ok(())
    }

    fn is_alive(&self, handle: &ProcessHandle) -> bool {
        let Ok(mut children) = self.children.write() else {
            return false;
        };

        match children.get_mut(&handle.pid).map(|c| c.try_wait()) {
            Some(Ok(None)) => true,
            Some(Ok(Some(_))) | Some(Err(_)) => {
                children.remove(&handle.pid);
                false
            }
            None => platform::is_process_running(handle.pid),
        }
    }
}
