//! Script - One script file owned by a library

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths;
use super::process::ProcessHandle;

/// Lock overlay on top of the run state. Only force-start produces `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Lock {
    #[default]
    Unlocked,
    Locked,
}

/// Run state of a script.
///
/// `running` and `paused` describe the live process and are never persisted;
/// the lock is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptState {
    #[serde(skip)]
    running: bool,
    #[serde(skip)]
    paused: bool,
    #[serde(default)]
    lock: Lock,
}

/// A script file and the process running it, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Normalised file path, also the identifier
    pub path: PathBuf,
    /// Display name (file stem)
    pub name: String,
    state: ScriptState,
    /// Present iff the script is running
    #[serde(skip)]
    process: Option<ProcessHandle>,
}

impl Script {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: paths::display_name(&path),
            path,
            state: ScriptState::default(),
            process: None,
        }
    }

    pub fn identifier(&self) -> &Path {
        &self.path
    }

    pub fn has_id(&self, identifier: &Path) -> bool {
        self.path == identifier
    }

    pub fn exists(&self) -> bool {
        paths::is_file(&self.path)
    }

    pub fn is_running(&self) -> bool {
        self.state.running
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock == Lock::Locked
    }

    pub fn lock_state(&self) -> Lock {
        self.state.lock
    }

    pub fn process(&self) -> Option<&ProcessHandle> {
        self.process.as_ref()
    }

    pub fn status_label(&self) -> &'static str {
        match (self.is_running(), self.is_paused()) {
            (true, _) => "Running",
            (false, true) => "Paused",
            (false, false) => "Stopped",
        }
    }

    /// Attach a freshly launched process
    pub(crate) fn mark_started(&mut self, handle: ProcessHandle) {
        self.process = Some(handle);
        self.state.running = true;
        self.state.paused = false;
    }

    /// Detach the process, returning to `Stopped`
    pub(crate) fn mark_stopped(&mut self) {
        self.process = None;
        self.state.running = false;
        self.state.paused = false;
    }

    /// Detach the process, remembering that it should come back on resume
    pub(crate) fn mark_paused(&mut self) {
        self.process = None;
        self.state.running = false;
        self.state.paused = true;
    }

    pub(crate) fn lock(&mut self) {
        self.state.lock = Lock::Locked;
    }
}
