//! User-facing failure texts and collaborator errors

use std::path::PathBuf;

use thiserror::Error;

/// Texts recorded into [`Diagnostics`](super::Diagnostics) by managers and services
#[derive(Debug, Error)]
pub enum CoreError {
    // Library
    #[error("Library already exists, reload library: {}", .0.display())]
    LibraryAlreadyExists(PathBuf),
    #[error("Could not find library: {}", .0.display())]
    LibraryNotFound(PathBuf),
    #[error("Library path does not exist: {}", .0.display())]
    LibraryPathMissing(PathBuf),
    #[error("Library path does not exist, library removed: {}", .0.display())]
    LibraryRemovedMissing(PathBuf),
    #[error("Could not remove library, some script can not be removed: {}", .0.display())]
    LibraryScriptsStillLive(PathBuf),

    // Script
    #[error("Could not find script: {}", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("Could not refresh script, script removed: {}", .0.display())]
    ScriptFileMissing(PathBuf),
    #[error("Could not start locked script: {}", .0.display())]
    StartLocked(PathBuf),
    #[error("Script is locked and already running: {}", .0.display())]
    LockedAlreadyRunning(PathBuf),
    #[error("Could not stop script, script locked: {}", .0.display())]
    StopLocked(PathBuf),
    #[error("Could not pause script, script locked: {}", .0.display())]
    PauseLocked(PathBuf),
    #[error("Could not resume script, script locked: {}", .0.display())]
    ResumeLocked(PathBuf),
    #[error("Could not restart script, script locked: {}", .0.display())]
    RestartLocked(PathBuf),
    #[error("Could not start script: {}: {source}", .path.display())]
    StartFailed { path: PathBuf, source: ProcessError },
    #[error("Could not stop script: {}: {source}", .path.display())]
    StopFailed { path: PathBuf, source: ProcessError },
    #[error("Could not remove script, could not stop script: {}", .0.display())]
    RemoveStillRunning(PathBuf),
    #[error("Script process exited on its own: {}", .0.display())]
    ProcessExited(PathBuf),

    // Profile
    #[error("Profile name already exists: {0}")]
    ProfileExists(String),
    #[error("Could not find profile: {0}")]
    ProfileNotFound(String),
    #[error("Profile already contains script: {}", .0.display())]
    ProfileHasScript(PathBuf),
    #[error("Script not in profile: Profile: {profile}, Script: {}", .script.display())]
    ScriptNotInProfile { profile: String, script: PathBuf },
    #[error("Removed missing script from profile {profile}: {}", .script.display())]
    ProfileScriptPruned { profile: String, script: PathBuf },

    // Filesystem
    #[error("Path is not a valid directory path: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("Directory has no script files: {}", .0.display())]
    DirectoryEmpty(PathBuf),
    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    #[error("Path is not a script file: {}", .0.display())]
    NotAScriptFile(PathBuf),
    #[error("Could not open path: {}", .0.display())]
    CouldNotOpen(PathBuf),
}

/// Failures reported by a [`ProcessLauncher`](super::process::ProcessLauncher)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessError {
    #[error("interpreter not found: {}", .0.display())]
    ExecutableNotFound(PathBuf),
    #[error("script file not found: {}", .0.display())]
    ScriptNotFound(PathBuf),
    #[error("failed to spawn process: {0}")]
    Spawn(String),
    #[error("failed to terminate process {pid}: {reason}")]
    Terminate { pid: u32, reason: String },
    #[error("process table lock poisoned")]
    Poisoned,
}
