//! Script manager - State transitions for a single script

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::core::diagnostics::Diagnostics;
use crate::core::error::CoreError;
use crate::core::paths;
use crate::core::process::ProcessLauncher;
use crate::core::script::Script;
use crate::core::settings::Settings;

/// Single entry point for changing one script's run state.
///
/// States are `Stopped`, `Running` and `Paused` with a lock overlay. While
/// locked, every transition other than "already there" is refused.
#[derive(Clone)]
pub struct ScriptManager {
    launcher: Arc<dyn ProcessLauncher>,
    settings: Arc<RwLock<Settings>>,
}

impl ScriptManager {
    pub fn new(launcher: Arc<dyn ProcessLauncher>, settings: Arc<RwLock<Settings>>) -> Self {
        Self { launcher, settings }
    }

    fn executable(&self) -> PathBuf {
        self.settings
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .script_executable
            .clone()
    }

    /// Whether `path` carries one of the configured script extensions
    pub fn has_script_extension(&self, path: &Path) -> bool {
        let settings = self.settings.read().unwrap_or_else(|e| e.into_inner());
        paths::extension(path).is_some_and(|ext| settings.is_script_extension(&ext))
    }

    /// Build a script for an existing file with a recognised extension
    pub fn init(&self, path: &Path) -> (Diagnostics, Option<Script>) {
        let path = paths::format_path(path);
        let diagnostics = self.check_script_file(&path);
        if !diagnostics.success() {
            return (diagnostics, None);
        }
        debug!("Initialized script {:?}", path);
        (diagnostics, Some(Script::new(path)))
    }

    fn check_script_file(&self, path: &Path) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if !paths::is_file(path) {
            diagnostics.add_error(CoreError::NotAFile(path.to_path_buf()));
        } else if !self.has_script_extension(path) {
            diagnostics.add_error(CoreError::NotAScriptFile(path.to_path_buf()));
        }
        diagnostics
    }

    pub fn start(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if script.is_locked() {
            if script.is_running() {
                diagnostics.add_warning(CoreError::LockedAlreadyRunning(script.path.clone()));
            } else {
                diagnostics.add_error(CoreError::StartLocked(script.path.clone()));
            }
            return diagnostics;
        }

        if script.is_running() {
            return diagnostics;
        }

        diagnostics.merge(self.launch(script));
        diagnostics
    }

    pub fn stop(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !script.is_running() {
            // a stopped script is not expected back on resume
            if script.is_paused() {
                script.mark_stopped();
            }
            return diagnostics;
        }

        if script.is_locked() {
            diagnostics.add_error(CoreError::StopLocked(script.path.clone()));
            return diagnostics;
        }

        if self.terminate(script, &mut diagnostics) {
            script.mark_stopped();
        }
        diagnostics
    }

    pub fn restart(&self, script: &mut Script) -> Diagnostics {
        if script.is_locked() {
            return Diagnostics::error(CoreError::RestartLocked(script.path.clone()));
        }

        let stopped = self.stop(script);
        if !stopped.success() {
            return stopped;
        }

        stopped.merged(self.start(script))
    }

    pub fn pause(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !script.is_running() {
            return diagnostics;
        }

        if script.is_locked() {
            diagnostics.add_error(CoreError::PauseLocked(script.path.clone()));
            return diagnostics;
        }

        if self.terminate(script, &mut diagnostics) {
            script.mark_paused();
        }
        diagnostics
    }

    pub fn resume(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !script.is_paused() {
            return diagnostics;
        }

        if script.is_locked() {
            diagnostics.add_error(CoreError::ResumeLocked(script.path.clone()));
            return diagnostics;
        }

        // a failed launch leaves the script paused so resume can be retried
        diagnostics.merge(self.launch(script));
        diagnostics
    }

    /// Start and pin the script. The lock is never cleared afterwards.
    pub fn force_start(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !script.is_running() {
            diagnostics.merge(self.launch(script));
        }

        if diagnostics.success() {
            script.lock();
            info!("Locked script {:?}", script.path);
        }
        diagnostics
    }

    /// Make sure the script is not left running before its library forgets it
    pub fn remove(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = self.stop(script);
        if !diagnostics.success() {
            diagnostics.add_error(CoreError::RemoveStillRunning(script.path.clone()));
        }
        diagnostics
    }

    /// Warning when the backing file is gone, so the caller can drop the script
    pub fn refresh(&self, script: &Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        if !script.exists() {
            diagnostics.add_warning(CoreError::ScriptFileMissing(script.path.clone()));
        }
        diagnostics
    }

    /// Notice a process that exited without us and fall back to `Stopped`
    pub fn sync(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let exited = script
            .process()
            .is_some_and(|handle| !self.launcher.is_alive(handle));
        if exited {
            warn!("Script {:?} exited on its own", script.path);
            script.mark_stopped();
            diagnostics.add_warning(CoreError::ProcessExited(script.path.clone()));
        }
        diagnostics
    }

    fn launch(&self, script: &mut Script) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        match self.launcher.launch(&self.executable(), &script.path) {
            Ok(handle) => {
                info!("Started script {:?} (pid {})", script.path, handle.pid);
                script.mark_started(handle);
            }
            Err(source) => {
                warn!("Failed to start script {:?}: {}", script.path, source);
                diagnostics.add_error(CoreError::StartFailed {
                    path: script.path.clone(),
                    source,
                });
            }
        }
        diagnostics
    }

    /// Terminate the attached process; false (with an error recorded) on failure
    fn terminate(&self, script: &Script, diagnostics: &mut Diagnostics) -> bool {
        let Some(handle) = script.process() else {
            return true;
        };
        match self.launcher.terminate(handle) {
            Ok(()) => {
                info!("Stopped script {:?} (pid {})", script.path, handle.pid);
                true
            }
            Err(source) => {
                warn!("Failed to stop script {:?}: {}", script.path, source);
                diagnostics.add_error(CoreError::StopFailed {
                    path: script.path.clone(),
                    source,
                });
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::Severity;
    use crate::core::process::testing::FakeLauncher;
    use crate::core::test_support::{script_manager, touch};

    fn running_script(manager: &ScriptManager, dir: &Path) -> Script {
        let (_, script) = manager.init(&touch(dir, "a.ahk"));
        let mut script = script.unwrap();
        assert!(manager.start(&mut script).success());
        script
    }

    #[test]
    fn init_rejects_missing_and_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = script_manager(FakeLauncher::new());

        let (d, script) = manager.init(&dir.path().join("missing.ahk"));
        assert!(!d.success());
        assert!(script.is_none());

        let (d, script) = manager.init(&touch(dir.path(), "notes.md"));
        assert_eq!(d.severity(), Severity::Error);
        assert!(script.is_none());

        let (d, script) = manager.init(&touch(dir.path(), "ok.AHK"));
        assert!(d.success() && d.is_empty());
        let script = script.unwrap();
        assert!(!script.is_running() && !script.is_paused() && !script.is_locked());
    }

    #[test]
    fn start_running_unlocked_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = running_script(&manager, dir.path());
        let pid = script.process().unwrap().pid;

        let d = manager.start(&mut script);
        assert!(d.success() && d.is_empty());
        assert_eq!(script.process().unwrap().pid, pid);
        assert_eq!(launcher.launches(), 1);
    }

    #[test]
    fn stop_then_start_gets_new_handle() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = running_script(&manager, dir.path());
        let first = script.process().unwrap().pid;

        assert!(manager.stop(&mut script).success());
        assert!(!script.is_running() && script.process().is_none());
        assert!(manager.stop(&mut script).success());

        assert!(manager.start(&mut script).success());
        assert!(script.is_running());
        assert_ne!(script.process().unwrap().pid, first);
        assert_eq!(launcher.live_count(), 1);
    }

    #[test]
    fn launch_failure_is_error_and_leaves_stopped() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = manager.init(&touch(dir.path(), "a.ahk")).1.unwrap();

        launcher.set_fail_launch(true);
        let d = manager.start(&mut script);
        assert!(!d.success());
        assert!(!script.is_running());
    }

    #[test]
    fn terminate_failure_keeps_running() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = running_script(&manager, dir.path());

        launcher.set_fail_terminate(true);
        assert!(!manager.stop(&mut script).success());
        assert!(script.is_running() && script.process().is_some());
        assert!(!manager.pause(&mut script).success());
        assert!(!script.is_paused());
    }

    #[test]
    fn force_start_locks_and_blocks_stop() {
        let dir = tempfile::tempdir().unwrap();
        let manager = script_manager(FakeLauncher::new());
        let mut script = manager.init(&touch(dir.path(), "a.ahk")).1.unwrap();

        assert!(manager.force_start(&mut script).success());
        assert!(script.is_running() && script.is_locked());

        let d = manager.stop(&mut script);
        assert_eq!(d.severity(), Severity::Error);
        assert!(script.is_running());

        assert!(!manager.pause(&mut script).success());
        assert!(!manager.restart(&mut script).success());
        assert!(script.is_running());

        let d = manager.start(&mut script);
        assert_eq!(d.severity(), Severity::Warning);
    }

    #[test]
    fn locked_stopped_script_refuses_start() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = manager.init(&touch(dir.path(), "a.ahk")).1.unwrap();
        manager.force_start(&mut script);

        // process dies on its own; the lock survives
        launcher.crash(script.process().unwrap().pid);
        assert_eq!(manager.sync(&mut script).severity(), Severity::Warning);
        assert!(!script.is_running() && script.is_locked());

        assert!(!manager.start(&mut script).success());
        assert!(!script.is_running());

        assert!(manager.force_start(&mut script).success());
        assert!(script.is_running());
    }

    #[test]
    fn pause_resume_cycle() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = running_script(&manager, dir.path());

        assert!(manager.pause(&mut script).success());
        assert!(script.is_paused() && !script.is_running());
        assert_eq!(launcher.live_count(), 0);

        assert!(manager.resume(&mut script).success());
        assert!(script.is_running() && !script.is_paused());

        // nothing to resume
        let d = manager.resume(&mut script);
        assert!(d.success() && d.is_empty());
    }

    #[test]
    fn restart_does_not_start_when_stop_fails() {
        let dir = tempfile::tempdir().unwrap();
        let launcher = FakeLauncher::new();
        let manager = script_manager(launcher.clone());
        let mut script = running_script(&manager, dir.path());

        launcher.set_fail_terminate(true);
        let d = manager.restart(&mut script);
        assert!(!d.success());
        assert_eq!(d.messages().len(), 1);
        assert_eq!(launcher.launches(), 1);
    }

    #[test]
    fn refresh_warns_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let manager = script_manager(FakeLauncher::new());
        let path = touch(dir.path(), "a.ahk");
        let script = manager.init(&path).1.unwrap();

        assert!(manager.refresh(&script).is_empty());
        std::fs::remove_file(&path).unwrap();
        assert_eq!(manager.refresh(&script).severity(), Severity::Warning);
    }

    #[test]
    fn remove_reports_live_script() {
        let dir = tempfile::tempdir().unwrap();
        let manager = script_manager(FakeLauncher::new());
        let mut script = manager.init(&touch(dir.path(), "a.ahk")).1.unwrap();
        manager.force_start(&mut script);

        let d = manager.remove(&mut script);
        assert_eq!(d.texts(Severity::Error).count(), 2);
    }
}
