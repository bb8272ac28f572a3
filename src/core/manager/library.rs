//! Library manager - Directory scanning and fan-out over owned scripts

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::script::ScriptManager;
use crate::core::diagnostics::Diagnostics;
use crate::core::error::CoreError;
use crate::core::library::{Library, LibraryState};
use crate::core::paths;
use crate::core::script::Script;

#[derive(Clone)]
pub struct LibraryManager {
    script_manager: ScriptManager,
}

impl LibraryManager {
    pub fn new(script_manager: ScriptManager) -> Self {
        Self { script_manager }
    }

    pub fn script_manager(&self) -> &ScriptManager {
        &self.script_manager
    }

    /// Script files directly inside `dir`, in name order
    fn script_files(&self, dir: &Path) -> Vec<PathBuf> {
        paths::files_in_directory(dir)
            .into_iter()
            .filter(|file| self.script_manager.has_script_extension(file))
            .collect()
    }

    /// Build a library from the script files directly inside `path`.
    ///
    /// A directory without any script file yields a Warning and no library.
    pub fn init_library(&self, path: &Path) -> (Diagnostics, Option<Library>) {
        let mut diagnostics = Diagnostics::new();
        let path = paths::format_path(path);

        if !paths::is_dir(&path) {
            diagnostics.add_error(CoreError::NotADirectory(path));
            return (diagnostics, None);
        }

        let files = self.script_files(&path);
        if files.is_empty() {
            debug!("No script files in {:?}", path);
            diagnostics.add_warning(CoreError::DirectoryEmpty(path));
            return (diagnostics, None);
        }

        let mut library = Library::new(path);
        for file in files {
            let (result, script) = self.script_manager.init(&file);
            let ok = result.success();
            diagnostics.merge(result);
            if let (true, Some(script)) = (ok, script) {
                library.add(script);
            }
        }

        info!(
            "Initialized library {:?} with {} scripts",
            library.path,
            library.len()
        );
        (diagnostics, Some(library))
    }

    /// Add-only rescan: track script files that appeared since the last scan
    pub fn reload(&self, library: &mut Library) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !library.exists() {
            diagnostics.add_error(CoreError::LibraryPathMissing(library.path.clone()));
            return diagnostics;
        }

        let before = library.len();
        for file in self.script_files(&library.path) {
            if library.has_script(&file) {
                continue;
            }
            let (result, script) = self.script_manager.init(&file);
            let ok = result.success();
            diagnostics.merge(result);
            if let (true, Some(script)) = (ok, script) {
                library.add(script);
            }
        }

        info!(
            "Reloaded library {:?}: {} new scripts",
            library.path,
            library.len() - before
        );
        diagnostics
    }

    /// Validate-and-prune: drop scripts whose file is gone, never rescan.
    ///
    /// Error when the library directory itself is missing, so the caller can
    /// remove the whole library.
    pub fn refresh(&self, library: &mut Library) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if !library.exists() {
            warn!("Library directory {:?} is gone", library.path);
            diagnostics.add_error(CoreError::LibraryRemovedMissing(library.path.clone()));
            return diagnostics;
        }

        let script_manager = &self.script_manager;
        library.retain_scripts(|script| {
            let result = script_manager.refresh(script);
            if result.is_empty() {
                return true;
            }
            diagnostics.merge(result);

            // a vanished file may still have a live process
            let removed = script_manager.remove(script);
            let keep = !removed.success();
            diagnostics.merge(removed);
            if !keep {
                info!("Dropped missing script {:?}", script.path);
            }
            keep
        });
        diagnostics
    }

    pub fn start(&self, library: &mut Library) -> Diagnostics {
        let diagnostics = self.for_each(library, ScriptManager::start);
        library.set_state(LibraryState {
            running: true,
            paused: false,
        });
        info!("Started library {:?}", library.path);
        diagnostics
    }

    pub fn stop(&self, library: &mut Library) -> Diagnostics {
        let diagnostics = self.for_each(library, ScriptManager::stop);
        library.set_state(LibraryState::default());
        info!("Stopped library {:?}", library.path);
        diagnostics
    }

    pub fn pause(&self, library: &mut Library) -> Diagnostics {
        let diagnostics = self.for_each(library, ScriptManager::pause);
        if library.is_running() {
            library.set_state(LibraryState {
                running: false,
                paused: true,
            });
        }
        diagnostics
    }

    pub fn resume(&self, library: &mut Library) -> Diagnostics {
        let diagnostics = self.for_each(library, ScriptManager::resume);
        if library.is_paused() {
            library.set_state(LibraryState {
                running: true,
                paused: false,
            });
        }
        diagnostics
    }

    /// Stop and forget every script. Scripts that could not be stopped stay,
    /// and the result is an Error so the library is kept as well.
    pub fn remove(&self, library: &mut Library) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let script_manager = &self.script_manager;

        library.retain_scripts(|script| {
            let result = script_manager.remove(script);
            let keep = !result.success();
            diagnostics.merge(result);
            keep
        });

        if !diagnostics.success() {
            warn!("Library {:?} still has live scripts", library.path);
            diagnostics.add_error(CoreError::LibraryScriptsStillLive(library.path.clone()));
        }
        diagnostics
    }

    /// Run ScriptManager::sync over every owned script
    pub fn sync(&self, library: &mut Library) -> Diagnostics {
        self.for_each(library, ScriptManager::sync)
    }

    fn for_each(
        &self,
        library: &mut Library,
        op: impl Fn(&ScriptManager, &mut Script) -> Diagnostics,
    ) -> Diagnostics {
        library
            .scripts_mut()
            .iter_mut()
            .map(|script| op(&self.script_manager, script))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::core::diagnostics::Severity;
    use crate::core::process::testing::FakeLauncher;
    use crate::core::test_support::{library_manager, touch};

    #[test]
    fn init_library_keeps_only_script_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ahk");
        touch(dir.path(), "b.ahk");
        touch(dir.path(), "readme.txt");
        fs::create_dir(dir.path().join("sub")).unwrap();
        touch(&dir.path().join("sub"), "c.ahk");

        let manager = library_manager(FakeLauncher::new());
        let (d, library) = manager.init_library(dir.path());
        assert!(d.success());
        let library = library.unwrap();
        let names: Vec<_> = library.scripts().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn init_library_without_scripts_warns() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "readme.txt");
        let manager = library_manager(FakeLauncher::new());

        let (d, library) = manager.init_library(dir.path());
        assert_eq!(d.severity(), Severity::Warning);
        assert!(library.is_none());

        let (d, library) = manager.init_library(&dir.path().join("nope"));
        assert_eq!(d.severity(), Severity::Error);
        assert!(library.is_none());
    }

    #[test]
    fn reload_only_adds() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let manager = library_manager(FakeLauncher::new());
        let mut library = manager.init_library(dir.path()).1.unwrap();

        fs::remove_file(&a).unwrap();
        touch(dir.path(), "b.ahk");
        assert!(manager.reload(&mut library).success());
        assert_eq!(library.len(), 2);

        // nothing new: no change
        assert!(manager.reload(&mut library).is_empty());
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn refresh_only_prunes() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        touch(dir.path(), "b.ahk");
        let manager = library_manager(FakeLauncher::new());
        let mut library = manager.init_library(dir.path()).1.unwrap();

        fs::remove_file(&a).unwrap();
        touch(dir.path(), "c.ahk");
        let d = manager.refresh(&mut library);
        assert_eq!(d.severity(), Severity::Warning);
        let names: Vec<_> = library.scripts().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["b"]);
    }

    #[test]
    fn refresh_missing_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let lib_dir = dir.path().join("lib");
        fs::create_dir(&lib_dir).unwrap();
        touch(&lib_dir, "a.ahk");
        let manager = library_manager(FakeLauncher::new());
        let mut library = manager.init_library(&lib_dir).1.unwrap();

        fs::remove_dir_all(&lib_dir).unwrap();
        assert_eq!(manager.refresh(&mut library).severity(), Severity::Error);
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn fan_out_sets_state_regardless_of_failures() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ahk");
        touch(dir.path(), "b.ahk");
        let launcher = FakeLauncher::new();
        let manager = library_manager(launcher.clone());
        let mut library = manager.init_library(dir.path()).1.unwrap();

        launcher.set_fail_launch(true);
        let d = manager.start(&mut library);
        assert_eq!(d.texts(Severity::Error).count(), 2);
        assert!(library.is_running());

        launcher.set_fail_launch(false);
        assert!(manager.start(&mut library).success());
        assert_eq!(library.running_scripts().count(), 2);

        assert!(manager.pause(&mut library).success());
        assert!(library.is_paused() && !library.is_running());
        assert_eq!(launcher.live_count(), 0);

        assert!(manager.resume(&mut library).success());
        assert!(library.is_running());
        assert_eq!(launcher.live_count(), 2);

        assert!(manager.stop(&mut library).success());
        assert!(!library.is_running() && !library.is_paused());
        assert_eq!(launcher.live_count(), 0);
    }

    #[test]
    fn pause_on_stopped_library_keeps_state() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ahk");
        let manager = library_manager(FakeLauncher::new());
        let mut library = manager.init_library(dir.path()).1.unwrap();

        assert!(manager.pause(&mut library).success());
        assert!(!library.is_paused());
        assert!(manager.resume(&mut library).success());
        assert!(!library.is_running());
    }

    #[test]
    fn remove_keeps_locked_scripts() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.ahk");
        let b = touch(dir.path(), "b.ahk");
        let manager = library_manager(FakeLauncher::new());
        let mut library = manager.init_library(dir.path()).1.unwrap();
        manager.start(&mut library);
        let locked = library.find_mut(&paths::format_path(&b)).unwrap();
        manager.script_manager().force_start(locked);

        let d = manager.remove(&mut library);
        assert!(!d.success());
        assert_eq!(library.len(), 1);
        assert_eq!(library.scripts()[0].name, "b");
    }
}
