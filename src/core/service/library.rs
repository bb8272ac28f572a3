//! Library service - Repository-level rules for libraries and their scripts

use std::path::Path;

use tracing::{info, warn};

use crate::core::diagnostics::Diagnostics;
use crate::core::error::CoreError;
use crate::core::library::Library;
use crate::core::manager::{LibraryManager, ScriptManager};
use crate::core::paths;
use crate::core::repository::LibraryRepository;
use crate::core::script::Script;
use crate::platform;

/// Owns the library repository and keeps it consistent with the filesystem.
///
/// Identifiers given to this service are normalised with
/// [`paths::format_path`] before any lookup.
pub struct LibraryService {
    manager: LibraryManager,
    repository: LibraryRepository,
}

impl LibraryService {
    pub fn new(manager: LibraryManager) -> Self {
        Self::with_repository(manager, LibraryRepository::new())
    }

    pub fn with_repository(manager: LibraryManager, repository: LibraryRepository) -> Self {
        Self {
            manager,
            repository,
        }
    }

    pub fn repository(&self) -> &LibraryRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut LibraryRepository {
        &mut self.repository
    }

    // === Add ===

    /// Track `path` and each of its immediate subdirectories as libraries.
    ///
    /// Already tracked directories are reloaded instead of duplicated. Only
    /// an invalid root is an Error; everything below it is demoted.
    pub fn add(&mut self, path: &Path) -> Diagnostics {
        let path = paths::format_path(path);

        if !paths::is_dir(&path) {
            return Diagnostics::error(CoreError::NotADirectory(path));
        }

        let mut diagnostics = self.init_or_reload(&path);
        for dir in paths::sub_directories(&path) {
            diagnostics.merge(self.init_or_reload(&dir));
        }

        diagnostics.ignore_error();
        diagnostics
    }

    fn init_or_reload(&mut self, path: &Path) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();

        if let Some(library) = self.repository.find_mut(path) {
            diagnostics.add_info(CoreError::LibraryAlreadyExists(library.path.clone()));
            diagnostics.merge(self.manager.reload(library));
            return diagnostics;
        }

        let (result, library) = self.manager.init_library(path);
        let ok = result.success();
        diagnostics.merge(result);
        if let (true, Some(library)) = (ok, library) {
            info!("Added library {:?}", library.path);
            self.repository.add(library);
        }
        diagnostics
    }

    // === Find ===

    pub fn find(&self, identifier: &Path) -> Option<&Library> {
        self.repository.find(&paths::format_path(identifier))
    }

    pub fn find_script(&self, identifier: &Path) -> Option<&Script> {
        self.repository.find_script(&paths::format_path(identifier))
    }

    /// Library owning the script, the join point for profile references
    pub fn find_library_contains_script(&self, identifier: &Path) -> Option<&Library> {
        self.repository
            .find_containing(&paths::format_path(identifier))
    }

    pub fn all_scripts(&self) -> impl Iterator<Item = &Script> {
        self.repository.all_scripts()
    }

    // === Remove ===

    /// Stop every script and forget the library. Unknown ids only warn.
    pub fn remove(&mut self, identifier: &Path) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        let Some(library) = self.repository.find_mut(&identifier) else {
            let mut diagnostics = Diagnostics::error(CoreError::LibraryNotFound(identifier));
            diagnostics.ignore_error();
            return diagnostics;
        };

        let diagnostics = self.manager.remove(library);
        if diagnostics.success() {
            self.repository.remove(&identifier);
            info!("Removed library {:?}", identifier);
        }
        diagnostics
    }

    pub fn remove_script(&mut self, identifier: &Path) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        let script_manager = self.manager.script_manager();
        let Some(library) = self.repository.find_containing_mut(&identifier) else {
            let mut diagnostics = Diagnostics::error(CoreError::ScriptNotFound(identifier));
            diagnostics.ignore_error();
            return diagnostics;
        };

        let mut diagnostics = Diagnostics::new();
        if let Some(script) = library.find_mut(&identifier) {
            diagnostics.merge(script_manager.remove(script));
        }
        if diagnostics.success() {
            library.remove(&identifier);
            info!("Removed script {:?}", identifier);
        }
        diagnostics
    }

    /// Stop everything; the repository is cleared only if every script stopped
    pub fn remove_all(&mut self) -> Diagnostics {
        let mut diagnostics: Diagnostics = self
            .repository
            .iter_mut()
            .map(|library| self.manager.stop(library))
            .collect();

        if diagnostics.success() {
            self.repository.clear();
            info!("Removed all libraries");
        } else {
            warn!("Some scripts could not be stopped, libraries kept");
        }
        diagnostics.ignore_error();
        diagnostics
    }

    // === Library commands ===

    pub fn start(&mut self, identifier: &Path) -> Diagnostics {
        self.with_library(identifier, LibraryManager::start)
    }

    pub fn stop(&mut self, identifier: &Path) -> Diagnostics {
        self.with_library(identifier, LibraryManager::stop)
    }

    pub fn pause(&mut self, identifier: &Path) -> Diagnostics {
        self.with_library(identifier, LibraryManager::pause)
    }

    pub fn resume(&mut self, identifier: &Path) -> Diagnostics {
        self.with_library(identifier, LibraryManager::resume)
    }

    pub fn stop_all(&mut self) -> Diagnostics {
        self.for_all(LibraryManager::stop)
    }

    pub fn pause_all(&mut self) -> Diagnostics {
        self.for_all(LibraryManager::pause)
    }

    pub fn resume_all(&mut self) -> Diagnostics {
        self.for_all(LibraryManager::resume)
    }

    /// Notice scripts whose process exited without us
    pub fn sync(&mut self) -> Diagnostics {
        self.for_all(LibraryManager::sync)
    }

    // === Script commands ===

    pub fn start_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::start)
    }

    pub fn stop_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::stop)
    }

    pub fn restart_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::restart)
    }

    pub fn force_start_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::force_start)
    }

    pub fn pause_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::pause)
    }

    pub fn resume_script(&mut self, identifier: &Path) -> Diagnostics {
        self.with_script(identifier, ScriptManager::resume)
    }

    // === Maintenance ===

    /// Prune missing scripts, and drop libraries whose directory is gone
    /// once none of their scripts are still live.
    pub fn refresh(&mut self) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let manager = &self.manager;

        self.repository.retain(|library| {
            let result = manager.refresh(library);
            let missing = !result.success();
            diagnostics.merge(result);
            if !missing {
                return true;
            }

            let removed = manager.remove(library);
            let keep = !removed.success();
            diagnostics.merge(removed);
            if !keep {
                info!("Dropped missing library {:?}", library.path);
            }
            keep
        });

        diagnostics.ignore_error();
        diagnostics
    }

    /// Open a library or script location in the system file manager
    pub fn reveal(&self, identifier: &Path) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        let target = self
            .repository
            .find(&identifier)
            .map(|l| l.path.as_path())
            .or_else(|| self.repository.find_script(&identifier).map(|s| s.path.as_path()));

        let Some(target) = target else {
            return Diagnostics::error(CoreError::ScriptNotFound(identifier));
        };

        match platform::reveal(target) {
            Ok(()) => Diagnostics::new(),
            Err(e) => {
                warn!("Failed to reveal {:?}: {:#}", target, e);
                Diagnostics::error(CoreError::CouldNotOpen(target.to_path_buf()))
            }
        }
    }

    fn with_library(
        &mut self,
        identifier: &Path,
        op: impl FnOnce(&LibraryManager, &mut Library) -> Diagnostics,
    ) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        match self.repository.find_mut(&identifier) {
            Some(library) => op(&self.manager, library),
            None => Diagnostics::error(CoreError::LibraryNotFound(identifier)),
        }
    }

    fn with_script(
        &mut self,
        identifier: &Path,
        op: impl FnOnce(&ScriptManager, &mut Script) -> Diagnostics,
    ) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        let script_manager = self.manager.script_manager();
        match self.repository.find_script_mut(&identifier) {
            Some(script) => op(script_manager, script),
            None => Diagnostics::error(CoreError::ScriptNotFound(identifier)),
        }
    }

    fn for_all(&mut self, op: impl Fn(&LibraryManager, &mut Library) -> Diagnostics) -> Diagnostics {
        let mut diagnostics: Diagnostics = self
            .repository
            .iter_mut()
            .map(|library| op(&self.manager, library))
            .collect();
        diagnostics.ignore_error();
        diagnostics
    }
}
