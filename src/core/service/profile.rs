//! Profile service - Profiles and the scripts they share with libraries

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::library::LibraryService;
use crate::core::diagnostics::Diagnostics;
use crate::core::error::CoreError;
use crate::core::manager::ProfileManager;
use crate::core::paths;
use crate::core::profile::Profile;
use crate::core::repository::ProfileRepository;
use crate::core::script::Script;

const DEFAULT_PROFILE_NAME: &str = "profile";

/// Owns the profile repository. Script identifiers are always resolved
/// through the [`LibraryService`] passed in by the caller.
pub struct ProfileService {
    manager: ProfileManager,
    repository: ProfileRepository,
}

impl ProfileService {
    pub fn new(manager: ProfileManager) -> Self {
        Self::with_repository(manager, ProfileRepository::new())
    }

    pub fn with_repository(manager: ProfileManager, repository: ProfileRepository) -> Self {
        Self {
            manager,
            repository,
        }
    }

    pub fn repository(&self) -> &ProfileRepository {
        &self.repository
    }

    pub fn repository_mut(&mut self) -> &mut ProfileRepository {
        &mut self.repository
    }

    /// Create a profile. An empty name picks the next free `profile`, `profile1`, ...
    pub fn add(&mut self, name: &str) -> (Diagnostics, Option<&Profile>) {
        let name = name.trim();
        let name = if name.is_empty() {
            self.next_profile_name()
        } else {
            name.to_string()
        };

        if self.repository.find(&name).is_some() {
            return (Diagnostics::error(CoreError::ProfileExists(name)), None);
        }

        let (diagnostics, profile) = self.manager.init_profile(&name);
        if !diagnostics.success() {
            return (diagnostics, None);
        }
        self.repository.add(profile);
        info!("Added profile {}", name);
        (diagnostics, self.repository.find(&name))
    }

    fn next_profile_name(&self) -> String {
        if self.repository.find(DEFAULT_PROFILE_NAME).is_none() {
            return DEFAULT_PROFILE_NAME.to_string();
        }
        (1..)
            .map(|i| format!("{}{}", DEFAULT_PROFILE_NAME, i))
            .find(|name| self.repository.find(name).is_none())
            .unwrap_or_default()
    }

    pub fn add_script(
        &mut self,
        profile_id: &str,
        script_id: &Path,
        libraries: &mut LibraryService,
    ) -> Diagnostics {
        let script_id = paths::format_path(script_id);

        let Some(profile) = self.repository.find_mut(profile_id) else {
            return Diagnostics::error(CoreError::ProfileNotFound(profile_id.to_string()));
        };

        if profile.has_script(&script_id) {
            let mut diagnostics = Diagnostics::new();
            diagnostics.add_warning(CoreError::ProfileHasScript(script_id));
            return diagnostics;
        }

        match libraries.repository_mut().find_script_mut(&script_id) {
            Some(script) => self.manager.add_script(profile, script),
            None => Diagnostics::error(CoreError::ScriptNotFound(script_id)),
        }
    }

    // === Find ===

    pub fn find(&self, identifier: &str) -> Option<&Profile> {
        self.repository.find(identifier)
    }

    pub fn find_profiles_containing_script(&self, identifier: &Path) -> Vec<&Profile> {
        let identifier = paths::format_path(identifier);
        self.repository
            .iter()
            .filter(|p| p.has_script(&identifier))
            .collect()
    }

    pub fn find_running_profiles_containing_script(&self, identifier: &Path) -> Vec<&Profile> {
        let identifier = paths::format_path(identifier);
        self.repository
            .iter()
            .filter(|p| p.is_running() && p.has_script(&identifier))
            .collect()
    }

    /// Scripts of a profile that still resolve, in profile order
    pub fn profile_scripts<'a>(
        &self,
        identifier: &str,
        libraries: &'a LibraryService,
    ) -> Vec<&'a Script> {
        let Some(profile) = self.repository.find(identifier) else {
            return Vec::new();
        };
        profile
            .script_ids()
            .iter()
            .filter_map(|id| libraries.repository().find_script(id))
            .collect()
    }

    // === Remove ===

    /// Remove a profile. A running profile first releases each of its
    /// scripts under the shared-script rule.
    pub fn remove(&mut self, identifier: &str, libraries: &mut LibraryService) -> Diagnostics {
        let Some(profile) = self.repository.find(identifier) else {
            let mut diagnostics =
                Diagnostics::error(CoreError::ProfileNotFound(identifier.to_string()));
            diagnostics.ignore_error();
            return diagnostics;
        };

        let mut diagnostics = Diagnostics::new();
        if profile.is_running() {
            let ids = profile.script_ids().to_vec();
            for id in ids {
                diagnostics.merge(self.remove_script_from_profile(identifier, &id, libraries));
            }
        }

        self.repository.remove(identifier);
        info!("Removed profile {}", identifier);
        diagnostics.ignore_error();
        diagnostics
    }

    /// Drop `script_id` from the profile, stopping the script only when no
    /// other running profile references it and its library is not running.
    pub fn remove_script_from_profile(
        &mut self,
        profile_id: &str,
        script_id: &Path,
        libraries: &mut LibraryService,
    ) -> Diagnostics {
        let script_id = paths::format_path(script_id);
        let mut diagnostics = Diagnostics::new();

        let Some(profile) = self.repository.find(profile_id) else {
            return Diagnostics::error(CoreError::ProfileNotFound(profile_id.to_string()));
        };

        if !profile.has_script(&script_id) {
            diagnostics.add_warning(CoreError::ScriptNotInProfile {
                profile: profile_id.to_string(),
                script: script_id,
            });
            return diagnostics;
        }

        let other_users = self
            .repository
            .iter()
            .filter(|p| !p.has_id(profile_id) && p.is_running() && p.has_script(&script_id))
            .count();
        let library_running = libraries
            .find_library_contains_script(&script_id)
            .is_some_and(|l| l.is_running());

        if other_users == 0 && !library_running {
            diagnostics.merge(libraries.stop_script(&script_id));
        } else {
            debug!(
                "Keeping {:?} running: {} other profiles, library running: {}",
                script_id, other_users, library_running
            );
        }

        if let Some(profile) = self.repository.find_mut(profile_id) {
            profile.remove(&script_id);
        }
        info!("Removed {:?} from profile {}", script_id, profile_id);
        diagnostics.ignore_error();
        diagnostics
    }

    /// Forget a script, or every script of a library, in all profiles.
    /// Processes are left alone.
    pub fn remove_script(&mut self, identifier: &Path, libraries: &LibraryService) -> Diagnostics {
        let identifier = paths::format_path(identifier);
        let ids: Vec<PathBuf> = match libraries.repository().find(&identifier) {
            Some(library) => library.script_ids(),
            None => vec![identifier],
        };
        self.forget_scripts(&ids)
    }

    pub(crate) fn forget_scripts(&mut self, ids: &[PathBuf]) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for profile in self.repository.iter_mut() {
            for id in ids {
                if profile.remove(id) {
                    debug!("Forgot {:?} in profile {}", id, profile.name);
                }
            }
        }
        diagnostics.ignore_error();
        diagnostics
    }

    // === Commands ===

    pub fn start(&mut self, identifier: &str, libraries: &mut LibraryService) -> Diagnostics {
        match self.repository.find_mut(identifier) {
            Some(profile) => self.manager.start(profile, libraries.repository_mut()),
            None => Diagnostics::error(CoreError::ProfileNotFound(identifier.to_string())),
        }
    }

    pub fn stop(&mut self, identifier: &str, libraries: &mut LibraryService) -> Diagnostics {
        match self.repository.find_mut(identifier) {
            Some(profile) => self.manager.stop(profile, libraries.repository_mut()),
            None => Diagnostics::error(CoreError::ProfileNotFound(identifier.to_string())),
        }
    }

    pub fn restart(&mut self, identifier: &str, libraries: &mut LibraryService) -> Diagnostics {
        match self.repository.find_mut(identifier) {
            Some(profile) => self.manager.restart(profile, libraries.repository_mut()),
            None => Diagnostics::error(CoreError::ProfileNotFound(identifier.to_string())),
        }
    }

    pub fn stop_all(&mut self, libraries: &mut LibraryService) -> Diagnostics {
        let mut diagnostics: Diagnostics = self
            .repository
            .iter_mut()
            .map(|profile| self.manager.stop(profile, libraries.repository_mut()))
            .collect();
        diagnostics.ignore_error();
        diagnostics
    }

    pub fn refresh(&mut self, libraries: &mut LibraryService) -> Diagnostics {
        let mut diagnostics: Diagnostics = self
            .repository
            .iter_mut()
            .map(|profile| self.manager.refresh(profile, libraries.repository_mut()))
            .collect();
        diagnostics.ignore_error();
        diagnostics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::diagnostics::Severity;
    use crate::core::process::testing::FakeLauncher;
    use crate::core::test_support::{library_service, profile_service, touch};

    #[test]
    fn empty_names_are_generated_in_sequence() {
        let mut service = profile_service(FakeLauncher::new());
        for expected in ["profile", "profile1", "profile2"] {
            let (d, profile) = service.add("");
            assert!(d.success());
            assert_eq!(profile.unwrap().name, expected);
        }
        let (d, profile) = service.add("profile1");
        assert_eq!(d.severity(), Severity::Error);
        assert!(profile.is_none());
        assert_eq!(service.repository().len(), 3);
    }

    #[test]
    fn add_script_checks_both_sides() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let launcher = FakeLauncher::new();
        let mut libraries = library_service(launcher.clone());
        libraries.add(dir.path());
        let mut service = profile_service(launcher);
        service.add("work");

        let d = service.add_script("nope", &a, &mut libraries);
        assert_eq!(d.severity(), Severity::Error);
        let d = service.add_script("work", &dir.path().join("ghost.ahk"), &mut libraries);
        assert_eq!(d.severity(), Severity::Error);

        assert!(service.add_script("work", &a, &mut libraries).is_empty());
        let d = service.add_script("work", &a, &mut libraries);
        assert_eq!(d.severity(), Severity::Warning);
        assert_eq!(service.find("work").unwrap().len(), 1);
    }

    #[test]
    fn running_library_keeps_script_alive() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let launcher = FakeLauncher::new();
        let mut libraries = library_service(launcher.clone());
        libraries.add(dir.path());
        let mut service = profile_service(launcher.clone());
        service.add("work");
        service.add_script("work", &a, &mut libraries);
        service.start("work", &mut libraries);
        libraries.start(dir.path());

        let d = service.remove_script_from_profile("work", &a, &mut libraries);
        assert!(d.success());
        assert!(libraries.find_script(&a).unwrap().is_running());
        assert!(service.find("work").unwrap().is_empty());

        let d = service.remove_script_from_profile("work", &a, &mut libraries);
        assert_eq!(d.severity(), Severity::Warning);
    }

    #[test]
    fn remove_running_profile_releases_its_own_scripts() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let b = touch(dir.path(), "b.ahk");
        let launcher = FakeLauncher::new();
        let mut libraries = library_service(launcher.clone());
        libraries.add(dir.path());
        let mut service = profile_service(launcher.clone());
        service.add("one");
        service.add("two");
        service.add_script("one", &a, &mut libraries);
        service.add_script("one", &b, &mut libraries);
        service.add_script("two", &b, &mut libraries);
        service.start("one", &mut libraries);
        service.start("two", &mut libraries);
        assert_eq!(launcher.live_count(), 2);

        assert!(service.remove("one", &mut libraries).success());
        assert!(service.find("one").is_none());
        assert!(!libraries.find_script(&a).unwrap().is_running());
        assert!(libraries.find_script(&b).unwrap().is_running());
        assert_eq!(service.find("two").unwrap().len(), 1);
    }

    #[test]
    fn remove_script_by_library_clears_every_profile() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let b = touch(dir.path(), "b.ahk");
        let mut libraries = library_service(FakeLauncher::new());
        libraries.add(dir.path());
        let mut service = profile_service(FakeLauncher::new());
        service.add("one");
        service.add("two");
        service.add_script("one", &a, &mut libraries);
        service.add_script("two", &b, &mut libraries);

        assert!(service.remove_script(dir.path(), &libraries).success());
        assert!(service.find("one").unwrap().is_empty());
        assert!(service.find("two").unwrap().is_empty());
        assert!(service.find_profiles_containing_script(&a).is_empty());
    }

    #[test]
    fn profile_scripts_skip_dangling_ids() {
        let dir = tempfile::tempdir().unwrap();
        let a = touch(dir.path(), "a.ahk");
        let mut libraries = library_service(FakeLauncher::new());
        libraries.add(dir.path());
        let mut service = profile_service(FakeLauncher::new());
        service.add("work");
        service.add_script("work", &a, &mut libraries);
        service
            .repository_mut()
            .find_mut("work")
            .unwrap()
            .add(dir.path().join("ghost.ahk"));

        let scripts = service.profile_scripts("work", &libraries);
        assert_eq!(scripts.len(), 1);
        assert_eq!(scripts[0].name, "a");

        let d = service.refresh(&mut libraries);
        assert_eq!(d.severity(), Severity::Warning);
        assert_eq!(service.find("work").unwrap().len(), 1);
    }
}
