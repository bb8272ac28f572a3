//! Profile manager - Lifecycle of a profile's referenced scripts

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::script::ScriptManager;
use crate::core::diagnostics::Diagnostics;
use crate::core::error::CoreError;
use crate::core::profile::Profile;
use crate::core::repository::LibraryRepository;
use crate::core::script::Script;

/// Turns a script identifier held by a profile into the live script.
pub trait ScriptResolver {
    fn resolve(&mut self, identifier: &Path) -> Option<&mut Script>;
}

impl ScriptResolver for LibraryRepository {
    fn resolve(&mut self, identifier: &Path) -> Option<&mut Script> {
        self.find_script_mut(identifier)
    }
}

#[derive(Clone)]
pub struct ProfileManager {
    script_manager: ScriptManager,
}

impl ProfileManager {
    pub fn new(script_manager: ScriptManager) -> Self {
        Self { script_manager }
    }

    pub fn init_profile(&self, name: &str) -> (Diagnostics, Profile) {
        debug!("Initialized profile {}", name);
        (Diagnostics::new(), Profile::new(name))
    }

    pub fn start(&self, profile: &mut Profile, scripts: &mut dyn ScriptResolver) -> Diagnostics {
        let diagnostics = self.for_each(profile, scripts, ScriptManager::start);
        profile.mark_started();
        info!("Started profile {}", profile.name);
        diagnostics
    }

    pub fn stop(&self, profile: &mut Profile, scripts: &mut dyn ScriptResolver) -> Diagnostics {
        let diagnostics = self.for_each(profile, scripts, ScriptManager::stop);
        profile.mark_stopped();
        info!("Stopped profile {}", profile.name);
        diagnostics
    }

    pub fn restart(&self, profile: &mut Profile, scripts: &mut dyn ScriptResolver) -> Diagnostics {
        let diagnostics = self.for_each(profile, scripts, ScriptManager::restart);
        profile.mark_started();
        info!("Restarted profile {}", profile.name);
        diagnostics
    }

    /// Drop identifiers that no longer resolve or whose file vanished
    pub fn refresh(&self, profile: &mut Profile, scripts: &mut dyn ScriptResolver) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        let mut stale: Vec<PathBuf> = Vec::new();

        for id in profile.script_ids() {
            match scripts.resolve(id) {
                None => {
                    diagnostics.add_error(CoreError::ScriptNotFound(id.clone()));
                    stale.push(id.clone());
                }
                Some(script) => {
                    let result = self.script_manager.refresh(script);
                    if !result.is_empty() {
                        diagnostics.merge(result);
                        diagnostics.add_warning(CoreError::ProfileScriptPruned {
                            profile: profile.name.clone(),
                            script: id.clone(),
                        });
                        stale.push(id.clone());
                    }
                }
            }
        }

        for id in &stale {
            profile.remove(id);
            info!("Removed {:?} from profile {}", id, profile.name);
        }
        diagnostics
    }

    /// Join `script` to the profile, starting it if the profile is running
    pub fn add_script(&self, profile: &mut Profile, script: &mut Script) -> Diagnostics {
        profile.add(script.path.clone());
        info!("Added {:?} to profile {}", script.path, profile.name);

        if profile.is_running() {
            return self.script_manager.start(script);
        }
        Diagnostics::new()
    }

    fn for_each(
        &self,
        profile: &Profile,
        scripts: &mut dyn ScriptResolver,
        op: impl Fn(&ScriptManager, &mut Script) -> Diagnostics,
    ) -> Diagnostics {
        let mut diagnostics = Diagnostics::new();
        for id in profile.script_ids() {
            match scripts.resolve(id) {
                Some(script) => diagnostics.merge(op(&self.script_manager, script)),
                None => diagnostics.add_error(CoreError::ScriptNotFound(id.clone())),
            }
        }
        diagnostics
    }
}
