//! Application state - Central state management for the script manager

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use tracing::{debug, info};

use super::diagnostics::Diagnostics;
use super::manager::{LibraryManager, ProfileManager, ScriptManager};
use super::paths;
use super::process::ProcessLauncher;
use super::service::{LibraryService, ProfileService};
use super::settings::Settings;
use crate::persistence::Database;

/// Central application state: both services plus the settings and the
/// database they are persisted to.
pub struct AppState {
    /// Application settings
    pub settings: Arc<RwLock<Settings>>,
    /// Libraries and the scripts they own
    pub libraries: LibraryService,
    /// Profiles referencing those scripts
    pub profiles: ProfileService,
    /// Database connection
    database: Database,
}

impl AppState {
    /// Build the state from whatever the database holds
    pub fn new(database: Database, launcher: Arc<dyn ProcessLauncher>) -> Result<Self> {
        let settings = database.load_settings()?.unwrap_or_default();
        Self::with_settings(database, launcher, settings)
    }

    /// Like [`AppState::new`] but with settings supplied by the caller
    pub fn with_settings(
        database: Database,
        launcher: Arc<dyn ProcessLauncher>,
        mut settings: Settings,
    ) -> Result<Self> {
        settings.validate();
        let settings = Arc::new(RwLock::new(settings));

        let script_manager = ScriptManager::new(launcher, Arc::clone(&settings));
        let libraries = LibraryService::with_repository(
            LibraryManager::new(script_manager.clone()),
            database.load_libraries()?,
        );
        let profiles = ProfileService::with_repository(
            ProfileManager::new(script_manager),
            database.load_profiles()?,
        );

        info!(
            "Loaded {} libraries and {} profiles",
            libraries.repository().len(),
            profiles.repository().len()
        );

        Ok(Self {
            settings,
            libraries,
            profiles,
            database,
        })
    }

    /// Copy of the current settings
    pub fn settings(&self) -> Result<Settings> {
        Ok(self
            .settings
            .read()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?
            .clone())
    }

    /// Apply `update` to the settings, validate, and persist them
    pub fn update_settings(&self, update: impl FnOnce(&mut Settings)) -> Result<()> {
        {
            let mut settings = self
                .settings
                .write()
                .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
            update(&mut settings);
            settings.validate();
        }
        self.save_settings()
    }

    /// Save settings
    pub fn save_settings(&self) -> Result<()> {
        let settings = self
            .settings
            .read()
            .map_err(|e| anyhow::anyhow!("Settings lock poisoned: {}", e))?;
        self.database.save_settings(&settings)?;
        Ok(())
    }

    /// Write both repositories, unless saving is turned off
    pub fn save(&self) -> Result<()> {
        let settings = self.settings()?;
        if !settings.enable_save {
            debug!("Saving disabled, repositories not written");
            return Ok(());
        }
        self.database
            .save_snapshot(self.libraries.repository(), self.profiles.repository())
    }

    /// Remove a library, then forget its scripts in every profile
    pub fn remove_library(&mut self, identifier: &Path) -> Diagnostics {
        let ids: Vec<PathBuf> = self
            .libraries
            .find(identifier)
            .map(|library| library.script_ids())
            .unwrap_or_default();

        let mut diagnostics = self.libraries.remove(identifier);
        if self.libraries.find(identifier).is_none() {
            diagnostics.merge(self.profiles.forget_scripts(&ids));
        }
        diagnostics
    }

    /// Remove a script from its library, then from every profile
    pub fn remove_script(&mut self, identifier: &Path) -> Diagnostics {
        let mut diagnostics = self.libraries.remove_script(identifier);
        if self.libraries.find_script(identifier).is_none() {
            diagnostics.merge(
                self.profiles
                    .forget_scripts(&[paths::format_path(identifier)]),
            );
        }
        diagnostics
    }

    /// Refresh libraries first so profiles see the pruned script set
    pub fn refresh(&mut self) -> Diagnostics {
        let diagnostics = self.libraries.refresh();
        diagnostics.merged(self.profiles.refresh(&mut self.libraries))
    }

    /// Stop every profile and library
    pub fn stop_all(&mut self) -> Diagnostics {
        let mut diagnostics = self.profiles.stop_all(&mut self.libraries);
        diagnostics.merge(self.libraries.stop_all());
        diagnostics.ignore_error();
        info!("Stopped all scripts");
        diagnostics
    }

    /// Number of scripts with a live process
    pub fn running_count(&self) -> usize {
        self.libraries
            .all_scripts()
            .filter(|s| s.is_running())
            .count()
    }
}
