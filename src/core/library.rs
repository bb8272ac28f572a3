//! Library - A directory whose immediate script files it owns

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::paths;
use super::script::Script;

/// Intended state of the library as a whole, independent of its scripts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LibraryState {
    pub running: bool,
    pub paused: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Library {
    /// Normalised directory path, also the identifier
    pub path: PathBuf,
    /// Display name (directory name)
    pub name: String,
    #[serde(skip)]
    state: LibraryState,
    scripts: Vec<Script>,
}

impl Library {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: paths::file_name(&path),
            path,
            state: LibraryState::default(),
            scripts: Vec::new(),
        }
    }

    pub fn identifier(&self) -> &Path {
        &self.path
    }

    pub fn has_id(&self, identifier: &Path) -> bool {
        self.path == identifier
    }

    /// Whether the backing directory still exists
    pub fn exists(&self) -> bool {
        paths::is_dir(&self.path)
    }

    /// Running and not paused. Says nothing about individual scripts.
    pub fn is_running(&self) -> bool {
        self.state.running && !self.state.paused
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn state(&self) -> LibraryState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: LibraryState) {
        self.state = state;
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn scripts_mut(&mut self) -> &mut [Script] {
        &mut self.scripts
    }

    pub fn script_ids(&self) -> Vec<PathBuf> {
        self.scripts.iter().map(|s| s.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn add(&mut self, script: Script) {
        self.scripts.push(script);
    }

    /// Forget a script, handing it back to the caller
    pub fn remove(&mut self, identifier: &Path) -> Option<Script> {
        let pos = self.scripts.iter().position(|s| s.has_id(identifier))?;
        Some(self.scripts.remove(pos))
    }

    /// Keep only the scripts for which `keep` returns true
    pub(crate) fn retain_scripts(&mut self, keep: impl FnMut(&mut Script) -> bool) {
        self.scripts.retain_mut(keep);
    }

    /// Cheap pre-check: a script can only belong here if its parent is our path
    pub fn may_contain(&self, identifier: &Path) -> bool {
        identifier.parent() == Some(self.path.as_path())
    }

    pub fn find(&self, identifier: &Path) -> Option<&Script> {
        if !self.may_contain(identifier) {
            return None;
        }
        self.scripts.iter().find(|s| s.has_id(identifier))
    }

    pub fn find_mut(&mut self, identifier: &Path) -> Option<&mut Script> {
        if !self.may_contain(identifier) {
            return None;
        }
        self.scripts.iter_mut().find(|s| s.has_id(identifier))
    }

    pub fn has_script(&self, identifier: &Path) -> bool {
        self.find(identifier).is_some()
    }

    pub fn running_scripts(&self) -> impl Iterator<Item = &Script> {
        self.scripts.iter().filter(|s| s.is_running())
    }
}
