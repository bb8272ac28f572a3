//! Profile management - User-named groups of script identifiers

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A named, ordered set of script identifiers.
///
/// Profiles never own scripts. Each identifier is resolved through the
/// library side on every use and may point at a script that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique name, also the identifier
    pub name: String,
    /// Referenced script identifiers, in user order
    scripts: Vec<PathBuf>,
    /// When the profile was created
    pub created_at: DateTime<Utc>,
    /// When the profile was last modified
    pub modified_at: DateTime<Utc>,
    /// When the profile was last started
    #[serde(default)]
    pub last_started_at: Option<DateTime<Utc>>,
    /// Number of times this profile has been started
    #[serde(default)]
    pub start_count: u32,
    #[serde(skip)]
    running: bool,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            scripts: Vec::new(),
            created_at: now,
            modified_at: now,
            last_started_at: None,
            start_count: 0,
            running: false,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.name
    }

    pub fn has_id(&self, identifier: &str) -> bool {
        self.name == identifier
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn script_ids(&self) -> &[PathBuf] {
        &self.scripts
    }

    pub fn has_script(&self, identifier: &Path) -> bool {
        self.scripts.iter().any(|s| s == identifier)
    }

    /// Append a script identifier
    pub fn add(&mut self, identifier: impl Into<PathBuf>) {
        self.scripts.push(identifier.into());
        self.modified_at = Utc::now();
    }

    /// Drop a script identifier, returning whether it was present
    pub fn remove(&mut self, identifier: &Path) -> bool {
        match self.scripts.iter().position(|s| s == identifier) {
            Some(pos) => {
                self.scripts.remove(pos);
                self.modified_at = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub(crate) fn mark_started(&mut self) {
        self.running = true;
        self.last_started_at = Some(Utc::now());
        self.start_count += 1;
    }

    pub(crate) fn mark_stopped(&mut self) {
        self.running = false;
    }

    /// Export profile to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Import profile from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_by_identifier() {
        let mut profile = Profile::new("work");
        profile.add("/scripts/a.ahk");
        profile.add("/scripts/b.ahk");

        assert!(profile.has_script(Path::new("/scripts/a.ahk")));
        assert!(profile.remove(Path::new("/scripts/a.ahk")));
        assert!(!profile.remove(Path::new("/scripts/a.ahk")));
        assert_eq!(profile.script_ids(), [PathBuf::from("/scripts/b.ahk")]);
    }

    #[test]
    fn json_round_trip_drops_running_flag() {
        let mut profile = Profile::new("work");
        profile.add("/scripts/a.ahk");
        profile.mark_started();

        let restored = Profile::from_json(&profile.to_json().unwrap()).unwrap();
        assert!(!restored.is_running());
        assert_eq!(restored.start_count, 1);
        assert_eq!(restored.script_ids(), profile.script_ids());
    }
}
