//! Application settings management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Directory name used under the platform data directory
pub const DATA_DIR_NAME: &str = "AHKManager";

/// Application settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Interpreter used to run scripts
    pub script_executable: PathBuf,
    /// Recognised script extensions, lower-case without the dot
    pub file_types: Vec<String>,
    /// Persist libraries and profiles
    #[serde(default = "default_true")]
    pub enable_save: bool,
    /// Enable debug logging
    #[serde(default)]
    pub debug_logging: bool,
}

fn default_true() -> bool {
    true
}

fn default_file_types() -> Vec<String> {
    vec!["ahk".to_string()]
}

fn default_executable() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(r"C:\Program Files\AutoHotkey\AutoHotkey.exe")
    } else {
        PathBuf::from("autohotkey")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            script_executable: default_executable(),
            file_types: default_file_types(),
            enable_save: true,
            debug_logging: false,
        }
    }
}

impl Settings {
    /// Default location for the database and other state
    pub fn default_data_directory() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    }

    /// Whether `extension` (no dot, any case) is a recognised script type
    pub fn is_script_extension(&self, extension: &str) -> bool {
        self.file_types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(extension))
    }

    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        let mut types: Vec<String> = Vec::new();
        for t in &self.file_types {
            let t = t.trim().trim_start_matches('.').to_ascii_lowercase();
            if !t.is_empty() && !types.contains(&t) {
                types.push(t);
            }
        }
        self.file_types = if types.is_empty() {
            default_file_types()
        } else {
            types
        };

        if self.script_executable.as_os_str().is_empty() {
            self.script_executable = default_executable();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_normalises_extensions() {
        let mut settings = Settings {
            file_types: vec![".AHK".into(), " ".into(), "ahk".into(), "Txt".into()],
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings.file_types, ["ahk", "txt"]);
        assert!(settings.is_script_extension("TXT"));
    }

    #[test]
    fn validate_restores_defaults() {
        let mut settings = Settings {
            script_executable: PathBuf::new(),
            file_types: Vec::new(),
            ..Default::default()
        };
        settings.validate();
        assert_eq!(settings, Settings::default());
    }
}
