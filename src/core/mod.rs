//! Core module - Entities, lifecycle managers, services and application state

mod app_state;
pub mod diagnostics;
pub mod error;
pub mod library;
pub mod manager;
pub mod paths;
pub mod process;
pub mod profile;
pub mod repository;
pub mod script;
pub mod service;
pub mod settings;

pub use app_state::AppState;
pub use diagnostics::{Diagnostics, Message, Severity};
pub use error::{CoreError, ProcessError};
pub use library::{Library, LibraryState};
pub use manager::{LibraryManager, ProfileManager, ScriptManager, ScriptResolver};
pub use process::{ProcessHandle, ProcessLauncher, ProcessManager};
pub use profile::Profile;
pub use repository::{LibraryRepository, ProfileRepository};
pub use script::{Lock, Script};
pub use service::{LibraryService, ProfileService};
pub use settings::Settings;
