//! Managers - Single-entity lifecycle operations

mod library;
mod profile;
mod script;

pub use library::LibraryManager;
pub use profile::{ProfileManager, ScriptResolver};
pub use script::ScriptManager;
