//! Services - Cross-entity rules over the repositories

mod library;
mod profile;

pub use library::LibraryService;
pub use profile::ProfileService;
