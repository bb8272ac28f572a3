//! AHK Manager - Run AutoHotkey scripts grouped into libraries and profiles
//!
//! Libraries own the script files of one directory; profiles reference
//! scripts across libraries by path. Every lifecycle operation reports a
//! [`core::Diagnostics`] value instead of failing outright.

pub mod cli;
pub mod core;
pub mod persistence;
pub mod platform;

/// Application name constant
pub const APP_NAME: &str = "AHK Manager";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
