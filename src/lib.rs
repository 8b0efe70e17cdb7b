
pub mod logging;
pub mod error;
pub mod platform;
pub mod config;
pub mod files;
pub mod download;
pub mod archive;
pub mod process;
pub mod image;
pub mod script;
pub mod params;
pub mod fiji;
pub mod installer;
pub mod automator;
pub mod commands;


pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");
