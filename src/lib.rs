//! Core implementation of blt
//!
//! blt loads an environment file (`bltenv.yaml`, `bltenv.yml` or `bltenv.json`), builds a
//! registry of dotted command names from the command groups it declares and imports,
//! and runs one command at a time with the settings of one environment.

use log::debug;

use crate::commands::Context;
use crate::config_file::ConfigError;
use crate::dispatch::CommandCenter;

pub mod commands;
pub mod config_file;
pub mod dispatch;
pub mod environment;
pub mod invocation;
pub mod listing;
pub mod loader;
pub mod logger;
pub mod namespace;
pub mod prompt;
pub mod registry;
pub mod settings;
pub mod shell;
pub mod theme;
pub mod tools;

/// Load an environment file (or auto-detect one in the working directory) and build
/// its command center.
///
/// # Errors
///
/// Returns `ConfigError` if the file is not found, cannot be parsed, has a broken
/// import, or lacks a valid `CONFIG` block.
pub fn load_center(file: Option<&str>, context: Context) -> Result<CommandCenter, ConfigError> {
    let path = config_file::locate(file)?;
    debug!("Loading environment file {}", path.display());
    CommandCenter::load(&path, context)
}
