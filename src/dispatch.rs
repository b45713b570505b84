//! Validates an invocation and runs it
//!
//! Checks happen in a fixed order: the production gate, then the environment, then the
//! command. No command is looked up or run until all of them pass.

use std::path::{Path, PathBuf};

use log::{info, warn};
use thiserror::Error;

use crate::commands::{CommandError, Context};
use crate::config_file::ConfigError;
use crate::environment::{ConfigurationMap, PRODUCTION};
use crate::listing;
use crate::loader::{Loaded, Loader};
use crate::prompt::{self, PromptError};
use crate::registry::{CommandHandle, CommandRegistry, RegistryBuilder};
use crate::theme::Palette;

pub const PRODUCTION_QUESTION: &str = "Are you sure you want to do proceed?";

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("environment [{0}] not defined in your environment file.")]
    UnknownEnvironment(String),
    #[error("you did not specify a command, try again.")]
    NoCommandSpecified,
    #[error("command [{0}] not found in your environment file.")]
    UnknownCommand(String),
    #[error("change aborted!")]
    Declined,
    #[error("Cancelled.")]
    Cancelled,
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Registry and configuration of one loaded environment file
pub struct CommandCenter {
    env_file: PathBuf,
    commands: CommandRegistry,
    config: ConfigurationMap,
    context: Context,
}

impl CommandCenter {
    /// # Errors
    ///
    /// Returns `ConfigError::MissingConfiguration` if the root file has no `CONFIG`, or
    /// `ConfigError::Validation` if it uses a reserved environment name.
    pub fn new(loaded: Loaded, context: Context) -> Result<Self, ConfigError> {
        let config = ConfigurationMap::extract(&loaded.file, &loaded.path)?;
        let commands = RegistryBuilder::new(&loaded.graph).build_root(loaded.root);
        info!(
            "Registered {} command(s) from {}",
            commands.len(),
            loaded.path.display()
        );
        Ok(Self {
            env_file: loaded.path,
            commands,
            config,
            context,
        })
    }

    /// Load the environment file at `path` and everything it imports.
    ///
    /// # Errors
    ///
    /// Returns any `ConfigError` raised while loading or extracting the configuration.
    pub fn load(path: &Path, context: Context) -> Result<Self, ConfigError> {
        Self::new(Loader::new().load(path)?, context)
    }

    #[must_use]
    pub fn env_file(&self) -> &Path {
        &self.env_file
    }

    #[must_use]
    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    #[must_use]
    pub fn config(&self) -> &ConfigurationMap {
        &self.config
    }

    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Run `command` with the settings of `environment`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before anything runs, `DispatchError::Declined` or
    /// `DispatchError::Cancelled` from the production gate, or the command's own error.
    pub fn run(&self, environment: &str, command: &str, args: &[String]) -> Result<(), DispatchError> {
        let handle = self.precheck(environment, command)?;
        let settings = self
            .config
            .settings_for(environment)
            .ok_or_else(|| DispatchError::UnknownEnvironment(environment.to_string()))?;
        info!("Running {command} in {environment}");
        handle
            .execute(settings, &self.context, args)
            .map_err(|e| match e {
                CommandError::Interrupted => DispatchError::Cancelled,
                e => DispatchError::Command(e),
            })
    }

    fn precheck(&self, environment: &str, command: &str) -> Result<&CommandHandle, DispatchError> {
        if environment == PRODUCTION {
            self.production_check(command)?;
        }
        if !self.config.contains(environment) {
            return Err(DispatchError::UnknownEnvironment(environment.to_string()));
        }
        if command.is_empty() {
            return Err(DispatchError::NoCommandSpecified);
        }
        self.commands
            .get(command)
            .ok_or_else(|| DispatchError::UnknownCommand(command.to_string()))
    }

    fn production_check(&self, command: &str) -> Result<(), DispatchError> {
        print!("{}", listing::production_banner(command, Palette::stdout()));
        match prompt::confirm(self.context.prompt.as_ref(), PRODUCTION_QUESTION) {
            Ok(true) => Ok(()),
            Ok(false) => Err(DispatchError::Declined),
            Err(PromptError::Interrupted) => Err(DispatchError::Cancelled),
            Err(PromptError::Unavailable(reason)) => {
                warn!("Unable to confirm production run: {reason}");
                Err(DispatchError::Declined)
            }
        }
    }
}
