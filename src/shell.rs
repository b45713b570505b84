//! Shell command execution
//!
//! Every command group talks to the outside world through [`Local`], a small runner that
//! carries the working directory and extra environment variables for the calls made
//! through it. Nothing here changes the process-wide working directory or environment.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::Command as ProcessCommand;

use log::debug;
use parking_lot::Mutex;

use crate::commands::CommandError;
use crate::theme::{self, Palette};

/// A single shell invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    pub line: String,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Capture stdout instead of inheriting the terminal.
    pub capture: bool,
}

/// Executes shell commands on behalf of command groups.
pub trait Shell: Send + Sync {
    /// Run one command. Returns the captured stdout when `capture` is set, an empty
    /// string otherwise.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Shell` if the command exits non-zero, or
    /// `CommandError::Io` if it cannot be started.
    fn run(&self, command: &ShellCommand) -> Result<String, CommandError>;
}

/// Runs commands through `sh -c`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn run(&self, command: &ShellCommand) -> Result<String, CommandError> {
        debug!(
            "Running '{}' in {}",
            command.line,
            command
                .cwd
                .as_ref()
                .map_or_else(|| ".".to_string(), |cwd| cwd.display().to_string())
        );
        let mut process = ProcessCommand::new("sh");
        process.arg("-c").arg(&command.line).envs(&command.env);
        if let Some(cwd) = &command.cwd {
            process.current_dir(cwd);
        }

        if command.capture {
            let output = process.output()?;
            let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
            if output.status.success() {
                return Ok(stdout);
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(CommandError::Shell {
                command: command.line.clone(),
                output: format!("{stdout}{stderr}"),
                code: output.status.code(),
            })
        } else {
            let status = process.status()?;
            if status.success() {
                Ok(String::new())
            } else {
                Err(CommandError::Shell {
                    command: command.line.clone(),
                    output: String::new(),
                    code: status.code(),
                })
            }
        }
    }
}

/// Records commands instead of running them, optionally echoing each one.
#[derive(Debug, Default)]
pub struct DryRun {
    echo: bool,
    history: Mutex<Vec<ShellCommand>>,
}

impl DryRun {
    /// A dry run that prints every command it receives.
    #[must_use]
    pub fn new() -> Self {
        Self {
            echo: true,
            history: Mutex::default(),
        }
    }

    /// A dry run that only records.
    #[must_use]
    pub fn silent() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn history(&self) -> Vec<ShellCommand> {
        self.history.lock().clone()
    }

    /// The command lines received so far, in order.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.history.lock().iter().map(|c| c.line.clone()).collect()
    }
}

impl Shell for DryRun {
    fn run(&self, command: &ShellCommand) -> Result<String, CommandError> {
        if self.echo {
            let palette = Palette::stdout();
            println!("{} {}", palette.paint(theme::DIM, "[dry-run]"), command.line);
        }
        self.history.lock().push(command.clone());
        Ok(String::new())
    }
}

/// Quote a value for safe interpolation into an `sh` command line.
#[must_use]
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Scoped runner handed to command groups.
///
/// [`Local::cd`] and [`Local::env`] return a new runner; the original keeps its own
/// directory and environment, so leaving the scope restores them on every exit path.
#[derive(Clone)]
pub struct Local<'a> {
    shell: &'a dyn Shell,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl<'a> Local<'a> {
    #[must_use]
    pub fn new(shell: &'a dyn Shell) -> Self {
        Self {
            shell,
            cwd: None,
            env: BTreeMap::new(),
        }
    }

    /// Runner whose commands execute in `dir`, relative to this runner's directory.
    #[must_use]
    pub fn cd(&self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let cwd = match &self.cwd {
            Some(current) if dir.is_relative() => current.join(dir),
            _ => dir,
        };
        Self {
            shell: self.shell,
            cwd: Some(cwd),
            env: self.env.clone(),
        }
    }

    /// Runner that passes an extra environment variable to its commands.
    #[must_use]
    pub fn env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut env = self.env.clone();
        env.insert(key.into(), value.into());
        Self {
            shell: self.shell,
            cwd: self.cwd.clone(),
            env,
        }
    }

    fn command(&self, line: String, capture: bool) -> ShellCommand {
        ShellCommand {
            line,
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            capture,
        }
    }

    /// # Errors
    ///
    /// Returns `CommandError::Shell` if the command exits non-zero.
    pub fn run(&self, line: impl Into<String>) -> Result<(), CommandError> {
        self.shell.run(&self.command(line.into(), false)).map(|_| ())
    }

    /// Run and return stdout.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Shell` if the command exits non-zero.
    pub fn capture(&self, line: impl Into<String>) -> Result<String, CommandError> {
        self.shell.run(&self.command(line.into(), true))
    }

    /// Run and return the output even when the command exits non-zero.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Io` if the command cannot be started at all.
    pub fn capture_lenient(&self, line: impl Into<String>) -> Result<String, CommandError> {
        match self.capture(line) {
            Err(CommandError::Shell { output, .. }) => Ok(output),
            other => other,
        }
    }
}
