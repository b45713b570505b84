//! Command groups and the contract between them and the dispatcher
//!
//! A command group is a type implementing [`Commander`]: a set of named operations that
//! share one environment's [`Settings`](crate::settings::Settings). Groups are described by a [`GroupSpec`], which
//! carries the operation names, their documentation, and a factory the dispatcher calls
//! to build a fresh instance for every invocation.
//!
//! Built-in groups live in [`crate::tools`]; groups written in the environment file are
//! handled by [`declared`].

use std::sync::Arc;

use thiserror::Error;

use crate::prompt::{Prompt, PromptError};
use crate::shell::{Local, Shell};

pub mod declared;
pub mod group;

pub use group::{GroupSpec, Operation};

#[allow(clippy::ref_option)]
fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| c.to_string())
}

/// Errors raised by a running command.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("encountered an error while executing '{command}'\n    Error: {output}\n    Exit Code: {}", exit_code(.code))]
    Shell {
        command: String,
        output: String,
        code: Option<i32>,
    },
    #[error("setting `{0}` is not defined for this environment")]
    MissingSetting(String),
    #[error("setting `{key}` must be {expected}")]
    InvalidSetting { key: String, expected: &'static str },
    #[error("{command} requires the `{name}` argument")]
    MissingArgument { command: String, name: String },
    #[error("{command} takes at most {max} argument(s), {given} given")]
    TooManyArguments {
        command: String,
        max: usize,
        given: usize,
    },
    #[error("operation `{0}` is not provided by this command group")]
    UnknownOperation(String),
    #[error("{0}")]
    Aborted(String),
    #[error("interrupted")]
    Interrupted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<PromptError> for CommandError {
    fn from(error: PromptError) -> Self {
        match error {
            PromptError::Interrupted => CommandError::Interrupted,
            PromptError::Unavailable(reason) => CommandError::Aborted(reason),
        }
    }
}

/// Collaborators shared by every command group instance of one process run.
#[derive(Clone)]
pub struct Context {
    pub shell: Arc<dyn Shell>,
    pub prompt: Arc<dyn Prompt>,
}

impl Context {
    pub fn new(shell: Arc<dyn Shell>, prompt: Arc<dyn Prompt>) -> Self {
        Self { shell, prompt }
    }

    /// A runner in the current directory with no extra environment.
    #[must_use]
    pub fn local(&self) -> Local<'_> {
        Local::new(self.shell.as_ref())
    }
}

/// A command group instance, built with one environment's settings.
pub trait Commander {
    /// Run the operation called `operation` with positional `args`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` when the operation fails or does not exist.
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError>;
}

/// Fail when more than `max` positional arguments were given.
pub(crate) fn at_most(operation: &str, args: &[String], max: usize) -> Result<(), CommandError> {
    if args.len() > max {
        return Err(CommandError::TooManyArguments {
            command: operation.to_string(),
            max,
            given: args.len(),
        });
    }
    Ok(())
}

/// The argument at `index`, treating an empty string as absent.
pub(crate) fn optional(args: &[String], index: usize) -> Option<&str> {
    args.get(index)
        .map(String::as_str)
        .filter(|arg| !arg.is_empty())
}

pub(crate) fn required<'a>(
    operation: &str,
    args: &'a [String],
    index: usize,
    name: &str,
) -> Result<&'a str, CommandError> {
    optional(args, index).ok_or_else(|| CommandError::MissingArgument {
        command: operation.to_string(),
        name: name.to_string(),
    })
}

/// All arguments from `index` on.
pub(crate) fn rest(args: &[String], index: usize) -> &[String] {
    args.get(index..).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_argument_helpers() {
        let given = args(&["first", "", "third"]);
        assert_eq!(optional(&given, 0), Some("first"));
        assert_eq!(optional(&given, 1), None);
        assert_eq!(optional(&given, 7), None);
        assert_eq!(rest(&given, 2), &given[2..]);
        assert!(rest(&given, 9).is_empty());
        assert!(at_most("push", &given, 3).is_ok());
        assert!(matches!(
            at_most("push", &given, 1),
            Err(CommandError::TooManyArguments { given: 3, .. })
        ));
        assert!(matches!(
            required("dump", &given, 1, "database"),
            Err(CommandError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_shell_error_message() {
        let error = CommandError::Shell {
            command: "git push".to_string(),
            output: "rejected".to_string(),
            code: Some(1),
        };
        assert_eq!(
            error.to_string(),
            "encountered an error while executing 'git push'\n    Error: rejected\n    Exit Code: 1"
        );
    }
}
