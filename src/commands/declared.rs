//! Command groups declared in the environment file
//!
//! A declared command is a list of shell steps. Steps may reference settings with
//! `{dotted.path}`, positional arguments with `{0}`, `{1}`, ..., and all arguments with
//! `{args}`. `${VAR}` is left for the shell, and `{{`/`}}` write a literal brace. Steps
//! run in order and the first failure stops the command.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use log::debug;
use regex::Regex;
use serde_json::Value;

use crate::commands::{CommandError, Commander, Context, GroupSpec, Operation};
use crate::config_file::{ConfigError, ConfigGroup};
use crate::settings::{Settings, render_scalar};

// `${VAR}` belongs to the shell and `{{`/`}}` are literal braces; only group 1 is a key.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{[^}]*\}|\{\{|\}\}|\{([A-Za-z0-9_.\-]+)\}")
        .expect("placeholder pattern is valid")
});

/// Resolve `child` against `parent`; an empty child means the parent itself.
#[must_use]
pub fn inherit_path(parent: &Path, child: PathBuf) -> PathBuf {
    if child.as_os_str().is_empty() {
        parent.to_path_buf()
    } else if child.is_relative() {
        parent.join(child)
    } else {
        child
    }
}

/// A single declared command, with its working directory already resolved
#[derive(Debug, Clone, Default)]
pub struct DeclaredCommand {
    pub name: String,
    pub doc: String,
    pub cwd: PathBuf,
    pub env: BTreeMap<String, String>,
    pub steps: Vec<String>,
}

fn validate_name(group: &str, name: &str) -> Result<(), ConfigError> {
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "Group '{group}' has a command with an empty name"
        )));
    }
    if name.contains('.') || name.chars().any(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "Command name '{name}' in group '{group}' must not contain dots or whitespace"
        )));
    }
    Ok(())
}

fn render_env(
    group: &str,
    command: &str,
    env: Option<&BTreeMap<String, Value>>,
) -> Result<BTreeMap<String, String>, ConfigError> {
    env.into_iter()
        .flatten()
        .map(|(key, value)| {
            render_scalar(value)
                .map(|rendered| (key.clone(), rendered))
                .ok_or_else(|| {
                    ConfigError::Validation(format!(
                        "Environment variable '{key}' of command '{group}.{command}' must be a string, number or boolean"
                    ))
                })
        })
        .collect()
}

/// Build the [`GroupSpec`] for a group declared in a file living in `base_dir`.
///
/// # Errors
///
/// Returns `ConfigError::Validation` for empty or dotted command names and for
/// commands without steps.
pub fn group_spec(
    name: &str,
    config: &ConfigGroup,
    base_dir: &Path,
) -> Result<GroupSpec, ConfigError> {
    let mut commands = BTreeMap::new();
    for (command_name, command) in &config.commands {
        validate_name(name, command_name)?;
        if command.run.iter().all(|step| step.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "Command '{name}.{command_name}' has no steps to run"
            )));
        }
        commands.insert(
            command_name.clone(),
            DeclaredCommand {
                name: command_name.clone(),
                doc: command.doc.clone(),
                cwd: inherit_path(base_dir, command.cwd.clone().unwrap_or_default()),
                env: render_env(name, command_name, command.env.as_ref())?,
                steps: command.run.clone(),
            },
        );
    }

    let operations = commands
        .values()
        .map(|command| Operation {
            name: command.name.clone(),
            doc: command.doc.clone(),
        })
        .collect();
    let commands = Arc::new(commands);
    Ok(GroupSpec::new(name, operations, move |cfg, ctx| {
        Box::new(DeclaredCommands {
            commands: Arc::clone(&commands),
            cfg,
            ctx,
        })
    }))
}

fn resolve(
    key: &str,
    operation: &str,
    settings: &Settings,
    args: &[String],
) -> Result<String, CommandError> {
    if key == "args" {
        return Ok(args.join(" "));
    }
    if let Ok(index) = key.parse::<usize>() {
        return args
            .get(index)
            .cloned()
            .ok_or_else(|| CommandError::MissingArgument {
                command: operation.to_string(),
                name: key.to_string(),
            });
    }
    settings.scalar(key)
}

/// Substitute placeholders in `template`.
///
/// # Errors
///
/// Returns `CommandError::MissingArgument` for an absent positional argument and
/// `CommandError::MissingSetting` for an unknown settings path.
pub fn interpolate(
    template: &str,
    operation: &str,
    settings: &Settings,
    args: &[String],
) -> Result<String, CommandError> {
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        rendered.push_str(&template[last..whole.start()]);
        match (caps.get(1), whole.as_str()) {
            (Some(key), _) => {
                rendered.push_str(&resolve(key.as_str(), operation, settings, args)?);
            }
            (None, "{{") => rendered.push('{'),
            (None, "}}") => rendered.push('}'),
            (None, shell) => rendered.push_str(shell),
        }
        last = whole.end();
    }
    rendered.push_str(&template[last..]);
    Ok(rendered)
}

struct DeclaredCommands {
    commands: Arc<BTreeMap<String, DeclaredCommand>>,
    cfg: Settings,
    ctx: Context,
}

impl Commander for DeclaredCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        let command = self
            .commands
            .get(operation)
            .ok_or_else(|| CommandError::UnknownOperation(operation.to_string()))?;

        let mut local = self.ctx.local().cd(&command.cwd);
        for (key, value) in &command.env {
            local = local.env(key, interpolate(value, operation, &self.cfg, args)?);
        }
        for step in command.steps.iter().filter(|step| !step.trim().is_empty()) {
            let line = interpolate(step, operation, &self.cfg, args)?;
            debug!("{operation}: {line}");
            local.run(line)?;
        }
        Ok(())
    }
}
