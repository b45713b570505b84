//! Rendering of command listings, per-command help, completion names and usage
//!
//! Everything here writes into a `String`; the binary decides where it goes.

use std::fmt::Write;

use crate::dispatch::DispatchError;
use crate::registry::{CommandHandle, CommandRegistry};
use crate::theme::{self, Palette};

/// Bucket for commands declared without a tool prefix
pub const NO_TOOL_BUCKET: &str = "local - no tool prefix";

#[derive(Debug)]
pub struct ListEntry<'a> {
    /// Name with the tool segment stripped
    pub short: String,
    pub name: &'a str,
    pub handle: &'a CommandHandle,
}

#[derive(Debug)]
pub struct ToolGroup<'a> {
    pub tool: String,
    pub entries: Vec<ListEntry<'a>>,
}

/// Bucket registered commands by their first dot segment.
///
/// Buckets come out in the order of their smallest name, entries sorted by full name.
/// With `filter`, only the bucket whose first segment equals it is kept.
#[must_use]
pub fn group_commands<'a>(registry: &'a CommandRegistry, filter: Option<&str>) -> Vec<ToolGroup<'a>> {
    let mut groups: Vec<ToolGroup<'a>> = Vec::new();
    for (name, handle) in registry {
        let (tool, short) = match name.split_once('.') {
            Some((tool, short)) => (tool, short),
            None => (name.as_str(), name.as_str()),
        };
        if filter.is_some_and(|filter| filter != tool) {
            continue;
        }
        let bucket = if tool == name { NO_TOOL_BUCKET } else { tool };
        let entry = ListEntry {
            short: short.to_string(),
            name,
            handle,
        };
        match groups.iter_mut().find(|group| group.tool == bucket) {
            Some(group) => group.entries.push(entry),
            None => groups.push(ToolGroup {
                tool: bucket.to_string(),
                entries: vec![entry],
            }),
        }
    }
    groups
}

/// Write `[tool]` headers followed by one summary line per command.
pub fn list(out: &mut String, registry: &CommandRegistry, filter: Option<&str>, palette: Palette) {
    for group in group_commands(registry, filter) {
        let header = format!("[{}]", group.tool);
        let _ = writeln!(out, "\n{}", palette.paint(theme::SUCCESS, &header));
        for entry in group.entries {
            let _ = writeln!(
                out,
                "  - {:30} {}",
                entry.short,
                entry.handle.summary_docstring()
            );
        }
    }
    out.push('\n');
}

/// Write the full documentation of each named command.
///
/// # Errors
///
/// Returns `DispatchError::UnknownCommand` for the first name that is not registered;
/// the help of earlier names has already been written to `out`.
pub fn help(
    out: &mut String,
    registry: &CommandRegistry,
    names: &[String],
    palette: Palette,
) -> Result<(), DispatchError> {
    for name in names {
        let handle = registry
            .get(name)
            .ok_or_else(|| DispatchError::UnknownCommand(name.clone()))?;
        let header = format!("[{name}]");
        let _ = writeln!(out, "{}", palette.paint(theme::SUCCESS, &header));
        let _ = writeln!(out, "{}", handle.docstring());
    }
    Ok(())
}

/// Every registered name, sorted, one per line.
#[must_use]
pub fn completion(registry: &CommandRegistry) -> String {
    registry.keys().fold(String::new(), |mut out, name| {
        let _ = writeln!(out, "{name}");
        out
    })
}

#[must_use]
pub fn usage(palette: Palette) -> String {
    let invocation = |environment: &str, tool: &str, command: &str, args: &str| {
        format!(
            "blt e:{}{}.{}{}",
            palette.paint(theme::ENVIRONMENT, environment),
            palette.paint(theme::SUCCESS, &format!(" {tool}")),
            palette.paint(theme::COMMAND, command),
            palette.paint(theme::FAILURE, &format!(" {args}")),
        )
    };
    let heading = |text: &str| palette.paint(theme::HEADING, text);

    let mut out = String::new();
    let _ = writeln!(out, "\n{}\n", heading("General blt usage:"));
    let _ = writeln!(
        out,
        "    {}",
        invocation("[environment]", "[tool]", "[command]", "[args]")
    );
    let _ = writeln!(out, "\n{}\n", heading("Example:"));
    let _ = writeln!(out, "    blt e:production django.runserver 127.0.0.1 8888\n");
    let _ = writeln!(out, "{}\n", heading("Let's break that down:"));
    let _ = writeln!(
        out,
        "    {}",
        invocation("production", "django", "runserver", "127.0.0.1 8888")
    );
    for (part, value) in [
        ("- environment", "production"),
        ("- tool", "django"),
        ("- command", "runserver"),
        ("- args", "127.0.0.1, 8888"),
    ] {
        let _ = writeln!(out, "    {part:15} => {value}");
    }
    let _ = writeln!(out, "\n{}\n", heading("Special blt commands:"));
    for line in [
        "blt help - this screen",
        "blt help [command] - detailed command help",
        "blt list [tool] - list all available commands",
        "blt completion - print every command name",
    ] {
        let _ = writeln!(out, "    {line}");
    }
    let _ = writeln!(out, "\n{}\n", heading("Helpful hints:"));
    for line in [
        "- Environment is optional, will default to local if none given.",
        "- Environment shortcuts: (p)roduction, (s)taging, (l)ocal.",
        "- The e:[environment] selector may appear anywhere in the arguments.",
        "- Tab completion works on tools/commands, give it a shot.",
    ] {
        let _ = writeln!(out, "    {line}");
    }
    out
}

/// What every aborted run prints on stderr.
#[must_use]
pub fn fatal_report(message: &str, palette: Palette) -> String {
    format!(
        "\nFatal error: {message}\n{}\n",
        palette.paint(theme::FAILURE, "Aborting.")
    )
}

/// Warning shown before a command runs against production.
#[must_use]
pub fn production_banner(command: &str, palette: Palette) -> String {
    let rule = "****************************************";
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{}",
        palette.paint(theme::FAILURE, "         P R O D U C T I O N            ")
    );
    let _ = writeln!(out, "          woah there cowboy!            ");
    let _ = writeln!(
        out,
        "{}",
        palette.paint(theme::FAILURE, "               check                    ")
    );
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "Command Called => {}\n",
        palette.paint(theme::HIGHLIGHT, command)
    );
    out
}
