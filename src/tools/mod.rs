//! Built-in tool namespaces an environment file can import by name
//!
//! Each tool is a single command group of shell wrappers. Their settings live in the
//! environment's `CONFIG` block under the tool's key (`heroku`, `django`, `aws`, `bundle`);
//! `south` reads the `django` settings.

use crate::commands::GroupSpec;

pub mod aws;
pub mod bundle;
pub mod django;
pub mod heroku;
pub mod south;
pub mod sync;

pub const BUILTIN_TOOLS: [&str; 5] = ["aws", "bundle", "django", "heroku", "south"];

/// The command group of a built-in tool, or `None` for an unknown name.
#[must_use]
pub fn builtin(name: &str) -> Option<GroupSpec> {
    match name {
        "aws" => Some(aws::group()),
        "bundle" => Some(bundle::group()),
        "django" => Some(django::group()),
        "heroku" => Some(heroku::group()),
        "south" => Some(south::group()),
        _ => None,
    }
}
