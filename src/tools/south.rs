//! South schema migration wrappers
//!
//! South has no API for the status of model changes; it prints a summary to stderr and
//! migration code to stdout. `status` parses that output, so it depends on South's
//! exact wording.

use crate::commands::{CommandError, Commander, Context, GroupSpec, at_most, optional};
use crate::settings::Settings;
use crate::shell::Local;

const IN_SYNC: &str = "Nothing seems to have changed.";

const STATUS: &str = "Check the status of outstanding database migrations.

Reports model changes that have no migration yet, and migrations that have not
been applied to the database.

Usage:
    blt south.status (app)

Examples:
    blt south.status invest - displays status for the invest app";

const DELTA: &str = "Creates a new schema changeset for an app.

South does not support project-wide schemamigrations, so app names are required.

Usage:
    blt south.delta (apps)

Examples:
    blt south.delta invest payment - creates deltas for invest and payment apps";

const MIGRATE: &str = "Applies all outstanding deltas to the database.

Without apps the migrations of the entire django project are applied.

Usage:
    blt south.migrate [apps]

Examples:
    blt south.migrate - runs all migrations
    blt south.migrate invest payment - runs migrations for invest and payment apps";

pub const OPERATIONS: &[(&str, &str)] = &[("delta", DELTA), ("migrate", MIGRATE), ("status", STATUS)];

#[must_use]
pub fn group() -> GroupSpec {
    GroupSpec::from_table("SouthCommands", OPERATIONS, |cfg, ctx| {
        Box::new(SouthCommands { cfg, ctx })
    })
}

pub struct SouthCommands {
    cfg: Settings,
    ctx: Context,
}

impl SouthCommands {
    fn in_root(&self) -> Result<Local<'_>, CommandError> {
        Ok(self.ctx.local().cd(self.cfg.str("django.DJANGO_ROOT")?))
    }

    fn status(&self, app: Option<&str>) -> Result<(), CommandError> {
        let Some(app) = app else {
            return Err(CommandError::Aborted(
                [
                    "\nsouth status requires an *app* to check. for example:\n",
                    "    blt south.status my_app\n",
                    "To check which apps have had model changes run:\n",
                    "    git status | grep models.py",
                ]
                .join("\n"),
            ));
        };
        let root = self.in_root()?;

        println!("-- Model Check -----------------------------------------------------------");
        let changes = root.capture_lenient(format!(
            "python manage.py schemamigration {app} --auto --stdout 2>&1"
        ))?;
        if changes.trim() == IN_SYNC {
            println!("Model is in sync with migrations");
        } else {
            println!("Model changes found:\n\n{changes}");
            println!("\n==> Run `blt south.delta {app}` to create a migration set.");
        }

        println!("\n-- Unapplied Migrations --------------------------------------------------");
        let pending = root.capture(format!(
            "python manage.py migrate {app} --list | grep -v \"*\" 2>&1"
        ))?;
        if pending.trim() == app {
            println!("All migrations have been applied to db");
        } else {
            println!("Migrations need to be applied to db:\n{}", pending.trim());
            println!("\n==> Run `blt south.migrate` to push to the database\n");
        }
        Ok(())
    }

    fn delta(&self, apps: &[String]) -> Result<(), CommandError> {
        if apps.is_empty() {
            return Err(CommandError::Aborted(
                "\n\nPlease provide an app name, e.g. \n    blt south.delta my_app".to_string(),
            ));
        }
        let root = self.in_root()?;
        for app in apps {
            root.run(format!("python manage.py schemamigration {app} --auto"))?;
        }
        Ok(())
    }

    fn migrate(&self, apps: &[String]) -> Result<(), CommandError> {
        let root = self.in_root()?;
        if apps.is_empty() {
            return root.run("python manage.py migrate");
        }
        for app in apps {
            root.run(format!("python manage.py migrate {app}"))?;
        }
        Ok(())
    }
}

impl Commander for SouthCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        match operation {
            "status" => at_most(operation, args, 1).and_then(|()| self.status(optional(args, 0))),
            "delta" => self.delta(args),
            "migrate" => self.migrate(args),
            other => Err(CommandError::UnknownOperation(other.to_string())),
        }
    }
}
