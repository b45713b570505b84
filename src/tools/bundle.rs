//! Content bundles moved between django environments
//!
//! Wraps the project's `bundle` management command, which dumps, loads and deletes a
//! deal and its related models. The target database is picked by name from the
//! `bundle` settings and handed to the command as `DATABASE_URL`.

use std::path::PathBuf;

use crate::commands::{CommandError, Commander, Context, GroupSpec, at_most, required};
use crate::settings::Settings;
use crate::shell::Local;

const DUMP: &str = "Dumps a given deal out to a fixture file.

The database argument selects the DATABASE_URL from the bundle settings. The
fixture is written below the configured BUNDLE_ROOT.

Usage:
    blt bundle.dump (deal_slug) (database)

Examples:
    blt bundle.dump blumhouse-productions STAGING";

const LOAD: &str = "Loads a deal from a fixture file.

Loads the fixture from BUNDLE_ROOT into the given database. Data loaded earlier is
detected, so this can be run repeatedly; use bundle.delete first to push a fresh
copy.

Usage:
    blt bundle.load (deal_slug) (database)

Examples:
    blt bundle.load blumhouse-productions PRODUCTION";

const DELETE: &str = "Deletes a deal on the platform.

Removes the deal and all related objects from the given database. Bundles never
overwrite existing rows, so updating a deal means deleting it first.

Usage:
    blt bundle.delete (deal_slug) (database)

Examples:
    blt bundle.delete blumhouse-productions STAGING";

pub const OPERATIONS: &[(&str, &str)] = &[("delete", DELETE), ("dump", DUMP), ("load", LOAD)];

#[must_use]
pub fn group() -> GroupSpec {
    GroupSpec::from_table("BundleCommands", OPERATIONS, |cfg, ctx| {
        Box::new(BundleCommands { cfg, ctx })
    })
}

pub struct BundleCommands {
    cfg: Settings,
    ctx: Context,
}

impl BundleCommands {
    /// Runner in `DJANGO_ROOT` with `DATABASE_URL` pointing at `database`.
    fn runner(&self, database: &str) -> Result<Local<'_>, CommandError> {
        let url = self.cfg.scalar(&format!("bundle.{database}"))?;
        Ok(self
            .ctx
            .local()
            .cd(self.cfg.str("django.DJANGO_ROOT")?)
            .env("DATABASE_URL", url))
    }

    fn fixture_file(&self, slug: &str) -> Result<PathBuf, CommandError> {
        Ok(PathBuf::from(self.cfg.str("bundle.BUNDLE_ROOT")?)
            .join(slug)
            .join("db")
            .join("fixture.xml"))
    }

    fn dump(&self, slug: &str, database: &str) -> Result<(), CommandError> {
        let runner = self.runner(database)?;
        let fixture = self.fixture_file(slug)?;
        if let Some(dir) = fixture.parent()
            && !dir.is_dir()
        {
            std::fs::create_dir_all(dir)?;
            println!("Created bundle db dir: {}", dir.display());
        }
        runner.run(format!(
            "python manage.py bundle dump {slug} {}",
            fixture.display()
        ))
    }

    fn load(&self, slug: &str, database: &str) -> Result<(), CommandError> {
        let runner = self.runner(database)?;
        runner.run(format!(
            "python manage.py bundle load {}",
            self.fixture_file(slug)?.display()
        ))
    }

    fn delete(&self, slug: &str, database: &str) -> Result<(), CommandError> {
        self.runner(database)?
            .run(format!("python manage.py bundle delete {slug}"))
    }
}

impl Commander for BundleCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        at_most(operation, args, 2)?;
        let slug = required(operation, args, 0, "deal_slug")?;
        let database = required(operation, args, 1, "database")?;
        match operation {
            "dump" => self.dump(slug, database),
            "load" => self.load(slug, database),
            "delete" => self.delete(slug, database),
            other => Err(CommandError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::prompt::Scripted;
    use crate::shell::DryRun;

    const LOCAL_DB: &str = "sqlite://///Users/laphroaig/.virtualenvs/payinstr/db.sqlite3";
    const STAGING_DB: &str = "sqlite://///Users/lagavulin/.virtualenvs/payinstr/db.sqlite3";

    fn run(root: &Path, operation: &str, args: &[&str]) -> Arc<DryRun> {
        let Value::Object(map) = json!({
            "bundle": {
                "BUNDLE_ROOT": root.display().to_string(),
                "LOCAL": LOCAL_DB,
                "STAGING": STAGING_DB
            },
            "django": {"DJANGO_ROOT": "djangoproj"}
        }) else {
            unreachable!()
        };
        let shell = Arc::new(DryRun::silent());
        let ctx = Context::new(shell.clone(), Arc::new(Scripted::default()));
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        group()
            .instantiate(Settings::from(map), ctx)
            .execute(operation, &args)
            .unwrap();
        shell
    }

    #[test]
    fn test_dump_creates_fixture_dir() {
        let dir = tempfile::tempdir().unwrap();
        let shell = run(dir.path(), "dump", &["scotch-scotch-scotch", "LOCAL"]);

        let fixture = dir.path().join("scotch-scotch-scotch/db/fixture.xml");
        assert!(dir.path().join("scotch-scotch-scotch/db").is_dir());
        let history = shell.history();
        assert_eq!(
            history[0].line,
            format!(
                "python manage.py bundle dump scotch-scotch-scotch {}",
                fixture.display()
            )
        );
        assert_eq!(history[0].cwd, Some(PathBuf::from("djangoproj")));
        assert_eq!(
            history[0].env.get("DATABASE_URL").map(String::as_str),
            Some(LOCAL_DB)
        );
    }

    #[test]
    fn test_load_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let fixture = dir.path().join("scotch-scotch-scotch/db/fixture.xml");

        let shell = run(dir.path(), "load", &["scotch-scotch-scotch", "STAGING"]);
        let history = shell.history();
        assert_eq!(
            history[0].line,
            format!("python manage.py bundle load {}", fixture.display())
        );
        assert_eq!(
            history[0].env.get("DATABASE_URL").map(String::as_str),
            Some(STAGING_DB)
        );
        assert!(!dir.path().join("scotch-scotch-scotch").exists());

        let shell = run(dir.path(), "delete", &["scotch-scotch-scotch", "STAGING"]);
        assert_eq!(
            shell.lines(),
            vec!["python manage.py bundle delete scotch-scotch-scotch"]
        );
    }
}
