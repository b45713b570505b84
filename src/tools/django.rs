//! Django management commands
//!
//! Settings: `django.DJANGO_ROOT` (directory holding `manage.py`) and
//! `django.PROJECT_DIR` (the Python package with `settings` and `wsgi`).

use crate::commands::{CommandError, Commander, Context, GroupSpec, at_most, optional};
use crate::settings::Settings;
use crate::shell::Local;

const CLEAR_PYC: &str = r#"find . -name "*.pyc" -exec rm -f {} \;"#;
const VIRTUALENV_HINT: &str = "ERROR: Python couldn't find django.  Are you in a virtualenv?\nTry workon MY_SWEET_VIRTENV_HERE";

const UP: &str = "Update a django environment with latest settings.

This command does everything required to get a django project running:

1. pip install requirements
2. syncdb
3. migrate
4. loaddata initial
5. collectstatic
6. assets build

It can be rerun safely. Installed pip packages are skipped and database tables are
preserved.

This must be run in a virtualenv; a missing django is reported with a hint.

Usage:
    blt django.up";

const RUNSERVER: &str = "Runs django's development http server

Usage:
    blt django.runserver [ip] [port]

Examples:
    blt django.runserver - default, runs on 127.0.0.1:8000
    blt django.runserver 10.1.156.3 - runs on 10.1.156.3:8000
    blt django.runserver 10.1.156.3 8888 - runs on 10.1.156.3:8888";

const GUNICORN_SERVER: &str = "Runs Gunicorn server for pseudo-production testing.

Any arguments are passed to gunicorn.

Usage:
    blt django.gunicorn_server [args]";

const COLLECTSTATIC: &str = "Runs django's collectstatic and the webassets build in one command";

const SHELL: &str = "Opens a session to django's shell";

const TEST: &str = "Runs py.test for the django project.

Without apps every test runs. Tests may be selected as
<appname>[.<search_phrase_1>[.<search_phrase_2>...]], and arguments starting with
a dash are passed to py.test as flags.

Search phrases are not recommended when testing several apps at once, as py.test
applies them to every app.

Usage:
    blt django.test [apps]

Examples:
    blt django.test - runs all tests in the project
    blt django.test my_app1 my_app2 - runs all tests for my_app1 and my_app2
    blt django.test my_app.MyTestCase.test_something - runs a single test";

const COV: &str = "Runs coverage for the django project.

The py.test suite runs first, as it generates the coverage data. Pass apps to limit
the report to them.

Usage:
    blt django.cov [apps] [flags]

Examples:
    blt django.cov - runs coverage for the entire project
    blt django.cov my_app1 my_app2 - runs coverage for my_app1 and my_app2";

const COVRPT: &str = "Opens the html version of the coverage report in your browser.

Usage:
    blt django.covrpt";

pub const OPERATIONS: &[(&str, &str)] = &[
    ("collectstatic", COLLECTSTATIC),
    ("cov", COV),
    ("covrpt", COVRPT),
    ("gunicorn_server", GUNICORN_SERVER),
    ("runserver", RUNSERVER),
    ("shell", SHELL),
    ("test", TEST),
    ("up", UP),
];

#[must_use]
pub fn group() -> GroupSpec {
    GroupSpec::from_table("DjangoCommands", OPERATIONS, |cfg, ctx| {
        Box::new(DjangoCommands { cfg, ctx })
    })
}

/// Join the non-empty parts of a command line with single spaces.
fn command_line(parts: &[&str]) -> String {
    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Default, PartialEq, Eq)]
struct TestSelection {
    flags: Vec<String>,
    apps: Vec<String>,
    phrases: Vec<String>,
}

impl TestSelection {
    fn parse(args: &[String]) -> Self {
        let mut selection = Self::default();
        for arg in args {
            if arg.starts_with('-') {
                selection.flags.push(arg.clone());
            } else if let Some((app, phrases)) = arg.split_once('.') {
                selection.apps.push(app.to_string());
                selection
                    .phrases
                    .extend(phrases.split('.').map(ToString::to_string));
            } else {
                selection.apps.push(arg.clone());
            }
        }
        selection
    }
}

pub struct DjangoCommands {
    cfg: Settings,
    ctx: Context,
}

impl DjangoCommands {
    fn project(&self) -> Result<&str, CommandError> {
        self.cfg.str("django.PROJECT_DIR")
    }

    fn in_root(&self) -> Result<Local<'_>, CommandError> {
        Ok(self.ctx.local().cd(self.cfg.str("django.DJANGO_ROOT")?))
    }

    fn up(&self) -> Result<(), CommandError> {
        let root = self.in_root()?;
        self.ctx.local().run("pip install -r requirements.txt")?;

        root.run("python manage.py syncdb")
            .and_then(|()| root.run("python manage.py migrate"))
            .map_err(|e| match e {
                CommandError::Shell { .. } => CommandError::Aborted(VIRTUALENV_HINT.to_string()),
                other => other,
            })?;

        root.run("python manage.py loaddata initial")?;
        root.run("python manage.py collectstatic --noinput")?;
        root.run("python manage.py assets build")
    }

    fn runserver(&self, ip: Option<&str>, port: Option<&str>) -> Result<(), CommandError> {
        let root = self.in_root()?;
        println!("Setting ASSETS_DEBUG=True");
        root.env("ASSETS_DEBUG", "True").run(format!(
            "python manage.py runserver {}:{}",
            ip.unwrap_or("127.0.0.1"),
            port.unwrap_or("8000")
        ))
    }

    fn gunicorn_server(&self, args: &[String]) -> Result<(), CommandError> {
        let application = format!("{}.wsgi:application", self.project()?);
        self.in_root()?.run(command_line(&[
            "gunicorn",
            &args.join(" "),
            "--access-logfile=- --error-logfile=-",
            &application,
        ]))
    }

    fn collectstatic(&self) -> Result<(), CommandError> {
        let root = self.in_root()?;
        root.run("python manage.py collectstatic --noinput")?;
        root.run("python manage.py assets build")
    }

    fn shell(&self) -> Result<(), CommandError> {
        self.in_root()?.run("python manage.py shell")
    }

    fn test(&self, args: &[String]) -> Result<(), CommandError> {
        let settings = format!("--ds {}.settings", self.project()?);
        let root = self.in_root()?;
        self.ctx.local().run(CLEAR_PYC)?;

        let selection = TestSelection::parse(args);
        let keyword = if selection.phrases.is_empty() {
            String::new()
        } else {
            format!("-k \"{}\"", selection.phrases.join(" and "))
        };
        root.run(command_line(&[
            "py.test",
            &settings,
            &selection.flags.join(" "),
            &selection.apps.join(" "),
            &keyword,
        ]))
    }

    fn cov(&self, args: &[String]) -> Result<(), CommandError> {
        let settings = format!("--ds {}.settings", self.project()?);
        let root = self.in_root()?;
        self.ctx.local().run(CLEAR_PYC)?;

        let (flags, apps): (Vec<&String>, Vec<&String>) =
            args.iter().partition(|arg| arg.starts_with('-'));
        let flags = flags.iter().map(|f| f.as_str()).collect::<Vec<_>>().join(" ");
        let apps: Vec<&str> = apps.iter().map(|app| app.as_str()).collect();
        let source = if apps.is_empty() {
            String::new()
        } else {
            format!("--source {}", apps.join(","))
        };

        root.run(command_line(&[
            "coverage run",
            &source,
            &flags,
            "-m py.test",
            &settings,
            &apps.join(" "),
        ]))?;
        root.run("coverage report")?;
        root.run("coverage html -d coverage_html")
    }

    fn covrpt(&self) -> Result<(), CommandError> {
        self.in_root()?.run("open coverage_html/index.html")
    }
}

impl Commander for DjangoCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        match operation {
            "up" => at_most(operation, args, 0).and_then(|()| self.up()),
            "runserver" => at_most(operation, args, 2)
                .and_then(|()| self.runserver(optional(args, 0), optional(args, 1))),
            "gunicorn_server" => self.gunicorn_server(args),
            "collectstatic" => at_most(operation, args, 0).and_then(|()| self.collectstatic()),
            "shell" => at_most(operation, args, 0).and_then(|()| self.shell()),
            "test" => self.test(args),
            "cov" => self.cov(args),
            "covrpt" => at_most(operation, args, 0).and_then(|()| self.covrpt()),
            other => Err(CommandError::UnknownOperation(other.to_string())),
        }
    }
}
