//! Heroku toolbelt wrappers
//!
//! Settings live under `heroku`: `app`, `git_remote`, `git_branch`, plus the optional
//! `config`, `addons`, `domains`, `post_deploy` and `migrate` used by the composite
//! operations.

use crate::commands::{CommandError, Commander, Context, GroupSpec, at_most, optional, rest};
use crate::prompt;
use crate::settings::Settings;
use crate::theme::{self, Palette};

const INFO: &str = "Shows the info for your current heroku environment

Usage:
    blt e:[env] heroku.info";

const CREATE: &str = "Provisions a fully configured heroku app from scratch.

Runs, in order: heroku apps:create, heroku config:set, git push, heroku addons:add,
heroku domains:add (when domains are configured) and every post_deploy command.

A git remote is created for the environment, and the configured git_branch is pushed
even when it is not master.

Usage:
    blt e:[env] heroku.create";

const DESTROY: &str = "Destroys a heroku app.

The heroku toolbelt will verify this operation before executing.

Usage:
    blt e:[env] heroku.destroy";

const PUSH: &str = "Pushes your local git branch to heroku.

Pushing from a non-master branch is handled for you, set git_branch in the
heroku settings of the environment.

Usage:
    blt e:[env] heroku.push [arg]

Examples:
    blt e:s heroku.push - pushes branch to heroku staging environment
    blt e:s heroku.push force - forces a push to heroku staging
    blt e:p heroku.push verbose - pushes to production in verbose mode";

const CONFIG: &str = "Executes a set/get/unset action to the remote heroku config.

Usage:
    blt e:[env] heroku.config [set|get|unset] [\"Key=Value\"]

Examples:
    blt e:s heroku.config - lists the current config on staging
    blt e:s heroku.config set - sets *ALL* config from the environment file on heroku
    blt e:p heroku.config set \"SSL_ENABLED=True\" - sets SSL_ENABLED in production
    blt e:p heroku.config unset SSL_ENABLED - unsets SSL_ENABLED in production";

const ADDON: &str = "Executes an add/remove/upgrade action to the remote heroku addons.

Usage:
    blt e:[env] heroku.addon [add|remove|upgrade] [\"addon:level\"]

Examples:
    blt e:s heroku.addon - lists the current addons on staging
    blt e:s heroku.addon add - adds *ALL* addons from the environment file
    blt e:p heroku.addon add \"newrelic:standard\" - adds newrelic in production
    blt e:p heroku.addon remove newrelic - removes newrelic from production";

const DOMAIN: &str = "Executes an add/clear/remove action to the remote heroku domains.

Usage:
    blt e:[env] heroku.domain [add|clear|remove] [domain]

Examples:
    blt e:s heroku.domain - lists the current domains on staging
    blt e:s heroku.domain add - adds *ALL* domains from the environment file
    blt e:p heroku.domain add \"example.com\" - adds example.com in production
    blt e:p heroku.domain clear - clears all domains in production";

const RUN: &str = "Runs a given command on heroku.

Usage:
    blt e:[env] heroku.run \"command\"

Examples:
    blt e:s heroku.run bash - opens a bash session on heroku staging
    blt e:p heroku.run \"ls -altr\" - runs ls -altr on heroku production";

const MIGRATE: &str = "Runs a database migration on heroku.

The commands come from heroku.migrate in the environment settings, as apps and
databases differ in how they migrate.

Usage:
    blt e:[env] heroku.migrate";

pub const OPERATIONS: &[(&str, &str)] = &[
    ("addon", ADDON),
    ("config", CONFIG),
    ("create", CREATE),
    ("destroy", DESTROY),
    ("domain", DOMAIN),
    ("info", INFO),
    ("migrate", MIGRATE),
    ("push", PUSH),
    ("run", RUN),
];

#[must_use]
pub fn group() -> GroupSpec {
    GroupSpec::from_table("HerokuCommands", OPERATIONS, |cfg, ctx| {
        Box::new(HerokuCommands { cfg, ctx })
    })
}

pub struct HerokuCommands {
    cfg: Settings,
    ctx: Context,
}

impl HerokuCommands {
    fn app(&self) -> Result<&str, CommandError> {
        self.cfg.str("heroku.app")
    }

    fn info(&self) -> Result<(), CommandError> {
        self.ctx
            .local()
            .run(format!("heroku apps:info --app {}", self.app()?))
    }

    fn create(&self) -> Result<(), CommandError> {
        let palette = Palette::stdout();
        let app = self.app()?;
        println!("******** Creating New Heroku App ********");
        println!("App Name: {}", palette.paint(theme::SUCCESS, app));
        println!(
            "Environment: {}",
            palette.paint(theme::SUCCESS, self.cfg.str("blt_envtype")?)
        );
        println!(
            "Branch: {}",
            palette.paint(theme::SUCCESS, self.cfg.str("heroku.git_branch")?)
        );
        if !prompt::confirm(self.ctx.prompt.as_ref(), "\nLook good? ==>")? {
            return Err(CommandError::Aborted("Aborting heroku creation.".to_string()));
        }

        self.ctx.local().run(format!(
            "heroku apps:create {app} --remote {}",
            self.cfg.str("heroku.git_remote")?
        ))?;
        self.config(Some("set"), &[])?;
        self.push(None)?;
        self.addon(Some("add"), &[])?;
        if self.cfg.contains("heroku.domains") {
            self.domain(Some("add"), &[])?;
        }
        self.run(&self.cfg.list("heroku.post_deploy")?)?;

        println!("\nHeroku Deploy Complete!");
        println!("==> http://{app}.herokuapp.com/");
        Ok(())
    }

    fn destroy(&self) -> Result<(), CommandError> {
        self.ctx
            .local()
            .run(format!("heroku apps:destroy {}", self.app()?))
    }

    fn push(&self, git_arg: Option<&str>) -> Result<(), CommandError> {
        let mut line = format!(
            "git push {} {}:master",
            self.cfg.str("heroku.git_remote")?,
            self.cfg.str("heroku.git_branch")?
        );
        if let Some(arg) = git_arg {
            line.push_str(&format!(" --{arg}"));
        }
        self.ctx.local().run(line)
    }

    fn config(&self, action: Option<&str>, configs: &[String]) -> Result<(), CommandError> {
        let app = self.app()?;
        let Some(action) = action else {
            return self.ctx.local().run(format!("heroku config --app {app}"));
        };
        let configs = if configs.is_empty() {
            self.cfg
                .pairs("heroku.config")?
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect()
        } else {
            configs.to_vec()
        };
        self.ctx.local().run(format!(
            "heroku config:{action} {} --app {app}",
            configs.join(" ")
        ))
    }

    fn addon(&self, action: Option<&str>, addons: &[String]) -> Result<(), CommandError> {
        let app = self.app()?;
        let Some(action) = action else {
            return self.ctx.local().run(format!("heroku addons --app {app}"));
        };
        let addons = if addons.is_empty() {
            self.cfg
                .pairs("heroku.addons")?
                .into_iter()
                .map(|(name, level)| format!("{name}:{level}"))
                .collect()
        } else {
            addons.to_vec()
        };
        let local = self.ctx.local();
        for addon in addons {
            local.run(format!("heroku addons:{action} {addon} --app {app}"))?;
        }
        Ok(())
    }

    fn domain(&self, action: Option<&str>, domains: &[String]) -> Result<(), CommandError> {
        let app = self.app()?;
        let Some(action) = action else {
            return self.ctx.local().run(format!("heroku domains --app {app}"));
        };
        let domains = if domains.is_empty() {
            self.cfg.list("heroku.domains")?
        } else {
            domains.to_vec()
        };
        let local = self.ctx.local();
        for domain in domains {
            local.run(format!("heroku domains:{action} {domain} --app {app}"))?;
        }
        Ok(())
    }

    fn run(&self, commands: &[String]) -> Result<(), CommandError> {
        let app = self.app()?;
        let local = self.ctx.local();
        for command in commands {
            local.run(format!("heroku run \"{command}\" --app {app}"))?;
        }
        Ok(())
    }

    fn migrate(&self) -> Result<(), CommandError> {
        self.run(&self.cfg.list("heroku.migrate")?)
    }
}

impl Commander for HerokuCommands {
    fn execute(&mut self, operation: &str, args: &[String]) -> Result<(), CommandError> {
        match operation {
            "info" => at_most(operation, args, 0).and_then(|()| self.info()),
            "create" => at_most(operation, args, 0).and_then(|()| self.create()),
            "destroy" => at_most(operation, args, 0).and_then(|()| self.destroy()),
            "push" => at_most(operation, args, 1).and_then(|()| self.push(optional(args, 0))),
            "config" => self.config(optional(args, 0), rest(args, 1)),
            "addon" => self.addon(optional(args, 0), rest(args, 1)),
            "domain" => self.domain(optional(args, 0), rest(args, 1)),
            "run" => self.run(args),
            "migrate" => at_most(operation, args, 0).and_then(|()| self.migrate()),
            other => Err(CommandError::UnknownOperation(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use super::*;
    use crate::prompt::Scripted;
    use crate::shell::DryRun;

    fn settings() -> Settings {
        let Value::Object(map) = json!({
            "heroku": {
                "app": "pubweb-staging",
                "git_remote": "heroku-staging",
                "git_branch": "test-branch",
                "addons": {"papertrail": "choklad", "newrelic": "standard"},
                "config": {"DEBUG": "False", "PRODUCTION": "True", "SSL_ENABLED": "False"},
                "post_deploy": [
                    "python djangoproj/manage.py syncdb",
                    "python djangoproj/manage.py migrate"
                ],
                "domains": ["app1.pubvest.com", "app2.pubvest.com"],
                "migrate": ["python djangoproj/manage.py migrate"]
            },
            "blt_envtype": "staging"
        }) else {
            unreachable!()
        };
        Settings::from(map)
    }

    fn execute_with(answers: &[&str], operation: &str, args: &[&str]) -> Vec<String> {
        let shell = Arc::new(DryRun::silent());
        let ctx = Context::new(shell.clone(), Arc::new(Scripted::new(answers.iter().copied())));
        let args: Vec<String> = args.iter().map(ToString::to_string).collect();
        group()
            .instantiate(settings(), ctx)
            .execute(operation, &args)
            .unwrap();
        shell.lines()
    }

    fn execute(operation: &str, args: &[&str]) -> Vec<String> {
        execute_with(&[], operation, args)
    }

    #[test]
    fn test_single_app_commands() {
        assert_eq!(execute("info", &[]), vec!["heroku apps:info --app pubweb-staging"]);
        assert_eq!(execute("destroy", &[]), vec!["heroku apps:destroy pubweb-staging"]);
        assert_eq!(execute("config", &[]), vec!["heroku config --app pubweb-staging"]);
        assert_eq!(execute("addon", &[]), vec!["heroku addons --app pubweb-staging"]);
        assert_eq!(execute("domain", &[]), vec!["heroku domains --app pubweb-staging"]);
    }

    #[test]
    fn test_push() {
        assert_eq!(
            execute("push", &[]),
            vec!["git push heroku-staging test-branch:master"]
        );
        assert_eq!(
            execute("push", &["force"]),
            vec!["git push heroku-staging test-branch:master --force"]
        );
    }

    #[test]
    fn test_config_set() {
        assert_eq!(
            execute("config", &["set"]),
            vec!["heroku config:set DEBUG=False PRODUCTION=True SSL_ENABLED=False --app pubweb-staging"]
        );
        assert_eq!(
            execute("config", &["set", "Darth=Vader Han=Solo"]),
            vec!["heroku config:set Darth=Vader Han=Solo --app pubweb-staging"]
        );
    }

    #[test]
    fn test_addon_and_domain_add() {
        assert_eq!(
            execute("addon", &["add"]),
            vec![
                "heroku addons:add newrelic:standard --app pubweb-staging",
                "heroku addons:add papertrail:choklad --app pubweb-staging",
            ]
        );
        assert_eq!(
            execute("addon", &["add", "Darth:Vader"]),
            vec!["heroku addons:add Darth:Vader --app pubweb-staging"]
        );
        assert_eq!(
            execute("domain", &["add", "app3.pubvest.com"]),
            vec!["heroku domains:add app3.pubvest.com --app pubweb-staging"]
        );
    }

    #[test]
    fn test_run_and_migrate() {
        assert_eq!(
            execute("run", &["python manage.py runserver"]),
            vec!["heroku run \"python manage.py runserver\" --app pubweb-staging"]
        );
        assert_eq!(
            execute("migrate", &[]),
            vec!["heroku run \"python djangoproj/manage.py migrate\" --app pubweb-staging"]
        );
    }

    #[test]
    fn test_create_runs_every_step() {
        assert_eq!(
            execute_with(&["yes"], "create", &[]),
            vec![
                "heroku apps:create pubweb-staging --remote heroku-staging",
                "heroku config:set DEBUG=False PRODUCTION=True SSL_ENABLED=False --app pubweb-staging",
                "git push heroku-staging test-branch:master",
                "heroku addons:add newrelic:standard --app pubweb-staging",
                "heroku addons:add papertrail:choklad --app pubweb-staging",
                "heroku domains:add app1.pubvest.com --app pubweb-staging",
                "heroku domains:add app2.pubvest.com --app pubweb-staging",
                "heroku run \"python djangoproj/manage.py syncdb\" --app pubweb-staging",
                "heroku run \"python djangoproj/manage.py migrate\" --app pubweb-staging",
            ]
        );
    }

    #[test]
    fn test_create_declined_runs_nothing() {
        let shell = Arc::new(DryRun::silent());
        let ctx = Context::new(shell.clone(), Arc::new(Scripted::new(["no"])));
        let result = group().instantiate(settings(), ctx).execute("create", &[]);
        assert!(matches!(result, Err(CommandError::Aborted(_))));
        assert!(shell.lines().is_empty());
    }

    #[test]
    fn test_push_rejects_extra_arguments() {
        let shell = Arc::new(DryRun::silent());
        let ctx = Context::new(shell, Arc::new(Scripted::default()));
        let args = vec!["force".to_string(), "verbose".to_string()];
        assert!(matches!(
            group().instantiate(settings(), ctx).execute("push", &args),
            Err(CommandError::TooManyArguments { max: 1, .. })
        ));
    }
}
