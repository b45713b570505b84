mod run;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use log::debug;

use blt::commands::Context;
use blt::environment::DEFAULT_ENVIRONMENT;
use blt::invocation::Invocation;
use blt::listing;
use blt::prompt::TerminalPrompt;
use blt::shell::{DryRun, Shell, SystemShell};
use blt::theme::{self, Palette};

#[derive(Parser, Debug)]
#[command(
    name = "blt",
    version,
    about = "Run per-environment ops commands declared in a bltenv file"
)]
struct Cli {
    /// Environment file (bltenv.yaml, bltenv.yml or bltenv.json is auto-detected)
    #[arg(short, long)]
    file: Option<String>,

    /// Also append log records to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Echo shell commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// [e:environment] command [args...], or help, list or completion
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    words: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = blt::logger::init(cli.log_file.as_deref()) {
        eprintln!("Logger not installed: {e}");
    }

    let invocation = Invocation::parse(cli.words);
    debug!("Parsed invocation: {invocation:?}");
    if invocation == Invocation::Usage {
        print!("{}", listing::usage(Palette::stdout()));
        return ExitCode::SUCCESS;
    }

    let shell: Arc<dyn Shell> = if cli.dry_run {
        Arc::new(DryRun::new())
    } else {
        Arc::new(SystemShell)
    };
    let context = Context::new(shell, Arc::new(TerminalPrompt));

    let center = match blt::load_center(cli.file.as_deref(), context) {
        Ok(center) => center,
        Err(e) => return abort(&e.to_string()),
    };

    let palette = Palette::stdout();
    match invocation {
        Invocation::Usage => ExitCode::SUCCESS,
        Invocation::Help(names) => {
            let mut out = String::new();
            let result = listing::help(&mut out, center.commands(), &names, palette);
            print!("{out}");
            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => abort(&e.to_string()),
            }
        }
        Invocation::List(filter) => {
            let mut out = String::new();
            listing::list(&mut out, center.commands(), filter.as_deref(), palette);
            print!("{out}");
            ExitCode::SUCCESS
        }
        Invocation::Completion => {
            print!("{}", listing::completion(center.commands()));
            ExitCode::SUCCESS
        }
        Invocation::Run {
            environment,
            defaulted,
            command,
            args,
        } => {
            if defaulted {
                println!(
                    "Environment not defined, defaulting to {}",
                    palette.paint(theme::ENVIRONMENT, DEFAULT_ENVIRONMENT)
                );
            }
            run::dispatch(center, environment, command, args)
        }
    }
}

/// Report an aborted run on stderr.
pub(crate) fn abort(message: &str) -> ExitCode {
    eprint!("{}", listing::fatal_report(message, Palette::stderr()));
    ExitCode::FAILURE
}
