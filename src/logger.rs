use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use anstyle::Style;
use log::{Level, Log, Metadata, Record, SetLoggerError};
use parking_lot::Mutex;

use crate::theme::{self, Palette};

struct BltLogger {
    palette: Palette,
    file: Option<Mutex<File>>,
    filter: log::LevelFilter,
    start: Instant,
}

impl Log for BltLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let label = format!("[{}]", record.level());
        eprintln!(
            "{} {}",
            self.palette.paint(level_style(record.level()), &label),
            record.args()
        );

        if let Some(ref file) = self.file {
            let elapsed = self.start.elapsed().as_secs_f64();
            let _ = writeln!(
                file.lock(),
                "[{elapsed:.3}s] [{}] {}: {}",
                record.level(),
                record.target(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        if let Some(ref file) = self.file {
            let _ = file.lock().flush();
        }
    }
}

/// Parse a `RUST_LOG` style level, falling back to warnings only.
fn parse_filter(value: Option<&str>) -> log::LevelFilter {
    value
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(log::LevelFilter::Warn)
}

/// Install the global logger. Records go to stderr and, when `log_file` is given,
/// are appended to that file as well.
///
/// The level comes from `RUST_LOG` and defaults to `warn`. A log file that cannot be
/// opened is reported once and otherwise ignored.
///
/// # Errors
///
/// Returns `SetLoggerError` if a logger was already installed.
pub fn init(log_file: Option<&Path>) -> Result<(), SetLoggerError> {
    let filter = parse_filter(std::env::var("RUST_LOG").ok().as_deref());

    let file = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Mutex::new(file)),
            Err(e) => {
                eprintln!("Unable to open log file {}: {e}", path.display());
                None
            }
        }
    });

    let logger = BltLogger {
        palette: Palette::stderr(),
        file,
        filter,
        start: Instant::now(),
    };

    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(filter);
    Ok(())
}

/// Style of the level label on stderr.
#[must_use]
pub fn level_style(level: Level) -> Style {
    match level {
        Level::Error => theme::FAILURE,
        Level::Warn => theme::WARNING,
        Level::Info => theme::COMMAND,
        Level::Debug | Level::Trace => theme::DIM,
    }
}
