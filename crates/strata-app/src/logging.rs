//! Logging setup: env_logger writing to the console and/or a log file.
//!
//! The log directory comes from the `GLASS_LOG` environment variable
//! (default `./`); the log level starts at info and is adjusted later from
//! the `LogLevel` configuration key via the max-level filter.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use parking_lot::Mutex;

/// Tees log output to stderr and/or a log file, flushing the file after
/// each record so tail -f keeps up with a long-running pipeline.
struct TeeWriter {
    console: bool,
    file: Option<Mutex<std::fs::File>>,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.console {
            io::stderr().write_all(buf)?;
        }
        if let Some(file) = &self.file {
            let mut file = file.lock();
            file.write_all(buf)?;
            file.flush()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.console {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

/// Initializes logging. `log_dir/<log_name>.log` receives a copy of every
/// record; `console` controls stderr output.
pub fn init(log_name: &str, log_dir: &str, console: bool) -> Result<()> {
    let path = Path::new(log_dir).join(format!("{log_name}.log"));
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let writer = TeeWriter { console, file: Some(Mutex::new(file)) };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "trace"),
    );
    builder
        .format(|buf, record| {
            let stamp = strata_core::time::epoch_to_iso8601(strata_core::time::now_epoch());
            writeln!(buf, "{stamp} [{}] {}: {}", record.level(), record.target(), record.args())
        })
        .write_style(env_logger::WriteStyle::Never)
        .target(env_logger::Target::Pipe(Box::new(writer)));
    builder.init();

    // the builder filter stays wide open; the max-level filter is the knob
    log::set_max_level(log::LevelFilter::Info);
    Ok(())
}

/// Applies a `LogLevel` configuration value.
pub fn update_level(level: &str) {
    let filter = match level {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warning" | "warn" => log::LevelFilter::Warn,
        "error" | "criticalerror" => log::LevelFilter::Error,
        other => {
            log::warn!("logging: unknown LogLevel {other}, keeping info");
            log::LevelFilter::Info
        }
    };
    log::set_max_level(filter);
}
