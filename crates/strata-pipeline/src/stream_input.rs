//! Line-stream input adapter.
//!
//! Feeds the input stage from any line-oriented reader, most usefully
//! stdin for piping picks straight into the pipeline. All lines carry the
//! configured format tag; end of stream optionally shuts the stage down.

use std::io::BufRead;

use parking_lot::Mutex;
use strata_core::config::{Config, KIND_GLASS_INPUT};
use strata_core::worker::WorkerState;

use crate::error::{check_kind, SetupError};
use crate::input::{FetchContext, RawFetch};

/// A [`RawFetch`] source reading lines from a buffered reader.
pub struct StreamFetcher<R: BufRead + Send> {
    reader: Mutex<R>,
    format: String,
    shutdown_at_eof: bool,
    // once the stream ends it stays ended
    exhausted: Mutex<bool>,
}

impl<R: BufRead + Send> StreamFetcher<R> {
    pub fn new(reader: R, format: &str, shutdown_at_eof: bool) -> Self {
        Self {
            reader: Mutex::new(reader),
            format: format.to_string(),
            shutdown_at_eof,
            exhausted: Mutex::new(false),
        }
    }

    /// Builds the adapter from a `GlassInput` configuration; the `Format`
    /// key tags every line (default `gpick`).
    pub fn from_config(config: &Config, reader: R) -> Result<Self, SetupError> {
        check_kind(config, KIND_GLASS_INPUT)?;

        let format = config.get_str("Format").unwrap_or("gpick");
        let shutdown_at_eof = config.get_bool("ShutdownWhenNoData").unwrap_or(true);
        Ok(Self::new(reader, format, shutdown_at_eof))
    }
}

impl<R: BufRead + Send> RawFetch for StreamFetcher<R> {
    fn fetch_raw(&self, ctx: &FetchContext) -> Option<(String, String)> {
        if *self.exhausted.lock() {
            if self.shutdown_at_eof && ctx.pending == 0 {
                log::info!("streaminput: stream ended and queue is drained, shutting down");
                ctx.status.set_state(WorkerState::Stopping);
            }
            return None;
        }

        let mut reader = self.reader.lock();
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    log::info!("streaminput: end of stream");
                    *self.exhausted.lock() = true;
                    return None;
                }
                Ok(_) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    return Some((self.format.clone(), line.to_string()));
                }
                Err(e) => {
                    log::error!("streaminput: error reading stream: {e}");
                    *self.exhausted.lock() = true;
                    return None;
                }
            }
        }
    }
}

/// A [`StreamFetcher`] over stdin.
pub fn stdin_fetcher(
    config: &Config,
) -> Result<StreamFetcher<std::io::BufReader<std::io::Stdin>>, SetupError> {
    StreamFetcher::from_config(config, std::io::BufReader::new(std::io::stdin()))
}
