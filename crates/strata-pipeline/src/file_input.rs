//! File-directory input adapter.
//!
//! Scans a directory for files of the configured format, feeds them to the
//! input stage line by line, and archives or deletes each file once
//! processed. Optionally shuts the stage down when the directory and the
//! hand-off queue are both empty.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Instant;

use parking_lot::Mutex;
use strata_core::config::{Config, KIND_GLASS_INPUT};
use strata_core::fileutil;
use strata_core::worker::WorkerState;

use crate::error::{check_kind, SetupError};
use crate::input::{FetchContext, RawFetch};

// gpick files are interleaved with bare epoch timestamp lines; anything this
// short is a timestamp, not a pick
const TIMESTAMP_LINE_MAX_LEN: usize = 11;

struct ScanState {
    reader: Option<BufReader<File>>,
    file_name: Option<PathBuf>,
    file_start: Instant,
    data_count: u64,
}

/// A [`RawFetch`] source reading picks from a spool directory.
pub struct FileFetcher {
    input_dir: PathBuf,
    archive_dir: Option<PathBuf>,
    format: String,
    shutdown_when_no_data: bool,
    shutdown_wait_secs: u64,
    state: Mutex<ScanState>,
}

impl FileFetcher {
    /// Builds the adapter from a `GlassInput` configuration.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        check_kind(config, KIND_GLASS_INPUT)?;

        let input_dir = config
            .get_str("InputDirectory")
            .ok_or(SetupError::MissingKey("InputDirectory"))?
            .to_string();

        let archive_dir = config.get_str("ArchiveDirectory").map(PathBuf::from);
        if archive_dir.is_none() {
            log::info!("fileinput::setup: not archiving input");
        }

        let format = match config.get_str("Format") {
            Some(format) => format.to_string(),
            None => {
                log::warn!("fileinput::setup: no format specified, defaulting to gpick");
                "gpick".to_string()
            }
        };

        let shutdown_when_no_data = config.get_bool("ShutdownWhenNoData").unwrap_or(true);
        let shutdown_wait_secs = config.get_i64("ShutdownWait").unwrap_or(60).max(0) as u64;

        log::info!(
            "fileinput::setup: input dir {input_dir}, format {format}, \
             shutdown when no data {shutdown_when_no_data} (wait {shutdown_wait_secs}s)"
        );

        Ok(Self {
            input_dir: PathBuf::from(input_dir),
            archive_dir,
            format,
            shutdown_when_no_data,
            shutdown_wait_secs,
            state: Mutex::new(ScanState {
                reader: None,
                file_name: None,
                file_start: Instant::now(),
                data_count: 0,
            }),
        })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Reads the next data line, skipping blank and timestamp lines.
    /// `None` means end of file.
    fn next_line(reader: &mut BufReader<File>) -> Option<String> {
        loop {
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {
                    let line = line.trim_end_matches(['\r', '\n']);
                    if line.is_empty() || line.len() <= TIMESTAMP_LINE_MAX_LEN {
                        continue;
                    }
                    return Some(line.to_string());
                }
                Err(e) => {
                    log::error!("fileinput: error reading line: {e}");
                    return None;
                }
            }
        }
    }

    /// Closes the finished file: log throughput, then archive or delete it.
    fn finish_file(&self, state: &mut ScanState) {
        state.reader = None;
        let Some(file_name) = state.file_name.take() else {
            return;
        };

        let elapsed = state.file_start.elapsed().as_secs_f64();
        let average = if state.data_count > 0 { elapsed / state.data_count as f64 } else { 0.0 };
        log::info!(
            "fileinput: processed {} data from file {} in {elapsed:.3} seconds \
             (average {average:.6} seconds)",
            state.data_count,
            file_name.display()
        );

        match &self.archive_dir {
            Some(archive_dir) => {
                fileutil::move_file_to(&file_name, archive_dir);
            }
            None => {
                fileutil::delete_file(&file_name);
            }
        }
    }

    /// No files and nothing queued: heartbeat through the configured wait,
    /// then ask the worker to stop. Data arriving mid-countdown does not
    /// re-arm the timer.
    fn shutdown_countdown(&self, ctx: &FetchContext) {
        log::warn!(
            "fileinput: no more input files and no pending data, shutting down in {} seconds",
            self.shutdown_wait_secs
        );
        for _ in 0..self.shutdown_wait_secs {
            ctx.status.set_thread_health();
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
        log::warn!("fileinput: shutting down");
        ctx.status.set_state(WorkerState::Stopping);
    }
}

impl RawFetch for FileFetcher {
    fn fetch_raw(&self, ctx: &FetchContext) -> Option<(String, String)> {
        let mut state = self.state.lock();

        if let Some(reader) = state.reader.as_mut() {
            match Self::next_line(reader) {
                Some(line) => {
                    state.data_count += 1;
                    return Some((self.format.clone(), line));
                }
                None => self.finish_file(&mut state),
            }
        }

        // look for the next file to process
        match fileutil::first_file_with_extension(&self.input_dir, &self.format) {
            Some(path) => match File::open(&path) {
                Ok(file) => {
                    log::info!("fileinput: opened file {}", path.display());
                    state.reader = Some(BufReader::new(file));
                    state.file_name = Some(path);
                    state.file_start = Instant::now();
                    state.data_count = 0;
                }
                Err(e) => {
                    log::error!("fileinput: failed to open {}: {e}", path.display());
                }
            },
            None => {
                if self.shutdown_when_no_data && ctx.pending == 0 {
                    self.shutdown_countdown(ctx);
                }
            }
        }

        // next tick starts reading the newly opened file
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::worker::Worker;

    use super::*;

    const GPICK_LINE: &str = "228041013 22637648 1 BOZ BHZ US 00 20150303000044.175 P \
                              -1.0000 U  ? m 1.050 2.650 0.0 0.000000 3.49 0.000000 0.000000";

    fn fetcher_for(dir: &std::path::Path, extra: &str) -> FileFetcher {
        let config = Config::from_str(&format!(
            r#"{{"Cmd":"GlassInput","InputDirectory":"{}","Format":"gpick",
                "ShutdownWhenNoData":false{extra}}}"#,
            dir.display()
        ))
        .unwrap();
        FileFetcher::from_config(&config).unwrap()
    }

    fn test_ctx(pending: usize) -> FetchContext {
        FetchContext { pending, status: Worker::new("fileinput-test", 1).status() }
    }

    fn drain(fetcher: &FileFetcher, ctx: &FetchContext, ticks: usize) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..ticks {
            if let Some((_, line)) = fetcher.fetch_raw(ctx) {
                lines.push(line);
            }
        }
        lines
    }

    #[test]
    fn requires_input_directory() {
        let config = Config::from_str(r#"{"Cmd":"GlassInput","Format":"gpick"}"#).unwrap();
        assert!(matches!(
            FileFetcher::from_config(&config),
            Err(SetupError::MissingKey("InputDirectory"))
        ));
    }

    #[test]
    fn reads_lines_and_deletes_processed_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("picks.gpick");
        // gpick files carry interleaved timestamp lines; they are skipped
        std::fs::write(&file, format!("1425340828\n{GPICK_LINE}\n\n{GPICK_LINE}\n")).unwrap();

        let fetcher = fetcher_for(dir.path(), "");
        let ctx = test_ctx(0);
        let lines = drain(&fetcher, &ctx, 6);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], GPICK_LINE);
        // once drained the file is deleted
        assert!(!file.exists());
    }

    #[test]
    fn archives_processed_file_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let archive = tempfile::tempdir().unwrap();
        let file = dir.path().join("picks.gpick");
        std::fs::write(&file, format!("{GPICK_LINE}\n")).unwrap();

        let fetcher = fetcher_for(
            dir.path(),
            &format!(r#","ArchiveDirectory":"{}""#, archive.path().display()),
        );
        let ctx = test_ctx(0);
        let lines = drain(&fetcher, &ctx, 5);
        assert_eq!(lines.len(), 1);
        assert!(!file.exists());
        assert!(archive.path().join("picks.gpick").exists());
    }

    #[test]
    fn ignores_files_of_other_formats() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.json"), "{}\n").unwrap();

        let fetcher = fetcher_for(dir.path(), "");
        let ctx = test_ctx(0);
        assert!(drain(&fetcher, &ctx, 3).is_empty());
    }

    #[test]
    fn shutdown_countdown_stops_worker() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_str(&format!(
            r#"{{"Cmd":"GlassInput","InputDirectory":"{}","Format":"gpick",
                "ShutdownWhenNoData":true,"ShutdownWait":1}}"#,
            dir.path().display()
        ))
        .unwrap();
        let fetcher = Arc::new(FileFetcher::from_config(&config).unwrap());

        let worker = Worker::new("fileinput-shutdown-test", 1);
        let ctx = FetchContext { pending: 0, status: worker.status() };
        assert!(fetcher.fetch_raw(&ctx).is_none());
        assert_eq!(ctx.status.state(), WorkerState::Stopping);
    }
}
