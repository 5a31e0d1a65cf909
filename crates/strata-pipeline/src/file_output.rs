//! File output adapter.
//!
//! Writes detections and retractions as one file per message into a
//! configured directory. Delivery is best-effort: a failed open is retried
//! once after a short pause, and write errors are logged and swallowed.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use strata_core::config::{Config, KIND_GLASS_OUTPUT};
use strata_core::time::now_epoch;

use crate::error::{check_kind, SetupError};
use crate::output::{OutputKind, SendOutput};

const DETECTION_EXTENSION: &str = "jsondetect";
const RETRACTION_EXTENSION: &str = "jsonrtct";

/// Pause before the single open retry.
const OPEN_RETRY_PAUSE: Duration = Duration::from_millis(100);

/// A [`SendOutput`] sink writing each message to
/// `<dir>/[<epoch>_]<id>.<ext>`.
pub struct FileWriter {
    output_dir: PathBuf,
    timestamp_file_name: bool,
}

impl FileWriter {
    /// Builds the adapter from a `GlassOutput` configuration.
    pub fn from_config(config: &Config) -> Result<Self, SetupError> {
        check_kind(config, KIND_GLASS_OUTPUT)?;

        let output_dir = config
            .get_str("OutputDirectory")
            .ok_or(SetupError::MissingKey("OutputDirectory"))?
            .to_string();

        if let Some(format) = config.get_str("OutputFormat") {
            if format != "json" {
                log::warn!("fileoutput::setup: only json output is supported, got {format}");
            }
        }

        let timestamp_file_name = config.get_bool("TimeStampFileName").unwrap_or(true);

        log::info!(
            "fileoutput::setup: using output directory {output_dir}, \
             timestamped file names {timestamp_file_name}"
        );

        Ok(Self { output_dir: PathBuf::from(output_dir), timestamp_file_name })
    }

    pub fn new(output_dir: &std::path::Path, timestamp_file_name: bool) -> Self {
        Self { output_dir: output_dir.to_path_buf(), timestamp_file_name }
    }

    fn file_name(&self, id: &str, extension: &str) -> PathBuf {
        if self.timestamp_file_name {
            self.output_dir.join(format!("{}_{id}.{extension}", now_epoch() as i64))
        } else {
            self.output_dir.join(format!("{id}.{extension}"))
        }
    }

    fn open_with_retry(&self, path: &std::path::Path) -> Option<std::fs::File> {
        match std::fs::File::create(path) {
            Ok(file) => Some(file),
            Err(_) => {
                std::thread::sleep(OPEN_RETRY_PAUSE);
                match std::fs::File::create(path) {
                    Ok(file) => {
                        log::debug!("fileoutput: created file {} on second try", path.display());
                        Some(file)
                    }
                    Err(e) => {
                        log::error!(
                            "fileoutput: failed to create file {} on second try: {e}",
                            path.display()
                        );
                        None
                    }
                }
            }
        }
    }
}

impl SendOutput for FileWriter {
    fn send_output(&self, kind: OutputKind, id: &str, body: &str) {
        let extension = match kind {
            OutputKind::Detection => DETECTION_EXTENSION,
            OutputKind::Retraction => RETRACTION_EXTENSION,
            // station traffic has no file representation
            OutputKind::StationInfoRequest | OutputKind::StationList => return,
        };

        if id.is_empty() || body.is_empty() {
            log::error!("fileoutput: empty id or message passed in");
            return;
        }

        let path = self.file_name(id, extension);
        log::info!("fileoutput: writing a {} message with id {id}", kind.name());

        let Some(mut file) = self.open_with_retry(&path) else {
            return;
        };
        if let Err(e) = file.write_all(body.as_bytes()) {
            log::error!("fileoutput: problem writing data to disk: {e}");
            log::error!("fileoutput: problem data: {body}");
        }
    }
}
