//! The input stage: retrieve raw messages, classify, parse, validate, and
//! enqueue canonical records for the associator.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::config::{Config, KIND_GLASS_INPUT};
use strata_core::worker::{WorkResult, Worker, WorkerStatus};
use strata_core::{Queue, Record};
use strata_parse::{CCParser, GPickParser, JsonParser, Parser, SimplePickParser};

use crate::error::{check_kind, SetupError};

/// Type tag for global pick messages.
pub const GPICK_TYPE: &str = "gpick";
/// Alternate type tag for global pick messages.
pub const GPICKS_TYPE: &str = "gpicks";
/// Type tag for detection-format JSON messages.
pub const JSON_TYPE: &str = "json";
/// Type tag for cross-correlation messages.
pub const CC_TYPE: &str = "dat";
/// Type tag for simple pick messages.
pub const SIMPLE_TYPE: &str = "txt";

/// Context handed to a fetcher each tick: how much data is already pending,
/// and the worker status block for heart-beating long inner steps or
/// requesting a stage shutdown.
pub struct FetchContext {
    pub pending: usize,
    pub status: Arc<WorkerStatus>,
}

/// The source capability: produce the next raw message and its type tag.
///
/// Returning `None` means no data is available right now; the stage goes
/// idle and polls again after its sleep.
pub trait RawFetch: Send + Sync {
    fn fetch_raw(&self, ctx: &FetchContext) -> Option<(String, String)>;
}

struct ParserSet {
    gpick: GPickParser,
    json: JsonParser,
    cc: CCParser,
    simple: SimplePickParser,
}

/// The source-agnostic input stage.
///
/// Owns the parser set, the bounded hand-off queue, and the worker loop;
/// the concrete source plugs in as a [`RawFetch`] at start. When the queue
/// is at its configured maximum the stage idles instead of fetching, which
/// propagates back-pressure to the source.
pub struct Input {
    parsers: RwLock<Option<ParserSet>>,
    queue: Queue<Record>,
    queue_max_size: AtomicI64,
    default_agency_id: RwLock<String>,
    default_author: RwLock<String>,
    worker: Worker,
}

impl Input {
    pub fn new() -> Self {
        Self {
            parsers: RwLock::new(None),
            queue: Queue::new(),
            queue_max_size: AtomicI64::new(-1),
            default_agency_id: RwLock::new(String::new()),
            default_author: RwLock::new(String::new()),
            worker: Worker::new("input", 1),
        }
    }

    /// Configures the stage from a `GlassInput` configuration.
    pub fn setup(&self, config: &Config) -> Result<(), SetupError> {
        check_kind(config, KIND_GLASS_INPUT)?;

        let agency = match config.get_str("DefaultAgencyID") {
            Some(agency) => agency.to_string(),
            None => {
                log::info!("input::setup: defaulting to US as AgencyID");
                "US".to_string()
            }
        };
        let author = match config.get_str("DefaultAuthor") {
            Some(author) => author.to_string(),
            None => {
                log::info!("input::setup: defaulting to glassConverter as Author");
                "glassConverter".to_string()
            }
        };
        let max_size = match config.get_i64("QueueMaxSize") {
            Some(size) => size,
            None => {
                log::info!("input::setup: defaulting to -1 for QueueMaxSize (unbounded)");
                -1
            }
        };

        log::info!(
            "input::setup: using AgencyID {agency}, Author {author}, QueueMaxSize {max_size}"
        );

        *self.parsers.write() = Some(ParserSet {
            gpick: GPickParser::new(&agency, &author),
            json: JsonParser::new(&agency, &author),
            cc: CCParser::new(&agency, &author),
            simple: SimplePickParser::new(&agency, &author),
        });
        *self.default_agency_id.write() = agency;
        *self.default_author.write() = author;
        self.queue_max_size.store(max_size, Ordering::SeqCst);
        Ok(())
    }

    pub fn default_agency_id(&self) -> String {
        self.default_agency_id.read().clone()
    }

    pub fn default_author(&self) -> String {
        self.default_author.read().clone()
    }

    pub fn queue_max_size(&self) -> i64 {
        self.queue_max_size.load(Ordering::SeqCst)
    }

    /// Starts the stage worker against a concrete source.
    pub fn start(self: &Arc<Self>, fetcher: Arc<dyn RawFetch>) -> bool {
        let stage = Arc::clone(self);
        self.worker.start(move || stage.work(fetcher.as_ref()))
    }

    pub fn stop(&self) -> bool {
        self.worker.stop()
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_started()
    }

    pub fn health_check(&self) -> bool {
        self.worker.health_check()
    }

    pub fn worker(&self) -> &Worker {
        &self.worker
    }

    /// One tick: honor back-pressure, fetch, classify, parse, validate,
    /// enqueue.
    pub fn work(&self, fetcher: &dyn RawFetch) -> WorkResult {
        let max_size = self.queue_max_size.load(Ordering::SeqCst);
        if max_size >= 0 && self.queue.len() as i64 >= max_size {
            // no room; let the source back up
            return WorkResult::Idle;
        }

        let ctx = FetchContext { pending: self.queue.len(), status: self.worker.status() };
        let Some((type_tag, message)) = fetcher.fetch_raw(&ctx) else {
            return WorkResult::Idle;
        };
        if message.is_empty() {
            return WorkResult::Idle;
        }

        log::trace!("input::work: got message: {message}");

        let guard = self.parsers.read();
        let Some(parsers) = guard.as_ref() else {
            log::error!("input::work: stage used before setup");
            return WorkResult::Error;
        };

        let parser: &dyn Parser = if type_tag == GPICK_TYPE || type_tag == GPICKS_TYPE {
            &parsers.gpick
        } else if type_tag.contains(JSON_TYPE) {
            &parsers.json
        } else if type_tag == CC_TYPE {
            &parsers.cc
        } else if type_tag == SIMPLE_TYPE {
            &parsers.simple
        } else {
            log::debug!("input::work: discarding message with unknown type {type_tag}");
            return WorkResult::Ok;
        };

        let Some(record) = parser.parse(&message) else {
            // parse failures are logged by the parser
            return WorkResult::Ok;
        };
        if !parser.validate(&record) {
            log::info!("input::work: dropping invalid {} record", record.kind());
            return WorkResult::Ok;
        }

        self.queue.push(record);
        WorkResult::Ok
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new()
    }
}

/// What the associator sees of the input stage.
pub trait RecordSource: Send + Sync {
    /// Takes the next pending record, transferring ownership.
    fn pop_record(&self) -> Option<Record>;

    /// Count of records waiting in the hand-off queue.
    fn pending_count(&self) -> usize;
}

impl RecordSource for Input {
    fn pop_record(&self) -> Option<Record> {
        self.queue.pop()
    }

    fn pending_count(&self) -> usize {
        self.queue.len()
    }
}
