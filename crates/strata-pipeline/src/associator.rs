//! The associator stage: bridges the input stage, the association engine,
//! and the output stage.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use strata_core::config::Config;
use strata_core::worker::{WorkResult, Worker};
use strata_core::Queue;

use crate::engine::{AssocEngine, AssociatorHandle, EngineMessage, EngineSink, OutputMessage};
use crate::input::RecordSource;
use crate::output::OutputSend;

/// Seconds between performance reports.
const DEFAULT_REPORT_INTERVAL_SECS: i64 = 60;

/// The associator's worker does real work per tick, so its watchdog is much
/// longer than the default.
const HEALTH_INTERVAL_SECS: i64 = 600;

struct Performance {
    interval_count: u64,
    total_count: u64,
    running_average_ticks: u64,
    running_dps_average: f64,
    engine_time: Duration,
    last_report: Instant,
}

/// The stage that owns the engine.
///
/// Each tick drains one control message (strict priority) and then hands the
/// engine exactly one record from the input stage, timing the dispatch.
/// Engine output arrives on [`EngineSink::send`] (possibly from
/// engine-internal threads) and is forwarded to the output stage; that path
/// never calls back into the engine.
pub struct Associator {
    engine: Arc<dyn AssocEngine>,
    input: Arc<dyn RecordSource>,
    output: Arc<dyn OutputSend>,
    message_queue: Queue<EngineMessage>,
    report_interval_secs: AtomicI64,
    performance: Mutex<Performance>,
    worker: Worker,
}

impl Associator {
    /// Builds the stage and wires the engine's send and log sinks to it.
    pub fn create(
        input: Arc<dyn RecordSource>,
        output: Arc<dyn OutputSend>,
        engine: Arc<dyn AssocEngine>,
    ) -> Arc<Self> {
        let associator = Arc::new(Self {
            engine,
            input,
            output,
            message_queue: Queue::new(),
            report_interval_secs: AtomicI64::new(DEFAULT_REPORT_INTERVAL_SECS),
            performance: Mutex::new(Performance {
                interval_count: 0,
                total_count: 0,
                running_average_ticks: 0,
                running_dps_average: 0.0,
                engine_time: Duration::ZERO,
                last_report: Instant::now(),
            }),
            worker: Worker::new("associator", 5),
        });
        associator.worker.set_health_interval_secs(HEALTH_INTERVAL_SECS);

        let sink: Arc<dyn EngineSink> = Arc::clone(&associator) as Arc<dyn EngineSink>;
        associator.engine.set_send_sink(sink);
        associator.engine.set_log_sink(Arc::new(|level, message| {
            log::log!(level, "engine: {message}");
        }));

        associator
    }

    /// Forwards a configuration snapshot to the engine. Multiple successive
    /// setups (initialize, station list, grid files) are expected; the
    /// engine is never torn down between them.
    pub fn setup(&self, config: &Config) {
        self.engine.dispatch(EngineMessage::Config(config.json().clone()));
        log::debug!("associator::setup: passed configuration to engine");
    }

    pub fn set_report_interval_secs(&self, interval: i64) {
        self.report_interval_secs.store(interval, Ordering::SeqCst);
    }

    pub fn start(self: &Arc<Self>) -> bool {
        let stage = Arc::clone(self);
        self.worker.start(move || stage.work())
    }

    pub fn stop(&self) -> bool {
        self.worker.stop()
    }

    pub fn is_started(&self) -> bool {
        self.worker.is_started()
    }

    /// Healthy iff the worker heartbeat is fresh and the engine reports
    /// itself alive.
    pub fn health_check(&self) -> bool {
        if !self.engine.status_check() {
            log::error!("associator::health_check: engine status check returned false");
            return false;
        }
        self.worker.health_check()
    }

    /// One tick: control traffic first, then one record into the engine.
    pub fn work(&self) -> WorkResult {
        // control messages (configuration, station lookups, retrieval
        // requests) have strict priority over data
        if let Some(message) = self.message_queue.pop() {
            self.engine.dispatch(message);
        }

        let Some(record) = self.input.pop_record() else {
            return WorkResult::Idle;
        };

        let dispatch_start = Instant::now();
        self.engine.dispatch(EngineMessage::Record(record));
        let dispatch_time = dispatch_start.elapsed();

        {
            let mut perf = self.performance.lock();
            perf.interval_count += 1;
            perf.engine_time += dispatch_time;
            let since_report = perf.last_report.elapsed().as_secs_f64();
            if since_report >= self.report_interval_secs.load(Ordering::SeqCst) as f64 {
                self.report(&mut perf, since_report);
            }
        }

        // only one record per tick, so control traffic stays responsive
        WorkResult::Ok
    }

    fn report(&self, perf: &mut Performance, since_report: f64) {
        if perf.interval_count == 0 {
            log::warn!(
                "associator::work: sent NO data to the engine in the last \
                 {since_report:.0} seconds"
            );
        } else {
            let pending = self.input.pending_count();
            perf.total_count += perf.interval_count;

            let dps = perf.interval_count as f64 / since_report;
            perf.running_average_ticks += 1;
            perf.running_dps_average = (perf.running_dps_average
                * (perf.running_average_ticks - 1) as f64
                + dps)
                / perf.running_average_ticks as f64;

            let average_engine_time =
                perf.engine_time.as_secs_f64() / perf.interval_count as f64;

            log::info!(
                "associator::work: sent {} data to the engine ({} in queue, {} total) in \
                 {since_report:.0} seconds ({dps:.3} dps) ({:.3} avg dps) \
                 ({average_engine_time:.6} avg engine time) (pick list: {} hypo list: {})",
                perf.interval_count,
                pending,
                perf.total_count,
                perf.running_dps_average,
                self.engine.pick_list_size(),
                self.engine.hypo_list_size(),
            );
        }

        perf.last_report = Instant::now();
        perf.interval_count = 0;
        perf.engine_time = Duration::ZERO;
    }
}

impl AssociatorHandle for Associator {
    /// Queues an out-of-band message for in-band delivery to the engine.
    fn send_to_associator(&self, message: EngineMessage) {
        self.message_queue.push(message);
    }
}

impl EngineSink for Associator {
    /// The engine's output callback. May run on an engine-internal thread;
    /// forwards to the output stage and never re-enters the engine.
    fn send(&self, message: OutputMessage) {
        // the callback also proves the stage is alive
        self.worker.status().set_thread_health();
        self.output.send(message);
    }
}
