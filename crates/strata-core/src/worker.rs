//! Supervised cooperative worker loop.
//!
//! Each pipeline stage owns one [`Worker`]: a named OS thread repeatedly
//! invoking a tick function. Cancellation is cooperative (an atomic state
//! flag checked between ticks), and liveness is observable through a
//! heartbeat the supervisor polls with [`Worker::health_check`].

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;

use crate::time::now_epoch;

/// Default cooperative sleep between idle ticks, milliseconds.
pub const DEFAULT_SLEEP_TIME_MS: u64 = 100;

/// Default heartbeat staleness threshold, seconds.
pub const DEFAULT_HEALTH_INTERVAL_SECS: i64 = 30;

/// How many sleep quanta `stop` waits for the thread to observe Stopping.
const STOP_GRACE_QUANTA: u64 = 5;

/// Lifecycle state of a worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum WorkerState {
    Initialized = 0,
    Starting = 1,
    Started = 2,
    Stopping = -1,
    Stopped = -2,
}

impl WorkerState {
    fn from_i32(value: i32) -> WorkerState {
        match value {
            1 => WorkerState::Starting,
            2 => WorkerState::Started,
            -1 => WorkerState::Stopping,
            -2 => WorkerState::Stopped,
            _ => WorkerState::Initialized,
        }
    }
}

/// Outcome of one tick of a worker's work function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkResult {
    /// There was no work to perform.
    Idle,
    /// Work was completed successfully.
    Ok,
    /// There was an error performing the work.
    Error,
}

/// Shared status block, visible to the supervisor and to tick closures that
/// need to heartbeat inside long-running inner steps.
pub struct WorkerStatus {
    state: AtomicI32,
    last_heartbeat: AtomicI64,
    sleep_time_ms: AtomicU64,
    health_interval_secs: AtomicI64,
    continue_on_error: AtomicBool,
}

impl WorkerStatus {
    fn new(sleep_time_ms: u64) -> Self {
        Self {
            state: AtomicI32::new(WorkerState::Initialized as i32),
            last_heartbeat: AtomicI64::new(now_epoch() as i64),
            sleep_time_ms: AtomicU64::new(sleep_time_ms),
            health_interval_secs: AtomicI64::new(DEFAULT_HEALTH_INTERVAL_SECS),
            continue_on_error: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_i32(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: WorkerState) {
        self.state.store(state as i32, Ordering::SeqCst);
    }

    /// Records that the worker is still alive. Called automatically at the
    /// top of every tick; call explicitly before long inner steps.
    pub fn set_thread_health(&self) {
        self.last_heartbeat.store(now_epoch() as i64, Ordering::SeqCst);
    }

    pub fn sleep_time_ms(&self) -> u64 {
        self.sleep_time_ms.load(Ordering::SeqCst)
    }
}

/// A supervised worker driving a `FnMut() -> WorkResult` tick on its own
/// OS thread.
///
/// Loop contract: `Ok` re-invokes immediately, `Idle` sleeps `sleep_time_ms`
/// first, `Error` transitions the worker to Stopping (unless configured to
/// continue, as the thread pool does for job failures). The state flag is
/// checked between invocations, so `stop` takes effect within roughly one
/// sleep quantum.
pub struct Worker {
    name: String,
    status: Arc<WorkerStatus>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Worker {
    pub fn new(name: &str, sleep_time_ms: u64) -> Self {
        Self {
            name: name.to_string(),
            status: Arc::new(WorkerStatus::new(sleep_time_ms)),
            handle: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The shared status block, for tick closures that heartbeat or request
    /// a stop from inside the work function.
    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    pub fn state(&self) -> WorkerState {
        self.status.state()
    }

    pub fn sleep_time_ms(&self) -> u64 {
        self.status.sleep_time_ms.load(Ordering::SeqCst)
    }

    pub fn set_sleep_time_ms(&self, sleep_time_ms: u64) {
        self.status.sleep_time_ms.store(sleep_time_ms, Ordering::SeqCst);
    }

    pub fn health_interval_secs(&self) -> i64 {
        self.status.health_interval_secs.load(Ordering::SeqCst)
    }

    /// Sets the heartbeat staleness threshold; negative disables checks.
    pub fn set_health_interval_secs(&self, interval: i64) {
        self.status.health_interval_secs.store(interval, Ordering::SeqCst);
    }

    /// On a tick returning `Error`, keep the loop alive (re-transitioning
    /// through Starting) instead of shutting the worker down.
    pub fn set_continue_on_error(&self, continue_on_error: bool) {
        self.status.continue_on_error.store(continue_on_error, Ordering::SeqCst);
    }

    /// Starts (or restarts) the worker thread. Idempotent: returns false if
    /// the worker is already Starting or Started.
    pub fn start<F>(&self, mut tick: F) -> bool
    where
        F: FnMut() -> WorkResult + Send + 'static,
    {
        {
            let state = self.status.state();
            if state == WorkerState::Starting || state == WorkerState::Started {
                log::warn!("worker {}: start() called while already running", self.name);
                return false;
            }
        }

        // join any previous incarnation before respawning
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }

        self.status.set_state(WorkerState::Starting);
        self.status.set_thread_health();

        let status = Arc::clone(&self.status);
        let name = self.name.clone();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || {
                log::debug!("worker {name}: thread started");
                status.set_state(WorkerState::Started);

                loop {
                    if status.state() == WorkerState::Stopping {
                        break;
                    }

                    status.set_thread_health();

                    match tick() {
                        WorkResult::Ok => {}
                        WorkResult::Idle => {
                            std::thread::sleep(Duration::from_millis(status.sleep_time_ms()));
                        }
                        WorkResult::Error => {
                            if status.continue_on_error.load(Ordering::SeqCst) {
                                log::error!(
                                    "worker {name}: work() returned error; restarting tick loop"
                                );
                                // do not clobber a concurrent stop request
                                if status.state() != WorkerState::Stopping {
                                    status.set_state(WorkerState::Starting);
                                    status.set_state(WorkerState::Started);
                                }
                            } else {
                                log::error!("worker {name}: work() returned error; stopping");
                                status.set_state(WorkerState::Stopping);
                            }
                        }
                    }
                }

                status.set_state(WorkerState::Stopped);
                log::debug!("worker {name}: thread exited");
            });

        match handle {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                true
            }
            Err(e) => {
                log::error!("worker {}: failed to spawn thread: {e}", self.name);
                self.status.set_state(WorkerState::Initialized);
                false
            }
        }
    }

    /// Signals the worker to stop and waits up to a bounded grace interval
    /// for it to reach Stopped. Returns true if the thread was joined.
    pub fn stop(&self) -> bool {
        match self.status.state() {
            WorkerState::Starting | WorkerState::Started | WorkerState::Stopping => {
                self.status.set_state(WorkerState::Stopping);
            }
            WorkerState::Initialized | WorkerState::Stopped => {
                // nothing running; make sure any finished thread is joined
                if let Some(handle) = self.handle.lock().take() {
                    let _ = handle.join();
                }
                return true;
            }
        }

        let quantum = Duration::from_millis(self.sleep_time_ms().max(1));
        for _ in 0..=STOP_GRACE_QUANTA {
            if self.status.state() == WorkerState::Stopped {
                break;
            }
            std::thread::sleep(quantum);
        }

        if self.status.state() == WorkerState::Stopped {
            if let Some(handle) = self.handle.lock().take() {
                let _ = handle.join();
            }
            true
        } else {
            log::warn!("worker {}: did not stop within grace interval", self.name);
            false
        }
    }

    /// True while the worker thread is Starting or Started.
    pub fn is_started(&self) -> bool {
        matches!(self.status.state(), WorkerState::Starting | WorkerState::Started)
    }

    /// True once the worker loop is actually running.
    pub fn is_running(&self) -> bool {
        self.status.state() == WorkerState::Started
    }

    /// True iff the heartbeat is younger than the configured interval.
    /// A negative interval disables the check.
    pub fn health_check(&self) -> bool {
        let interval = self.health_interval_secs();
        if interval < 0 {
            return true;
        }
        let last = self.status.last_heartbeat.load(Ordering::SeqCst);
        let age = now_epoch() as i64 - last;
        if age > interval {
            log::error!(
                "worker {}: no heartbeat in {age} seconds (limit {interval})",
                self.name
            );
            return false;
        }
        true
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}
