//! A fixed-size pool of supervised workers consuming a shared job queue.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};

use crate::worker::{WorkResult, Worker, DEFAULT_SLEEP_TIME_MS};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Thread pool built on the supervised [`Worker`] loop.
///
/// Jobs are nullary closures submitted FIFO onto a shared channel; each
/// worker pops one job per tick. A panicking job is caught and logged and
/// costs that worker one Error tick, after which it re-enters the loop;
/// jobs submitted later still run.
pub struct ThreadPool {
    name: String,
    job_tx: Sender<Job>,
    job_rx: Receiver<Job>,
    workers: Vec<Worker>,
}

impl ThreadPool {
    /// Creates a pool with `num_threads` workers, started immediately.
    pub fn new(name: &str, num_threads: usize, sleep_time_ms: Option<u64>) -> Self {
        let (job_tx, job_rx) = unbounded::<Job>();
        let sleep_time_ms = sleep_time_ms.unwrap_or(DEFAULT_SLEEP_TIME_MS);

        let mut workers = Vec::with_capacity(num_threads);
        for index in 0..num_threads {
            let worker = Worker::new(&format!("{name}-{index}"), sleep_time_ms);
            worker.set_continue_on_error(true);

            let rx = job_rx.clone();
            let worker_name = worker.name().to_string();
            worker.start(move || match rx.try_recv() {
                Ok(job) => {
                    log::debug!("thread pool {worker_name}: found job");
                    if catch_unwind(AssertUnwindSafe(job)).is_err() {
                        log::error!("thread pool {worker_name}: job panicked");
                        return WorkResult::Error;
                    }
                    WorkResult::Ok
                }
                Err(TryRecvError::Empty) => WorkResult::Idle,
                Err(TryRecvError::Disconnected) => WorkResult::Error,
            });
            workers.push(worker);
        }

        Self { name: name.to_string(), job_tx, job_rx, workers }
    }

    /// Enqueues a job for the pool.
    pub fn submit<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.job_tx.send(Box::new(job)).is_err() {
            log::warn!("thread pool {}: failed to enqueue job", self.name);
        }
    }

    /// Count of jobs waiting to be picked up.
    pub fn job_queue_len(&self) -> usize {
        self.job_rx.len()
    }

    pub fn num_threads(&self) -> usize {
        self.workers.len()
    }

    /// True iff every worker's heartbeat is fresh.
    pub fn health_check(&self) -> bool {
        self.workers.iter().all(Worker::health_check)
    }

    /// Stops every worker. Returns true if all stopped within grace.
    pub fn stop(&self) -> bool {
        let mut all_stopped = true;
        for worker in &self.workers {
            all_stopped &= worker.stop();
        }
        all_stopped
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
    }
}
