//! The output stage: accept engine messages and route them to a sink.

use std::sync::Arc;

use parking_lot::RwLock;
use strata_core::worker::{WorkResult, Worker};
use strata_core::Queue;

use crate::engine::{AssociatorHandle, EngineMessage, OutputMessage};

/// The message types the output stage routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Detection,
    Retraction,
    StationInfoRequest,
    StationList,
}

impl OutputKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Detection" => Some(Self::Detection),
            "Retraction" => Some(Self::Retraction),
            "StationInfoRequest" => Some(Self::StationInfoRequest),
            "StationList" => Some(Self::StationList),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Detection => "Detection",
            Self::Retraction => "Retraction",
            Self::StationInfoRequest => "StationInfoRequest",
            Self::StationList => "StationList",
        }
    }
}

/// The sink capability: deliver one routed message.
pub trait SendOutput: Send + Sync {
    fn send_output(&self, kind: OutputKind, id: &str, body: &str);
}

/// What the engine callback path sees of the output stage. `send` must be
/// callable from engine-internal threads.
pub trait OutputSend: Send + Sync {
    fn send(&self, message: OutputMessage);
}

/// The sink-agnostic output stage.
///
/// `send` enqueues from any thread; the stage worker drains the queue and
/// routes known message kinds to the concrete adapter. Unknown kinds are
/// dropped with a warning. The associator back-reference is observer-only,
/// for station lookups; it must be set after both stages exist and before
/// the workers start.
pub struct Output {
    queue: Queue<OutputMessage>,
    associator: RwLock<Option<Arc<dyn AssociatorHandle>>>,
    worker: Worker,
}

impl Output {
    pub fn new() -> Self {
        Self {
            queue: Queue::new(),
            associator: RwLock::new(None),
            worker: Worker::new("output", 100),
        }
    }

    /// Registers the associator back-reference used for station lookups.
    pub fn set_associator(&self, associator: Arc<dyn AssociatorHandle>) {
        *self.associator.write() = Some(associator);
    }

    /// Forwards an out-of-band request to the associator, if wired.
    pub fn request_from_associator(&self, message: EngineMessage) -> bool {
        match self.associator.read().as_ref() {
            Some(associator) => {
                associator.send_to_associator(message);
                true
            }
            None => {
                log::warn!("output: no associator wired for requests");
                false
            }
        }
    }

    /// Starts the stage worker against a concrete sink.
    pub fn start(self: &Arc<Self>, sink: Arc<dyn SendOutput>) -> bool {
        let stage = Arc::clone(self);
        self.worker.start(move || stage.work(sink.as_ref()))
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

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }

    /// One tick: route the next queued message.
    pub fn work(&self, sink: &dyn SendOutput) -> WorkResult {
        let Some(message) = self.queue.pop() else {
            return WorkResult::Idle;
        };

        match OutputKind::from_name(&message.kind) {
            Some(kind) => {
                log::debug!("output::work: routing {} message {}", message.kind, message.id);
                sink.send_output(kind, &message.id, &message.body);
            }
            None => {
                log::warn!(
                    "output::work: dropping message {} with unsupported type {}",
                    message.id,
                    message.kind
                );
            }
        }
        WorkResult::Ok
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSend for Output {
    fn send(&self, message: OutputMessage) {
        self.queue.push(message);
    }
}
