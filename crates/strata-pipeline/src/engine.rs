//! The integration surface between the pipeline and the association engine.
//!
//! The engine's nucleation algebra (grid search, hypocenter optimization,
//! travel-time tables) is a collaborator behind [`AssocEngine`]; the
//! pipeline only depends on this dispatch/status/callback contract.

use std::sync::Arc;

use serde_json::Value;
use strata_core::Record;

/// A message dispatched into the engine.
#[derive(Debug, Clone)]
pub enum EngineMessage {
    /// A configuration snapshot (initialize block, station list, grid file).
    Config(Value),
    /// A canonical detection record (pick, correlation, detection,
    /// station info).
    Record(Record),
    /// An out-of-band request (station lookups, retrieval requests).
    Request(Value),
}

/// A message emitted by the engine toward the output stage.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputMessage {
    /// Message type name: `Detection`, `Retraction`, `StationInfoRequest`,
    /// `StationList`, or anything else (dropped with a warning downstream).
    pub kind: String,
    pub id: String,
    /// Serialized message body, routed opaquely.
    pub body: String,
}

impl OutputMessage {
    pub fn new(kind: &str, id: &str, body: String) -> Self {
        Self { kind: kind.to_string(), id: id.to_string(), body }
    }
}

/// Where the engine sends its output messages.
///
/// Implementations must be callable from engine-internal threads and must
/// not call back into the engine.
pub trait EngineSink: Send + Sync {
    fn send(&self, message: OutputMessage);
}

/// The association engine contract.
///
/// `dispatch` must be safe to call from the associator worker; it may block
/// briefly but not for seconds (a slow engine throttles the whole pipeline,
/// which is the intended back-pressure). `status_check` and the list sizes
/// are cheap monitoring probes.
pub trait AssocEngine: Send + Sync {
    fn dispatch(&self, message: EngineMessage);

    fn status_check(&self) -> bool;

    fn pick_list_size(&self) -> usize;

    fn hypo_list_size(&self) -> usize;

    /// Registers the callback for engine output. Must be called before
    /// data flows.
    fn set_send_sink(&self, sink: Arc<dyn EngineSink>);

    /// Registers the callback for engine-internal diagnostics.
    fn set_log_sink(&self, sink: Arc<dyn Fn(log::Level, String) + Send + Sync>);
}

/// Handle for sending out-of-band messages to the associator stage, used by
/// controllers and by the output stage's station-lookup back-reference.
pub trait AssociatorHandle: Send + Sync {
    fn send_to_associator(&self, message: EngineMessage);
}
