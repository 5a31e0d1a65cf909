//! Pipeline stages of the strata associator.
//!
//! Three supervised stages move records from a source to the association
//! engine and its detections out to sinks:
//!
//! ```text
//!  [source] -> Input -> InputQueue -> Associator -> engine
//!                                        |            |
//!                      MessageQueue -----+            +-> Output -> [sink]
//! ```
//!
//! Concrete sources and sinks plug in behind small capability traits
//! ([`input::RawFetch`], [`output::SendOutput`], [`broker_input::BrokerConsumer`]);
//! the engine plugs in behind [`engine::AssocEngine`].

pub mod associator;
pub mod broker_input;
pub mod engine;
pub mod error;
pub mod file_input;
pub mod file_output;
pub mod input;
pub mod output;
pub mod stream_input;

pub use associator::Associator;
pub use engine::{AssocEngine, EngineMessage, EngineSink, OutputMessage};
pub use error::SetupError;
pub use input::Input;
pub use output::Output;
