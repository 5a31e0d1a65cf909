//! Wire-format parsers.
//!
//! Each parser turns one line of a producer's wire format into a canonical
//! [`Record`](strata_core::Record). Parsers are configured with a default
//! agency/author pair used when the format carries no source attribution.
//!
//! Failure policy: a malformed line (bad field count, non-numeric required
//! field, bad time string) logs at warn and yields `None`; a well-formed
//! line that fails validation is dropped without a warning.

use strata_core::Record;

pub mod cc;
pub mod gpick;
pub mod json;
pub mod simple;

pub use cc::CCParser;
pub use gpick::GPickParser;
pub use json::JsonParser;
pub use simple::SimplePickParser;

/// The parsing capability: wire line in, canonical record out.
pub trait Parser: Send + Sync {
    /// Parses one message. `None` means the message was malformed (already
    /// logged) and should be dropped.
    fn parse(&self, input: &str) -> Option<Record>;

    /// Validates a parsed record. The default defers to the record's own
    /// per-kind required-field check.
    fn validate(&self, record: &Record) -> bool {
        record.is_valid()
    }
}
