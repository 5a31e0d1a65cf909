//! Simple pick format parser.
//!
//! Simple picks are whitespace-delimited lines like:
//!
//! ```text
//! 57647 AK GLI BHZ -- 1568999913.12 P
//! ```
//!
//! Field layout: pick id, network, station, channel, location, arrival time
//! (decimal epoch seconds), optional phase. The format carries no source
//! attribution, so the configured defaults are used. When the phase is
//! present it is treated as a classification with probability 1.0.

use strata_core::record::{Classification, Pick};
use strata_core::{Record, Site, Source};

use crate::Parser;

const MIN_FIELDS: usize = 6;

pub struct SimplePickParser {
    default_agency_id: String,
    default_author: String,
}

impl SimplePickParser {
    pub fn new(default_agency_id: &str, default_author: &str) -> Self {
        Self {
            default_agency_id: default_agency_id.to_string(),
            default_author: default_author.to_string(),
        }
    }
}

impl Parser for SimplePickParser {
    fn parse(&self, input: &str) -> Option<Record> {
        if input.is_empty() {
            return None;
        }
        log::trace!("simplepickparser: input string: {input}");

        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            log::warn!(
                "simplepickparser: input did not split into at least the {MIN_FIELDS} \
                 elements needed for a simple pick (split into {}), returning",
                fields.len()
            );
            return None;
        }

        let time: f64 = match fields[5].parse() {
            Ok(time) => time,
            Err(_) => {
                log::warn!("simplepickparser: problem converting arrival time {}", fields[5]);
                return None;
            }
        };

        let (phase, classification) = if fields.len() > MIN_FIELDS {
            (
                Some(fields[6].to_string()),
                Some(Classification {
                    phase: Some(fields[6].to_string()),
                    phase_probability: Some(1.0),
                }),
            )
        } else {
            (None, None)
        };

        Some(Record::Pick(Pick {
            id: fields[0].to_string(),
            site: Site::new(fields[1], fields[2], fields[3], fields[4]),
            source: Source::new(&self.default_agency_id, &self.default_author),
            time,
            phase,
            polarity: None,
            onset: None,
            picker: None,
            filter: None,
            amplitude: None,
            classification,
        }))
    }
}
