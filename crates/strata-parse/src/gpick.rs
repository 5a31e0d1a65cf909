//! Global pick format parser.
//!
//! Global picks are space-delimited lines like:
//!
//! ```text
//! 228041013 22637620 1 GLI BHZ AK -- 20150302235859.307 P -1.0000 U  ? r 1.050 2.650 0.0 0.000000 5.00 0.000000 0.000000
//! ```
//!
//! Field layout: author/logo, pick id, version, station, channel, network,
//! location, arrival time (`YYYYMMDDHHMMSS.sss`), phase, error half-width,
//! polarity, onset, picker type, high-pass Hz, low-pass Hz, back azimuth,
//! slowness, SNR, amplitude, period. The back azimuth, slowness, version and
//! error half-width fields are carried by the format but not by the record.

use strata_core::record::{Amplitude, Filter, Onset, Pick, Picker, Polarity};
use strata_core::time::date_time_to_epoch;
use strata_core::{Record, Site, Source};

use crate::Parser;

const MIN_FIELDS: usize = 20;

pub struct GPickParser {
    default_agency_id: String,
    default_author: String,
}

impl GPickParser {
    pub fn new(default_agency_id: &str, default_author: &str) -> Self {
        Self {
            default_agency_id: default_agency_id.to_string(),
            default_author: default_author.to_string(),
        }
    }

    pub fn default_author(&self) -> &str {
        &self.default_author
    }
}

/// An optional measurement group is real data only if every sub-field is
/// numeric and the group is not all zeros.
fn group_value(fields: &[&str]) -> Option<Vec<f64>> {
    let values: Option<Vec<f64>> = fields.iter().map(|f| f.parse::<f64>().ok()).collect();
    let values = values?;
    if values.iter().all(|v| *v == 0.0) {
        return None;
    }
    Some(values)
}

impl Parser for GPickParser {
    fn parse(&self, input: &str) -> Option<Record> {
        if input.is_empty() {
            return None;
        }
        log::trace!("gpickparser: input string: {input}");

        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            log::warn!(
                "gpickparser: input did not split into at least the {MIN_FIELDS} elements \
                 needed for a global pick (split into {}), returning",
                fields.len()
            );
            return None;
        }

        // bad time strings are already logged by the converter
        let time = date_time_to_epoch(fields[7])?;

        let polarity = match fields[10] {
            "U" => Some(Polarity::Up),
            "D" => Some(Polarity::Down),
            _ => None,
        };
        let onset = match fields[11] {
            "i" => Some(Onset::Impulsive),
            "e" => Some(Onset::Emergent),
            "q" => Some(Onset::Questionable),
            _ => None,
        };
        let picker = match fields[12] {
            "m" => Some(Picker::Manual),
            "r" => Some(Picker::Raypicker),
            "l" => Some(Picker::Filterpicker),
            "e" => Some(Picker::Earthworm),
            "U" => Some(Picker::Other),
            _ => None,
        };

        let filter = group_value(&[fields[13], fields[14]])
            .map(|v| Filter { high_pass: v[0], low_pass: v[1] });
        if filter.is_none() {
            log::debug!("gpickparser: no usable filter group");
        }

        // the zero-test covers amplitude and period only; SNR is a separate
        // measurement and rides along when the group is kept
        let amplitude = match (group_value(&[fields[18], fields[19]]), fields[17].parse::<f64>())
        {
            (Some(v), Ok(snr)) => Some(Amplitude { amplitude: v[0], period: v[1], snr }),
            _ => None,
        };

        Some(Record::Pick(Pick {
            id: fields[1].to_string(),
            site: Site::new(fields[5], fields[3], fields[4], fields[6]),
            source: Source::new(&self.default_agency_id, fields[0]),
            time,
            phase: Some(fields[8].to_string()),
            polarity,
            onset,
            picker,
            filter,
            amplitude,
            classification: None,
        }))
    }
}
