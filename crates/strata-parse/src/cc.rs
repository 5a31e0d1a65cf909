//! Cross-correlation pick format parser.
//!
//! Correlation messages are space-delimited lines like:
//!
//! ```text
//! 2015/03/23 07:36:32.880 36.769 -98.019 5.0 2.6136482 mblg GS OK032 HHZ 00 P 2015/03/23 07:36:36.100 0.6581729 0.65
//! ```
//!
//! Field layout: origin date, origin time, latitude, longitude, depth,
//! magnitude, magnitude type, network, station, channel, location, phase,
//! arrival date, arrival time, correlation value. A trailing field may be
//! present and is ignored.

use strata_core::record::{Correlation, Hypocenter};
use strata_core::time::date_time_to_epoch;
use strata_core::{Record, Site, Source};

use crate::Parser;

const MIN_FIELDS: usize = 15;

pub struct CCParser {
    default_agency_id: String,
    default_author: String,
}

impl CCParser {
    pub fn new(default_agency_id: &str, default_author: &str) -> Self {
        Self {
            default_agency_id: default_agency_id.to_string(),
            default_author: default_author.to_string(),
        }
    }
}

fn strip(value: &str, remove: &[char]) -> String {
    value.chars().filter(|c| !remove.contains(c)).collect()
}

impl Parser for CCParser {
    fn parse(&self, input: &str) -> Option<Record> {
        if input.is_empty() {
            return None;
        }
        log::trace!("ccparser: input string: {input}");

        let fields: Vec<&str> = input.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            log::warn!(
                "ccparser: correlation did not split into at least {MIN_FIELDS} elements \
                 (split into {}), returning",
                fields.len()
            );
            return None;
        }

        let arrival_date = strip(fields[12], &['/']);
        let arrival_time = strip(fields[13], &[':']);

        // The pick id is derived from the detection type, SCNL, and arrival
        // time with no separators. Station codes that differ only at field
        // boundaries can collide; this matches the producing system.
        let id = format!(
            "CC{}{}{}{}{}{}",
            fields[8],
            fields[9],
            fields[7],
            fields[10],
            arrival_date,
            strip(&arrival_time, &['.'])
        );

        let time = date_time_to_epoch(&format!("{arrival_date}{arrival_time}"))?;
        let origin_time = date_time_to_epoch(&format!(
            "{}{}",
            strip(fields[0], &['/']),
            strip(fields[1], &[':'])
        ))?;

        let parse_f64 = |index: usize, name: &str| -> Option<f64> {
            match fields[index].parse::<f64>() {
                Ok(value) => Some(value),
                Err(_) => {
                    log::warn!("ccparser: problem converting {name} value {}", fields[index]);
                    None
                }
            }
        };

        let latitude = parse_f64(2, "latitude")?;
        let longitude = parse_f64(3, "longitude")?;
        let depth = parse_f64(4, "depth")?;
        let magnitude = parse_f64(5, "magnitude")?;
        let correlation_value = parse_f64(14, "correlation")?;

        Some(Record::Correlation(Correlation {
            id,
            site: Site::new(fields[7], fields[8], fields[9], fields[10]),
            source: Source::new(&self.default_agency_id, &self.default_author),
            time,
            phase: Some(fields[11].to_string()),
            hypocenter: Hypocenter { latitude, longitude, depth, time: origin_time },
            correlation_value,
            magnitude: Some(magnitude),
            // event type is not carried by the format
            event_type: Some("earthquake".to_string()),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CC_LINE: &str = "2015/03/23 23:53:47.630 36.769 -98.019 5.0 1.2677417 mblg GS \
                           OK032 HHZ 00 P 2015/03/23 23:53:50.850 0.7663822 0.65";

    fn parser() -> CCParser {
        CCParser::new("US", "glasstest")
    }

    #[test]
    fn parses_correlation() {
        let record = parser().parse(CC_LINE).expect("correlation should parse");
        let Record::Correlation(correlation) = &record else {
            panic!("expected a correlation, got {:?}", record.kind());
        };

        assert_eq!(correlation.id, "CCOK032HHZGS0020150323235350850");
        assert_eq!(correlation.site, Site::new("GS", "OK032", "HHZ", "00"));
        assert_eq!(correlation.source, Source::new("US", "glasstest"));
        assert_eq!(correlation.phase.as_deref(), Some("P"));
        // arrival 2015-03-23T23:53:50.850Z
        assert!((correlation.time - 1427154830.850).abs() < 1e-6);
        // origin 2015-03-23T23:53:47.630Z
        assert!((correlation.hypocenter.time - 1427154827.630).abs() < 1e-6);
        assert!((correlation.hypocenter.latitude - 36.769).abs() < 1e-9);
        assert!((correlation.hypocenter.longitude + 98.019).abs() < 1e-9);
        assert!((correlation.hypocenter.depth - 5.0).abs() < 1e-9);
        assert!((correlation.correlation_value - 0.7663822).abs() < 1e-9);
        assert_eq!(correlation.magnitude, Some(1.2677417));
        assert_eq!(correlation.event_type.as_deref(), Some("earthquake"));

        assert!(parser().validate(&record));
    }

    #[test]
    fn rejects_short_lines() {
        assert!(parser().parse("").is_none());
        assert!(parser().parse("2015/03/23 23:53:47.630 36.769").is_none());
    }

    #[test]
    fn rejects_non_numeric_required_fields() {
        let line = CC_LINE.replace("36.769", "not-a-number");
        assert!(parser().parse(&line).is_none());

        let line = CC_LINE.replace("0.7663822", "abc");
        assert!(parser().parse(&line).is_none());
    }

    #[test]
    fn rejects_bad_times() {
        let line = CC_LINE.replace("2015/03/23 23:53:50.850", "bogus/da/te ti:me:st.amp");
        assert!(parser().parse(&line).is_none());
    }
}
