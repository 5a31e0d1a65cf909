//! JSON detection-format parser.
//!
//! Accepts any canonical detection-format message (pick, correlation,
//! detection, station info), auto-detecting the kind from the `"Type"`
//! discriminator. Station info answers addressed to a different node (the
//! `InformationRequestor` does not match this parser's default
//! agency/author) are dropped, so a node only ingests responses to its own
//! lookups.

use strata_core::{Record, Source};

use crate::Parser;

pub struct JsonParser {
    default_source: Source,
}

impl JsonParser {
    pub fn new(default_agency_id: &str, default_author: &str) -> Self {
        Self { default_source: Source::new(default_agency_id, default_author) }
    }
}

impl Parser for JsonParser {
    fn parse(&self, input: &str) -> Option<Record> {
        if input.is_empty() {
            return None;
        }
        log::trace!("jsonparser: input string: {input}");

        let record: Record = match serde_json::from_str(input) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("jsonparser: problem deserializing message: {e}");
                return None;
            }
        };

        if let Record::StationInfo(station) = &record {
            if let Some(requestor) = &station.information_requestor {
                if *requestor != self.default_source {
                    log::debug!(
                        "jsonparser: station {} is not for this instance by agency and author",
                        station.site.key()
                    );
                    return None;
                }
            }
        }

        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use strata_core::RecordKind;

    use super::*;

    fn parser() -> JsonParser {
        JsonParser::new("US", "glasstest")
    }

    #[test]
    fn detects_pick_messages() {
        let message = r#"{"Type":"Pick","ID":"12345","Site":{"Station":"BOZ","Channel":"BHZ",
            "Network":"US","Location":"00"},"Source":{"AgencyID":"US","Author":"glasstest"},
            "Time":"2015-03-03T00:00:44.175Z","Phase":"P"}"#;
        let record = parser().parse(message).expect("pick should parse");
        assert_eq!(record.kind(), RecordKind::Pick);
        assert!(parser().validate(&record));
    }

    #[test]
    fn detects_correlation_messages() {
        let message = r#"{"Type":"Correlation","ID":"CC123","Site":{"Station":"OK032",
            "Channel":"HHZ","Network":"GS","Location":"00"},
            "Source":{"AgencyID":"US","Author":"glasstest"},
            "Time":"2015-03-23T23:53:50.850Z","Phase":"P",
            "Hypocenter":{"Latitude":36.769,"Longitude":-98.019,"Depth":5.0,
            "Time":"2015-03-23T23:53:47.630Z"},
            "CorrelationValue":0.7663822,"Magnitude":1.2677417,"EventType":"earthquake"}"#;
        let record = parser().parse(message).expect("correlation should parse");
        assert_eq!(record.kind(), RecordKind::Correlation);
        assert!(parser().validate(&record));
    }

    #[test]
    fn keeps_station_info_for_this_instance() {
        let message = r#"{"Type":"StationInfo","Site":{"Station":"BOZ","Channel":"BHZ",
            "Network":"US","Location":"00"},"Latitude":45.6,"Longitude":-111.6,
            "Elevation":1589.0,"Quality":1.0,"Enable":true,"Use":true,
            "InformationRequestor":{"AgencyID":"US","Author":"glasstest"}}"#;
        let record = parser().parse(message).expect("station info should parse");
        assert_eq!(record.kind(), RecordKind::StationInfo);
    }

    #[test]
    fn drops_station_info_for_other_instances() {
        let message = r#"{"Type":"StationInfo","Site":{"Station":"BOZ","Channel":"BHZ",
            "Network":"US","Location":"00"},"Latitude":45.6,"Longitude":-111.6,
            "Elevation":1589.0,
            "InformationRequestor":{"AgencyID":"XX","Author":"someoneelse"}}"#;
        assert!(parser().parse(message).is_none());
    }

    #[test]
    fn keeps_unaddressed_station_info() {
        let message = r#"{"Type":"StationInfo","Site":{"Station":"BOZ","Channel":"BHZ",
            "Network":"US","Location":"00"},"Latitude":45.6,"Longitude":-111.6,
            "Elevation":1589.0}"#;
        assert!(parser().parse(message).is_some());
    }

    #[test]
    fn rejects_unknown_and_malformed_messages() {
        assert!(parser().parse("").is_none());
        assert!(parser().parse("{not json}").is_none());
        assert!(parser().parse(r#"{"Type":"Wibble","ID":"1"}"#).is_none());
    }
}
