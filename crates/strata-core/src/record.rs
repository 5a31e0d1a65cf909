//! The canonical detection record model.
//!
//! A [`Record`] is the lingua franca between the input stage and the
//! association engine: every wire format is normalized into one of these
//! before it enters the pipeline. The serde names follow the detection
//! formats JSON schema (`"Type"` discriminator, PascalCase keys, ISO8601
//! time strings), so a record round-trips to the same JSON the original
//! producers emit.

use serde::{Deserialize, Serialize};

use crate::time::iso8601_serde;

/// The kinds of record the pipeline moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Pick,
    Correlation,
    Detection,
    StationInfo,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordKind::Pick => write!(f, "Pick"),
            RecordKind::Correlation => write!(f, "Correlation"),
            RecordKind::Detection => write!(f, "Detection"),
            RecordKind::StationInfo => write!(f, "StationInfo"),
        }
    }
}

/// Station identification: SCNL (station, channel, network, location).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(rename = "Station")]
    pub station: String,
    #[serde(rename = "Channel", default, skip_serializing_if = "String::is_empty")]
    pub channel: String,
    #[serde(rename = "Network")]
    pub network: String,
    #[serde(rename = "Location", default, skip_serializing_if = "String::is_empty")]
    pub location: String,
}

impl Site {
    pub fn new(network: &str, station: &str, channel: &str, location: &str) -> Self {
        Self {
            station: station.to_string(),
            channel: channel.to_string(),
            network: network.to_string(),
            location: location.to_string(),
        }
    }

    /// SCNL key used by station caches, `station.channel.network.location`.
    pub fn key(&self) -> String {
        format!("{}.{}.{}.{}", self.station, self.channel, self.network, self.location)
    }
}

/// Source attribution carried on every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    #[serde(rename = "AgencyID")]
    pub agency_id: String,
    #[serde(rename = "Author")]
    pub author: String,
}

impl Source {
    pub fn new(agency_id: &str, author: &str) -> Self {
        Self { agency_id: agency_id.to_string(), author: author.to_string() }
    }
}

/// First-motion polarity of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Up,
    Down,
}

/// Onset character of a pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Onset {
    Impulsive,
    Emergent,
    Questionable,
}

/// How the pick was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Picker {
    Manual,
    Raypicker,
    Filterpicker,
    Earthworm,
    Other,
}

/// Band-pass filter applied by the picker, Hz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(rename = "HighPass")]
    pub high_pass: f64,
    #[serde(rename = "LowPass")]
    pub low_pass: f64,
}

/// Amplitude measurement attached to a pick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Amplitude {
    #[serde(rename = "Amplitude")]
    pub amplitude: f64,
    #[serde(rename = "Period")]
    pub period: f64,
    #[serde(rename = "SNR")]
    pub snr: f64,
}

/// Machine-classification info optionally attached to a pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "Phase", default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(rename = "PhaseProbability", default, skip_serializing_if = "Option::is_none")]
    pub phase_probability: Option<f64>,
}

/// Event location in space-time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hypocenter {
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Depth")]
    pub depth: f64,
    #[serde(rename = "Time", with = "iso8601_serde")]
    pub time: f64,
}

impl Hypocenter {
    fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
            && self.depth.is_finite()
            && self.time > 0.0
    }
}

/// A detected seismic phase arrival at a single station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Site")]
    pub site: Site,
    #[serde(rename = "Source")]
    pub source: Source,
    #[serde(rename = "Time", with = "iso8601_serde")]
    pub time: f64,
    #[serde(rename = "Phase", default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(rename = "Polarity", default, skip_serializing_if = "Option::is_none")]
    pub polarity: Option<Polarity>,
    #[serde(rename = "Onset", default, skip_serializing_if = "Option::is_none")]
    pub onset: Option<Onset>,
    #[serde(rename = "Picker", default, skip_serializing_if = "Option::is_none")]
    pub picker: Option<Picker>,
    #[serde(rename = "Filter", default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,
    #[serde(rename = "Amplitude", default, skip_serializing_if = "Option::is_none")]
    pub amplitude: Option<Amplitude>,
    #[serde(rename = "ClassificationInfo", default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
}

/// A cross-correlation detection tied to a reference event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correlation {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Site")]
    pub site: Site,
    #[serde(rename = "Source")]
    pub source: Source,
    #[serde(rename = "Time", with = "iso8601_serde")]
    pub time: f64,
    #[serde(rename = "Phase", default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
    #[serde(rename = "Hypocenter")]
    pub hypocenter: Hypocenter,
    #[serde(rename = "CorrelationValue")]
    pub correlation_value: f64,
    #[serde(rename = "Magnitude", default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,
    #[serde(rename = "EventType", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
}

/// An associated event hypothesis emitted by the engine.
///
/// The contributing pick data is carried opaquely; the pipeline routes it,
/// only the engine interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Source")]
    pub source: Source,
    #[serde(rename = "Hypocenter")]
    pub hypocenter: Hypocenter,
    #[serde(rename = "DetectionType", default, skip_serializing_if = "Option::is_none")]
    pub detection_type: Option<String>,
    #[serde(rename = "Data", default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<serde_json::Value>,
}

/// Station metadata, usually the answer to a station-info request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationInfo {
    #[serde(rename = "Site")]
    pub site: Site,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Elevation")]
    pub elevation: f64,
    #[serde(rename = "Quality", default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<f64>,
    #[serde(rename = "Enable", default = "default_true")]
    pub enable: bool,
    #[serde(rename = "Use", default = "default_true")]
    pub use_station: bool,
    #[serde(rename = "InformationRequestor", default, skip_serializing_if = "Option::is_none")]
    pub information_requestor: Option<Source>,
}

fn default_true() -> bool {
    true
}

/// The canonical detection record moved between pipeline stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum Record {
    Pick(Pick),
    Correlation(Correlation),
    Detection(Detection),
    StationInfo(StationInfo),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Pick(_) => RecordKind::Pick,
            Record::Correlation(_) => RecordKind::Correlation,
            Record::Detection(_) => RecordKind::Detection,
            Record::StationInfo(_) => RecordKind::StationInfo,
        }
    }

    /// Producer-assigned id; station info records are keyed by SCNL.
    pub fn id(&self) -> String {
        match self {
            Record::Pick(p) => p.id.clone(),
            Record::Correlation(c) => c.id.clone(),
            Record::Detection(d) => d.id.clone(),
            Record::StationInfo(s) => s.site.key(),
        }
    }

    pub fn site(&self) -> Option<&Site> {
        match self {
            Record::Pick(p) => Some(&p.site),
            Record::Correlation(c) => Some(&c.site),
            Record::Detection(_) => None,
            Record::StationInfo(s) => Some(&s.site),
        }
    }

    pub fn time(&self) -> Option<f64> {
        match self {
            Record::Pick(p) => Some(p.time),
            Record::Correlation(c) => Some(c.time),
            Record::Detection(d) => Some(d.hypocenter.time),
            Record::StationInfo(_) => None,
        }
    }

    /// A record is valid iff the required fields for its kind are present
    /// and source attribution carries a non-empty agency id.
    pub fn is_valid(&self) -> bool {
        match self {
            Record::Pick(p) => {
                !p.id.is_empty()
                    && !p.site.station.is_empty()
                    && !p.site.network.is_empty()
                    && !p.source.agency_id.is_empty()
                    && p.time > 0.0
            }
            Record::Correlation(c) => {
                !c.id.is_empty()
                    && !c.site.station.is_empty()
                    && !c.site.network.is_empty()
                    && !c.source.agency_id.is_empty()
                    && c.time > 0.0
                    && c.correlation_value.is_finite()
                    && c.hypocenter.is_valid()
            }
            Record::Detection(d) => {
                !d.id.is_empty() && !d.source.agency_id.is_empty() && d.hypocenter.is_valid()
            }
            Record::StationInfo(s) => {
                !s.site.station.is_empty()
                    && !s.site.network.is_empty()
                    && (-90.0..=90.0).contains(&s.latitude)
                    && (-180.0..=180.0).contains(&s.longitude)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pick() -> Pick {
        Pick {
            id: "22637648".to_string(),
            site: Site::new("US", "BOZ", "BHZ", "00"),
            source: Source::new("US", "228041013"),
            time: 1425340844.175,
            phase: Some("P".to_string()),
            polarity: Some(Polarity::Up),
            onset: None,
            picker: Some(Picker::Manual),
            filter: Some(Filter { high_pass: 1.05, low_pass: 2.65 }),
            amplitude: None,
            classification: None,
        }
    }

    #[test]
    fn pick_round_trips_through_wire_json() {
        let record = Record::Pick(sample_pick());
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"Type\":\"Pick\""));
        assert!(json.contains("\"Polarity\":\"up\""));
        assert!(json.contains("\"Picker\":\"manual\""));
        // wire time is ISO8601
        assert!(json.contains("2015-03-03T00:00:44.175Z"));

        let back: Record = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn validation_requires_agency_and_site() {
        let mut pick = sample_pick();
        assert!(Record::Pick(pick.clone()).is_valid());

        pick.source.agency_id.clear();
        assert!(!Record::Pick(pick.clone()).is_valid());

        pick.source.agency_id = "US".to_string();
        pick.site.station.clear();
        assert!(!Record::Pick(pick).is_valid());
    }

    #[test]
    fn correlation_validation_checks_hypocenter() {
        let mut correlation = Correlation {
            id: "CCOK032HHZGS00".to_string(),
            site: Site::new("GS", "OK032", "HHZ", "00"),
            source: Source::new("US", "strata"),
            time: 1427154830.85,
            phase: Some("P".to_string()),
            hypocenter: Hypocenter {
                latitude: 36.769,
                longitude: -98.019,
                depth: 5.0,
                time: 1427154827.63,
            },
            correlation_value: 0.7663822,
            magnitude: Some(1.2677417),
            event_type: Some("earthquake".to_string()),
        };
        assert!(Record::Correlation(correlation.clone()).is_valid());

        correlation.hypocenter.latitude = 123.0;
        assert!(!Record::Correlation(correlation).is_valid());
    }

    #[test]
    fn station_info_keyed_by_scnl() {
        let station = StationInfo {
            site: Site::new("AK", "GLI", "BHZ", "--"),
            latitude: 58.45,
            longitude: -135.89,
            elevation: 120.0,
            quality: Some(1.0),
            enable: true,
            use_station: true,
            information_requestor: None,
        };
        assert_eq!(Record::StationInfo(station.clone()).id(), "GLI.BHZ.AK.--");
        assert!(Record::StationInfo(station).is_valid());
    }
}
