//! The association engine front-end.
//!
//! [`KernelEngine`] implements the pipeline's engine contract: it absorbs
//! configuration snapshots, maintains the station cache and the pick and
//! hypothesis lists, raises station-info requests for picks from unknown
//! stations, and answers retrieval requests. The nucleation algebra itself
//! (grid search, Brent hypocenter optimization, travel-time tables) hangs
//! off this surface and is intentionally separable from the pipeline.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};
use strata_core::cache::Cache;
use strata_core::config::value_kind;
use strata_core::record::StationInfo;
use strata_core::time::now_epoch;
use strata_core::{Record, Source};
use strata_pipeline::engine::{AssocEngine, EngineMessage, EngineSink, OutputMessage};

/// Default cap on retained picks.
const DEFAULT_MAX_PICKS: usize = 10_000;

/// How long to suppress repeat station-info requests for the same site,
/// seconds.
const STATION_REQUEST_SUPPRESS_SECS: i64 = 300;

type LogSink = Arc<dyn Fn(log::Level, String) + Send + Sync>;

/// The engine instance owned by the associator stage.
///
/// Internally synchronized: `dispatch` is safe from the associator worker
/// while monitoring queries arrive from the supervisor thread. Nothing here
/// blocks for more than a cache critical section, so dispatch stalls only
/// on lock contention.
pub struct KernelEngine {
    send_sink: RwLock<Option<Arc<dyn EngineSink>>>,
    log_sink: RwLock<Option<LogSink>>,
    stations: Cache<StationInfo>,
    picks: Cache<Record>,
    pick_order: Mutex<VecDeque<String>>,
    hypos: Cache<Value>,
    max_picks: AtomicUsize,
    station_requests: Mutex<HashMap<String, i64>>,
    request_suppress_secs: AtomicI64,
    source: RwLock<Source>,
    grid_count: AtomicUsize,
    healthy: AtomicBool,
}

impl KernelEngine {
    pub fn new() -> Self {
        Self {
            send_sink: RwLock::new(None),
            log_sink: RwLock::new(None),
            stations: Cache::new(),
            picks: Cache::new(),
            pick_order: Mutex::new(VecDeque::new()),
            hypos: Cache::new(),
            max_picks: AtomicUsize::new(DEFAULT_MAX_PICKS),
            station_requests: Mutex::new(HashMap::new()),
            request_suppress_secs: AtomicI64::new(STATION_REQUEST_SUPPRESS_SECS),
            source: RwLock::new(Source::new("US", "strata-engine")),
            grid_count: AtomicUsize::new(0),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn station_list_size(&self) -> usize {
        self.stations.len()
    }

    fn log(&self, level: log::Level, message: String) {
        match self.log_sink.read().as_ref() {
            Some(sink) => sink(level, message),
            None => log::log!(level, "engine: {message}"),
        }
    }

    fn emit(&self, message: OutputMessage) {
        match self.send_sink.read().as_ref() {
            Some(sink) => sink.send(message),
            None => {
                log::warn!("engine: no send sink registered, dropping {} message", message.kind)
            }
        }
    }

    fn handle_config(&self, config: Value) {
        let kind = value_kind(&config)
            .or_else(|| config.get("Type").and_then(Value::as_str))
            .unwrap_or("")
            .to_string();

        match kind.as_str() {
            "Initialize" => {
                if let Some(max) = config.get("MaximumNumberOfPicks").and_then(Value::as_u64) {
                    self.max_picks.store(max as usize, Ordering::SeqCst);
                }
                let mut source = self.source.write();
                if let Some(agency) = config.get("DefaultAgencyID").and_then(Value::as_str) {
                    source.agency_id = agency.to_string();
                }
                if let Some(author) = config.get("DefaultAuthor").and_then(Value::as_str) {
                    source.author = author.to_string();
                }
                drop(source);
                self.log(log::Level::Info, "initialized".to_string());
            }
            "StationList" => {
                let Some(stations) = config.get("StationList").and_then(Value::as_array) else {
                    self.log(
                        log::Level::Error,
                        "StationList configuration without a StationList array".to_string(),
                    );
                    return;
                };
                let mut loaded = 0usize;
                for entry in stations {
                    match serde_json::from_value::<StationInfo>(entry.clone()) {
                        Ok(station) => {
                            self.stations.put(&station.site.key(), station);
                            loaded += 1;
                        }
                        Err(e) => {
                            self.log(log::Level::Warn, format!("bad station list entry: {e}"))
                        }
                    }
                }
                self.log(log::Level::Info, format!("loaded {loaded} stations"));
            }
            "Grid" | "Global" => {
                let name = config.get("Name").and_then(Value::as_str).unwrap_or("unnamed");
                self.grid_count.fetch_add(1, Ordering::SeqCst);
                self.log(log::Level::Info, format!("configured detection grid {name}"));
            }
            other => {
                self.log(log::Level::Debug, format!("ignoring configuration kind {other}"));
            }
        }
    }

    /// A pick from a station the engine does not know: ask the outside
    /// world for its metadata, at most once per suppression interval.
    fn request_station_info(&self, site_key: &str, record: &Record) {
        let now = now_epoch() as i64;
        {
            let mut requests = self.station_requests.lock();
            if let Some(last) = requests.get(site_key) {
                if now - last < self.request_suppress_secs.load(Ordering::SeqCst) {
                    return;
                }
            }
            requests.insert(site_key.to_string(), now);
        }

        let Some(site) = record.site() else {
            return;
        };
        let source = self.source.read().clone();
        let body = json!({
            "Type": "StationInfoRequest",
            "Site": {
                "Station": site.station,
                "Channel": site.channel,
                "Network": site.network,
                "Location": site.location,
            },
            "Source": { "AgencyID": source.agency_id, "Author": source.author },
        });
        self.log(log::Level::Debug, format!("requesting station info for {site_key}"));
        self.emit(OutputMessage::new("StationInfoRequest", site_key, body.to_string()));
    }

    fn add_pick(&self, record: Record) {
        let id = record.id();
        let mut order = self.pick_order.lock();
        if !self.picks.contains(&id) {
            order.push_back(id.clone());
        }
        self.picks.put(&id, record);

        // retention is bounded; the oldest picks age out
        let max = self.max_picks.load(Ordering::SeqCst);
        while self.picks.len() > max {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.picks.remove(&oldest);
        }
    }

    fn handle_record(&self, record: Record) {
        match &record {
            Record::Pick(pick) => {
                let site_key = pick.site.key();
                if !self.stations.contains(&site_key) {
                    self.request_station_info(&site_key, &record);
                }
                self.add_pick(record);
            }
            Record::Correlation(correlation) => {
                let site_key = correlation.site.key();
                if !self.stations.contains(&site_key) {
                    self.request_station_info(&site_key, &record);
                }
                self.add_pick(record);
            }
            Record::StationInfo(station) => {
                let key = station.site.key();
                self.log(log::Level::Debug, format!("updating station {key}"));
                self.stations.put(&key, station.clone());
            }
            Record::Detection(detection) => {
                // externally seeded hypothesis
                match serde_json::to_value(&record) {
                    Ok(value) => {
                        self.hypos.put(&detection.id, value);
                    }
                    Err(e) => self.log(log::Level::Error, format!("bad detection record: {e}")),
                }
            }
        }
    }

    fn handle_request(&self, request: Value) {
        let command = request.get("Cmd").and_then(Value::as_str).unwrap_or("");
        match command {
            "ReqStationList" => {
                let mut stations = Vec::new();
                let mut restart = true;
                while let Some(station) = self.stations.next(restart) {
                    restart = false;
                    if let Ok(value) = serde_json::to_value(&station) {
                        stations.push(value);
                    }
                }
                let body = json!({ "Type": "StationList", "StationList": stations });
                self.emit(OutputMessage::new("StationList", "stationlist", body.to_string()));
            }
            "ReqHypo" => {
                let Some(pid) = request.get("Pid").and_then(Value::as_str) else {
                    self.log(log::Level::Error, "ReqHypo request without a Pid".to_string());
                    return;
                };
                match self.hypos.get(pid) {
                    Some(hypo) => {
                        self.emit(OutputMessage::new("Detection", pid, hypo.to_string()));
                    }
                    None => {
                        self.log(log::Level::Warn, format!("ReqHypo for unknown hypo {pid}"))
                    }
                }
            }
            other => {
                self.log(log::Level::Debug, format!("ignoring request {other}"));
            }
        }
    }
}

impl Default for KernelEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssocEngine for KernelEngine {
    fn dispatch(&self, message: EngineMessage) {
        match message {
            EngineMessage::Config(config) => self.handle_config(config),
            EngineMessage::Record(record) => self.handle_record(record),
            EngineMessage::Request(request) => self.handle_request(request),
        }
    }

    fn status_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    fn pick_list_size(&self) -> usize {
        self.picks.len()
    }

    fn hypo_list_size(&self) -> usize {
        self.hypos.len()
    }

    fn set_send_sink(&self, sink: Arc<dyn EngineSink>) {
        *self.send_sink.write() = Some(sink);
    }

    fn set_log_sink(&self, sink: Arc<dyn Fn(log::Level, String) + Send + Sync>) {
        *self.log_sink.write() = Some(sink);
    }
}
