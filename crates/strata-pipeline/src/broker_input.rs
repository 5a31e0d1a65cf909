//! Broker input adapter.
//!
//! Polls a message-broker consumer for detection-format JSON messages. The
//! actual broker client (connection, subscription, heartbeat files) is a
//! pluggable collaborator behind [`BrokerConsumer`]; this adapter owns the
//! polling cadence and the heartbeat staleness alarm.

use std::sync::Arc;
use std::time::Duration;

use strata_core::config::{Config, KIND_GLASS_INPUT};
use strata_core::time::now_epoch;

use crate::error::{check_kind, SetupError};
use crate::input::{FetchContext, RawFetch, JSON_TYPE};

/// Per-tick poll timeout.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// The broker-client capability.
pub trait BrokerConsumer: Send + Sync {
    /// Polls for one message, waiting at most `timeout`.
    fn poll(&self, timeout: Duration) -> Option<String>;

    /// Epoch seconds of the last heartbeat seen on the subscribed topics.
    fn last_heartbeat_time(&self) -> i64;

    /// Overwrites the last-heartbeat time (used to suppress repeat alarms).
    fn set_last_heartbeat_time(&self, epoch: i64);
}

/// A [`RawFetch`] source polling a broker consumer. All messages are tagged
/// `json`.
pub struct BrokerFetcher {
    consumer: Arc<dyn BrokerConsumer>,
    heartbeat_interval_secs: i64,
}

impl BrokerFetcher {
    /// Builds the adapter from a `GlassInput` configuration and a connected
    /// consumer.
    pub fn from_config(
        config: &Config,
        consumer: Arc<dyn BrokerConsumer>,
    ) -> Result<Self, SetupError> {
        check_kind(config, KIND_GLASS_INPUT)?;

        // the consumer itself is configured externally, but its connection
        // block is required so a missing one fails at setup, not at poll
        if config.json().get("HazdevBrokerConfig").is_none() {
            return Err(SetupError::MissingKey("HazdevBrokerConfig"));
        }
        if let Some(topics) = config.get_array("Topics") {
            log::info!("brokerinput::setup: consuming {} topic(s)", topics.len());
        } else {
            return Err(SetupError::MissingKey("Topics"));
        }

        let heartbeat_interval_secs = config.get_i64("BrokerHeartbeatInterval").unwrap_or(-1);
        if heartbeat_interval_secs >= 0 {
            log::info!(
                "brokerinput::setup: using BrokerHeartbeatInterval {heartbeat_interval_secs}"
            );
        }

        Ok(Self { consumer, heartbeat_interval_secs })
    }

    /// Builds the adapter directly, for embedding without a config file.
    pub fn new(consumer: Arc<dyn BrokerConsumer>, heartbeat_interval_secs: i64) -> Self {
        Self { consumer, heartbeat_interval_secs }
    }

    fn check_heartbeat(&self) {
        if self.heartbeat_interval_secs < 0 {
            return;
        }
        let time_now = now_epoch() as i64;
        let elapsed = time_now - self.consumer.last_heartbeat_time();
        if elapsed > self.heartbeat_interval_secs {
            log::error!(
                "brokerinput: no heartbeat message seen from topic(s) in {} seconds! ({elapsed})",
                self.heartbeat_interval_secs
            );
            // reset so the alarm fires once per quiet interval, not every tick
            self.consumer.set_last_heartbeat_time(time_now);
        }
    }
}

impl RawFetch for BrokerFetcher {
    fn fetch_raw(&self, _ctx: &FetchContext) -> Option<(String, String)> {
        self.check_heartbeat();

        let message = self.consumer.poll(POLL_TIMEOUT)?;
        if message.is_empty() {
            return None;
        }
        Some((JSON_TYPE.to_string(), message))
    }
}
