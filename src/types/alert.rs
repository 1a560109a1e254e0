//! Alerts, signals, and regions, plus the notice bus payloads handed to the
//! external display layer.
//!
//! All three are append-only from the client's perspective (regions may also
//! be deleted by id). Signals without a stable server id (-1 on the wire) key
//! on their event timestamp instead.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::de;
use super::trade::Direction;

/// Identity of an alert/signal/region within one market.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct EventKey {
    pub market_id: String,
    pub local_id: i64,
}

impl EventKey {
    pub fn new(market_id: impl Into<String>, local_id: i64) -> Self {
        Self {
            market_id: market_id.into(),
            local_id,
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market_id, self.local_id)
    }
}

/// A price alert. Never mutated once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AlertPush {
    pub id: i64,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub price: Option<f64>,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

/// A strategy signal event. `id` of -1 on the wire means "no stable id"; the
/// store keys such signals on (market, timestamp) and overwrites on collision.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SignalPush {
    #[serde(default = "no_id")]
    pub id: i64,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub price: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub time: Option<i64>,
}

fn no_id() -> i64 {
    -1
}

impl SignalPush {
    /// Store key: the server id when stable, otherwise the event timestamp
    /// (frame timestamp as last resort).
    pub fn key(&self, market_id: &str, frame_timestamp: i64) -> EventKey {
        let local_id = if self.id >= 0 {
            self.id
        } else {
            self.time.unwrap_or(frame_timestamp)
        };
        EventKey::new(market_id, local_id)
    }
}

/// A chart region (price band over a time span).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegionPush {
    pub id: i64,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub price_from: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub price_to: Option<f64>,
    #[serde(default)]
    pub time_from: Option<i64>,
    #[serde(default)]
    pub time_to: Option<i64>,
    #[serde(default)]
    pub label: Option<String>,
}

/// A recorded alert with its market context.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub market_id: String,
    pub id: i64,
    pub price: Option<f64>,
    pub direction: Direction,
    pub message: Option<String>,
    pub created_at: i64,
}

impl Alert {
    pub fn from_push(market_id: &str, push: &AlertPush, frame_timestamp: i64) -> Self {
        Self {
            market_id: market_id.to_string(),
            id: push.id,
            price: push.price,
            direction: push.direction.unwrap_or_default(),
            message: push.message.clone(),
            created_at: push.created_at.unwrap_or(frame_timestamp),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.market_id.clone(), self.id)
    }
}

/// A recorded signal with its market context and resolved key.
#[derive(Debug, Clone, Serialize)]
pub struct SignalEvent {
    pub market_id: String,
    pub local_id: i64,
    pub direction: Direction,
    pub price: Option<f64>,
    pub label: Option<String>,
    pub time: i64,
}

impl SignalEvent {
    pub fn from_push(market_id: &str, push: &SignalPush, frame_timestamp: i64) -> Self {
        let key = push.key(market_id, frame_timestamp);
        Self {
            market_id: market_id.to_string(),
            local_id: key.local_id,
            direction: push.direction.unwrap_or_default(),
            price: push.price,
            label: push.label.clone(),
            time: push.time.unwrap_or(frame_timestamp),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.market_id.clone(), self.local_id)
    }
}

/// A recorded region with its market context.
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub market_id: String,
    pub id: i64,
    pub price_from: Option<f64>,
    pub price_to: Option<f64>,
    pub time_from: Option<i64>,
    pub time_to: Option<i64>,
    pub label: Option<String>,
}

impl Region {
    pub fn from_push(market_id: &str, push: &RegionPush) -> Self {
        Self {
            market_id: market_id.to_string(),
            id: push.id,
            price_from: push.price_from,
            price_to: push.price_to,
            time_from: push.time_from,
            time_to: push.time_to,
            label: push.label.clone(),
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey::new(self.market_id.clone(), self.id)
    }
}

/// Deletion reference carried by remove-alert / remove-region frames.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoveRef {
    pub id: i64,
}

/// One row of the regions snapshot (`GET strategy/region`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RegionSnapshot {
    pub market_id: String,
    #[serde(flatten)]
    pub region: RegionPush,
}

/// Ephemeral event published to the render collaborators. Not stored.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notice {
    /// A signal-alert frame: one-shot, displayed then discarded.
    SignalAlert {
        market_id: String,
        alert: AlertPush,
    },
    /// A region-signal frame (placeholder handling: surfaced, not stored).
    RegionSignal {
        market_id: String,
        region: RegionPush,
    },
    /// A user-visible error, one per server-reported message.
    Error { message: String },
    /// Connection lifecycle transition for status display.
    Lifecycle { state: String },
}
