//! Market reference data: instruments, limits, and trading profiles.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use super::de;

/// Price/notional/size limit tuple: (min, max, step, display decimals).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LimitTuple {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    /// Display precision for quote formatting.
    #[serde(default = "default_decimals")]
    pub decimals: u32,
}

fn default_decimals() -> u32 {
    2
}

impl Default for LimitTuple {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.0,
            step: 0.0,
            decimals: 2,
        }
    }
}

/// How a stop-loss/take-profit/entry level is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MethodKind {
    None,
    Price,
    Percent,
    Pip,
    Limit,
    LimitPercent,
    Market,
    /// Best bid/ask offset by N steps; the distance carries the offset.
    Best,
}

impl Default for MethodKind {
    fn default() -> Self {
        MethodKind::None
    }
}

impl fmt::Display for MethodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MethodKind::None => "none",
            MethodKind::Price => "price",
            MethodKind::Percent => "percent",
            MethodKind::Pip => "pip",
            MethodKind::Limit => "limit",
            MethodKind::LimitPercent => "limit-percent",
            MethodKind::Market => "market",
            MethodKind::Best => "best",
        };
        write!(f, "{}", s)
    }
}

/// An entry/stop-loss/take-profit method: a kind plus an optional distance.
///
/// Identity is the `key()` string; the store's method registry inserts a
/// method once and never duplicates it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Method {
    pub kind: MethodKind,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub value: Option<f64>,
}

impl Method {
    pub fn new(kind: MethodKind, value: Option<f64>) -> Self {
        Self { kind, value }
    }

    /// Registry identity, e.g. `percent:0.5` or `market`.
    pub fn key(&self) -> String {
        match self.value {
            Some(v) => format!("{}:{}", self.kind, v),
            None => self.kind.to_string(),
        }
    }
}

/// Named preset bundling entry/stop-loss/take-profit method choices.
/// Read-only reference data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub entry: Method,
    #[serde(default)]
    pub stop_loss: Method,
    #[serde(default)]
    pub take_profit: Method,
}

/// A tradable instrument. Identity (`id`) is immutable; prices and limits are
/// mutated by ticker pushes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Market {
    pub id: String,
    pub symbol: String,
    #[serde(default, deserialize_with = "de::f64_flexible")]
    pub pip_value: f64,
    #[serde(default)]
    pub price_limit: LimitTuple,
    #[serde(default)]
    pub notional_limit: LimitTuple,
    #[serde(default)]
    pub size_limit: LimitTuple,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub bid: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub ask: Option<f64>,
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Market {
    /// Mid price from current bid/ask, if both are known.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            _ => None,
        }
    }

    /// Spread from current bid/ask, if both are known.
    pub fn spread(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        }
    }

    /// Display precision for quote prices.
    pub fn quote_decimals(&self) -> u32 {
        self.price_limit.decimals
    }
}
