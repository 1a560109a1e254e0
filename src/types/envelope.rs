//! Push-channel wire frame.
//!
//! Every inbound frame is a JSON envelope with single-letter field names:
//! `c` category, `g` group, `s` stream scope id, `n` name, `t` type tag,
//! `b` epoch seconds, `v` payload. The payload is kept as a raw
//! `serde_json::Value` here; the decoder turns it into a typed value based
//! solely on `t`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame category. Closed set; anything new on the wire lands in `Unknown`
/// and is dropped by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "general")]
    General,
    #[serde(rename = "trader")]
    Trader,
    #[serde(rename = "watcher")]
    Watcher,
    #[serde(rename = "strategy")]
    Strategy,
    #[serde(rename = "strategy-chart")]
    StrategyChart,
    #[serde(rename = "strategy-info")]
    StrategyInfo,
    #[serde(rename = "strategy-trade")]
    StrategyTrade,
    #[serde(rename = "strategy-alert")]
    StrategyAlert,
    #[serde(rename = "strategy-region")]
    StrategyRegion,
    #[serde(rename = "strategy-signal")]
    StrategySignal,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::General => "general",
            Category::Trader => "trader",
            Category::Watcher => "watcher",
            Category::Strategy => "strategy",
            Category::StrategyChart => "strategy-chart",
            Category::StrategyInfo => "strategy-info",
            Category::StrategyTrade => "strategy-trade",
            Category::StrategyAlert => "strategy-alert",
            Category::StrategyRegion => "strategy-region",
            Category::StrategySignal => "strategy-signal",
            Category::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Payload type tag. Each tag maps 1:1 to a payload shape (see the decoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    #[serde(rename = "b")]
    Bool,
    #[serde(rename = "i")]
    Int,
    #[serde(rename = "is")]
    IntList,
    #[serde(rename = "f")]
    Float,
    #[serde(rename = "fp")]
    FloatPair,
    #[serde(rename = "fs")]
    FloatSeries,
    #[serde(rename = "fb")]
    FloatBarSeries,
    #[serde(rename = "ss")]
    StringList,
    #[serde(rename = "to")]
    TradeOpen,
    #[serde(rename = "tu")]
    TradeUpdate,
    #[serde(rename = "tx")]
    TradeClose,
    #[serde(rename = "th")]
    HistoricalTrade,
    #[serde(rename = "se")]
    Series,
    #[serde(rename = "sc")]
    ScatterSeries,
    #[serde(rename = "oh")]
    OhlcSeries,
    #[serde(rename = "tk")]
    Ticker,
    #[serde(rename = "sg")]
    Signal,
    #[serde(rename = "sa")]
    SignalAlert,
    #[serde(rename = "ac")]
    CreateAlert,
    #[serde(rename = "ar")]
    RemoveAlert,
    #[serde(rename = "rs")]
    SignalRegion,
    #[serde(rename = "rc")]
    CreateRegion,
    #[serde(rename = "rr")]
    RemoveRegion,
    #[serde(rename = "ab")]
    AccountBalance,
    #[serde(other)]
    Unknown,
}

/// One inbound push frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// Frame category.
    #[serde(rename = "c")]
    pub category: Category,
    /// Group within the category (wire format detail, informational).
    #[serde(rename = "g", default)]
    pub group: Option<String>,
    /// Stream scope id: market id for market-scoped frames, service name
    /// for liveness frames.
    #[serde(rename = "s", default)]
    pub scope: Option<String>,
    /// Frame name (e.g. "ping", "conn").
    #[serde(rename = "n", default)]
    pub name: Option<String>,
    /// Payload type tag.
    #[serde(rename = "t")]
    pub tag: TypeTag,
    /// Server timestamp, epoch seconds.
    #[serde(rename = "b", default)]
    pub timestamp: i64,
    /// Raw payload; the decoder owns its interpretation.
    #[serde(rename = "v", default)]
    pub payload: serde_json::Value,
}

impl Envelope {
    /// Scope id or empty string. Market-scoped handlers treat a missing
    /// scope as malformed input.
    pub fn scope_or_empty(&self) -> &str {
        self.scope.as_deref().unwrap_or("")
    }
}
