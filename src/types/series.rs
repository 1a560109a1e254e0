//! Chart-stream payload shapes (series/scatter/OHLC frames).
//!
//! These pass through the decoder untransformed today; the display layer
//! consumes them directly.

use serde::{Deserialize, Serialize};

/// Named value series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericSeries {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub times: Vec<i64>,
    #[serde(default)]
    pub values: Vec<f64>,
}

/// Discrete points (e.g. entries/exits plotted on a chart).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScatterSeries {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points: Vec<(i64, f64)>,
}

/// One OHLC bar: [open, high, low, close].
pub type Bar = [f64; 4];

/// Bar series keyed by time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OhlcSeries {
    #[serde(default)]
    pub times: Vec<i64>,
    #[serde(default)]
    pub bars: Vec<Bar>,
}
