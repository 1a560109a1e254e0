//! Tickers: per-market prices mutated field-by-field by partial pushes.

use serde::{Deserialize, Serialize};

use super::de;

/// Partial ticker push. Only fields present on the wire overwrite the stored
/// ticker; absent fields are left alone (partial pushes are the norm).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TickerPush {
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub bid: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub ask: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub last: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub high: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub low: Option<f64>,
}

/// Stored ticker. Identity is the market id; `mid` and `spread` are derived
/// from bid/ask on every update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Ticker {
    pub market_id: String,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub last: Option<f64>,
    pub volume: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub spread: Option<f64>,
    pub updated_at: i64,
}

impl Ticker {
    pub fn new(market_id: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            ..Default::default()
        }
    }

    /// Merge a partial push: present fields overwrite, spread is recomputed.
    pub fn merge(&mut self, push: &TickerPush, timestamp: i64) {
        if let Some(v) = push.bid {
            self.bid = Some(v);
        }
        if let Some(v) = push.ask {
            self.ask = Some(v);
        }
        if let Some(v) = push.last {
            self.last = Some(v);
        }
        if let Some(v) = push.volume {
            self.volume = Some(v);
        }
        if let Some(v) = push.high {
            self.high = Some(v);
        }
        if let Some(v) = push.low {
            self.low = Some(v);
        }
        self.spread = match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some(a - b),
            _ => None,
        };
        self.updated_at = timestamp;
    }

    /// Mid price if both sides are known, otherwise the last trade price.
    pub fn mid(&self) -> Option<f64> {
        match (self.bid, self.ask) {
            (Some(b), Some(a)) => Some((b + a) / 2.0),
            _ => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_merge_keeps_absent_fields() {
        let mut ticker = Ticker::new("BTCUSDT");
        ticker.merge(
            &serde_json::from_str(r#"{"bid":"100","ask":101}"#).unwrap(),
            1,
        );
        assert_eq!(ticker.spread, Some(1.0));
        assert_eq!(ticker.mid(), Some(100.5));

        // Bid-only push: ask survives, spread recomputed.
        ticker.merge(&serde_json::from_str(r#"{"bid":100.5}"#).unwrap(), 2);
        assert_eq!(ticker.ask, Some(101.0));
        assert_eq!(ticker.spread, Some(0.5));
        assert_eq!(ticker.updated_at, 2);
    }
}
