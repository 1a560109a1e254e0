//! Trade records: active set, historical set, and their wire payloads.
//!
//! Active trades arrive as kebab-case push records (`to`/`tu`/`tx` frames)
//! whose numbers may be JSON strings. Historical snapshots use server-compact
//! field names and are translated explicitly; a trade is never mutated after
//! it reaches the historical set.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::de;

/// Trade direction. Unknown wire values decode to `Flat`, which the metrics
/// layer treats as neutral (distances of 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
    #[serde(other)]
    Flat,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Flat
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::Flat => write!(f, "flat"),
        }
    }
}

/// Trade identity: unique within the active set and, separately, within the
/// historical set. A key lives in at most one of the two sets at a time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TradeKey {
    pub market_id: String,
    pub trade_id: i64,
}

impl TradeKey {
    pub fn new(market_id: impl Into<String>, trade_id: i64) -> Self {
        Self {
            market_id: market_id.into(),
            trade_id,
        }
    }
}

impl fmt::Display for TradeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.market_id, self.trade_id)
    }
}

/// Wire record carried by `to`/`tu`/`tx` frames. Everything except the id is
/// optional: update frames are partial and only present fields overwrite.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TradePush {
    pub id: i64,
    #[serde(default)]
    pub direction: Option<Direction>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub order_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub order_quantity: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub entry_quantity: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub exit_quantity: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub avg_entry_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub avg_exit_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub stop_loss_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub take_profit_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub profit_loss_pct: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub profit_loss: Option<f64>,
    /// Per-fill fee entries; stored as a running total.
    #[serde(default)]
    pub fees: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub best_price: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub worst_price: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub timeframe: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
    #[serde(default)]
    pub open_time: Option<i64>,
    #[serde(default)]
    pub close_time: Option<i64>,
}

/// A trade in the live set.
///
/// Identity fields (`market_id`, `id`) are fixed at creation. The distance
/// fields at the bottom are derived and recomputed by the store on every
/// relevant mutation; they are never merged from the wire.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTrade {
    pub market_id: String,
    pub id: i64,
    pub direction: Direction,
    pub created_at: i64,
    pub order_price: f64,
    pub order_quantity: f64,
    pub entry_quantity: f64,
    pub exit_quantity: f64,
    pub avg_entry_price: Option<f64>,
    pub avg_exit_price: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub profit_loss_pct: f64,
    pub profit_loss: f64,
    pub fees: f64,
    pub best_price: Option<f64>,
    pub worst_price: Option<f64>,
    pub label: Option<String>,
    pub timeframe: Option<String>,
    pub context: Option<String>,
    pub open_time: Option<i64>,
    pub close_time: Option<i64>,
    /// Distance from reference price to stop-loss, recomputed, never cached.
    pub stop_distance_pct: Option<f64>,
    /// Distance from reference price to take-profit, recomputed, never cached.
    pub take_profit_distance_pct: Option<f64>,
    /// Unrealized PnL mapped onto [-1, 1]; drives display color intensity.
    pub pnl_distance: f64,
}

impl ActiveTrade {
    /// Build from an `to` frame (or an active-trade snapshot row).
    pub fn from_push(market_id: &str, push: &TradePush, received_at: i64) -> Self {
        let mut trade = Self {
            market_id: market_id.to_string(),
            id: push.id,
            direction: push.direction.unwrap_or_default(),
            created_at: received_at,
            order_price: push.order_price.unwrap_or(0.0),
            order_quantity: push.order_quantity.unwrap_or(0.0),
            entry_quantity: 0.0,
            exit_quantity: 0.0,
            avg_entry_price: None,
            avg_exit_price: None,
            stop_loss_price: None,
            take_profit_price: None,
            profit_loss_pct: 0.0,
            profit_loss: 0.0,
            fees: 0.0,
            best_price: None,
            worst_price: None,
            label: None,
            timeframe: None,
            context: None,
            open_time: None,
            close_time: None,
            stop_distance_pct: None,
            take_profit_distance_pct: None,
            pnl_distance: 0.0,
        };
        trade.merge_push(push);
        trade
    }

    /// Overwrite mutable fields that are present in the push. Identity fields
    /// and derived fields are untouched. The fill never exceeds the order.
    pub fn merge_push(&mut self, push: &TradePush) {
        if let Some(d) = push.direction {
            self.direction = d;
        }
        if let Some(v) = push.order_price {
            self.order_price = v;
        }
        if let Some(v) = push.order_quantity {
            self.order_quantity = v;
        }
        if let Some(v) = push.entry_quantity {
            self.entry_quantity = v.min(self.order_quantity);
        }
        if let Some(v) = push.exit_quantity {
            self.exit_quantity = v.min(self.order_quantity);
        }
        if let Some(v) = push.avg_entry_price {
            self.avg_entry_price = Some(v);
        }
        if let Some(v) = push.avg_exit_price {
            self.avg_exit_price = Some(v);
        }
        if let Some(v) = push.stop_loss_price {
            self.stop_loss_price = Some(v);
        }
        if let Some(v) = push.take_profit_price {
            self.take_profit_price = Some(v);
        }
        if let Some(v) = push.profit_loss_pct {
            self.profit_loss_pct = v;
        }
        if let Some(v) = push.profit_loss {
            self.profit_loss = v;
        }
        if let Some(ref entries) = push.fees {
            self.fees = crate::services::metrics::total_fees(entries);
        }
        if let Some(v) = push.best_price {
            self.best_price = Some(v);
        }
        if let Some(v) = push.worst_price {
            self.worst_price = Some(v);
        }
        if let Some(ref v) = push.label {
            self.label = Some(v.clone());
        }
        if let Some(ref v) = push.timeframe {
            self.timeframe = Some(v.clone());
        }
        if let Some(ref v) = push.context {
            self.context = Some(v.clone());
        }
        if let Some(v) = push.open_time {
            self.open_time = Some(v);
        }
        if let Some(v) = push.close_time {
            self.close_time = Some(v);
        }
    }

    /// Track best/worst observed price from a mid-price sample.
    pub fn observe_price(&mut self, price: f64) {
        let better = |current: Option<f64>, candidate: f64, favorable: bool| match current {
            None => Some(candidate),
            Some(p) => Some(if favorable {
                p.max(candidate)
            } else {
                p.min(candidate)
            }),
        };
        match self.direction {
            Direction::Long => {
                self.best_price = better(self.best_price, price, true);
                self.worst_price = better(self.worst_price, price, false);
            }
            Direction::Short => {
                self.best_price = better(self.best_price, price, false);
                self.worst_price = better(self.worst_price, price, true);
            }
            Direction::Flat => {}
        }
    }

    /// Reference price for distance computation: average entry if filled,
    /// otherwise the order price.
    pub fn reference_price(&self) -> f64 {
        self.avg_entry_price.unwrap_or(self.order_price)
    }

    pub fn key(&self) -> TradeKey {
        TradeKey::new(self.market_id.clone(), self.id)
    }
}

/// A fully closed trade: flattened, translated representation, append-only.
#[derive(Debug, Clone, Serialize)]
pub struct HistoricalTrade {
    pub market_id: String,
    pub id: i64,
    pub direction: Direction,
    pub order_price: f64,
    pub order_quantity: f64,
    pub entry_quantity: f64,
    pub exit_quantity: f64,
    pub avg_entry_price: f64,
    pub avg_exit_price: f64,
    pub stop_loss_price: Option<f64>,
    pub take_profit_price: Option<f64>,
    pub profit_loss_pct: f64,
    pub profit_loss: f64,
    pub fees: f64,
    pub label: Option<String>,
    pub timeframe: Option<String>,
    pub open_time: Option<i64>,
    pub close_time: Option<i64>,
}

impl HistoricalTrade {
    /// Translate the finalized record carried by a `tx` frame. The server's
    /// final fields win over whatever the active record held.
    pub fn from_final(market_id: &str, push: &TradePush) -> Self {
        Self {
            market_id: market_id.to_string(),
            id: push.id,
            direction: push.direction.unwrap_or_default(),
            order_price: push.order_price.unwrap_or(0.0),
            order_quantity: push.order_quantity.unwrap_or(0.0),
            entry_quantity: push.entry_quantity.unwrap_or(0.0),
            exit_quantity: push.exit_quantity.unwrap_or(0.0),
            avg_entry_price: push.avg_entry_price.unwrap_or(0.0),
            avg_exit_price: push.avg_exit_price.unwrap_or(0.0),
            stop_loss_price: push.stop_loss_price,
            take_profit_price: push.take_profit_price,
            profit_loss_pct: push.profit_loss_pct.unwrap_or(0.0),
            profit_loss: push.profit_loss.unwrap_or(0.0),
            fees: push
                .fees
                .as_deref()
                .map(crate::services::metrics::total_fees)
                .unwrap_or(0.0),
            label: push.label.clone(),
            timeframe: push.timeframe.clone(),
            open_time: push.open_time,
            close_time: push.close_time,
        }
    }

    pub fn key(&self) -> TradeKey {
        TradeKey::new(self.market_id.clone(), self.id)
    }
}

/// One row of the active-trades snapshot (`GET strategy/trade`): a market id
/// plus the same record shape the push channel carries.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TradeSnapshot {
    pub market_id: String,
    #[serde(flatten)]
    pub trade: TradePush,
}

/// Server-compact row from `GET strategy/historical`. Field names are
/// abbreviated on the wire and translated into [`HistoricalTrade`].
#[derive(Debug, Clone, Deserialize)]
pub struct CompactTrade {
    /// Market id.
    pub m: String,
    /// Trade id.
    pub i: i64,
    /// Direction: 1 long, -1 short, anything else flat.
    #[serde(default)]
    pub d: i8,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub op: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub oq: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub eq: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub xq: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub ep: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub xp: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub sl: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub tp: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub pl: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub plc: Option<f64>,
    #[serde(default, deserialize_with = "de::opt_f64_flexible")]
    pub fe: Option<f64>,
    #[serde(default)]
    pub lb: Option<String>,
    #[serde(default)]
    pub tf: Option<String>,
    #[serde(default)]
    pub ot: Option<i64>,
    #[serde(default)]
    pub ct: Option<i64>,
}

impl From<CompactTrade> for HistoricalTrade {
    fn from(row: CompactTrade) -> Self {
        Self {
            market_id: row.m,
            id: row.i,
            direction: match row.d {
                1 => Direction::Long,
                -1 => Direction::Short,
                _ => Direction::Flat,
            },
            order_price: row.op.unwrap_or(0.0),
            order_quantity: row.oq.unwrap_or(0.0),
            entry_quantity: row.eq.unwrap_or(0.0),
            exit_quantity: row.xq.unwrap_or(0.0),
            avg_entry_price: row.ep.unwrap_or(0.0),
            avg_exit_price: row.xp.unwrap_or(0.0),
            stop_loss_price: row.sl,
            take_profit_price: row.tp,
            profit_loss_pct: row.pl.unwrap_or(0.0),
            profit_loss: row.plc.unwrap_or(0.0),
            fees: row.fe.unwrap_or(0.0),
            label: row.lb,
            timeframe: row.tf,
            open_time: row.ot,
            close_time: row.ct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_push() -> TradePush {
        serde_json::from_str(
            r#"{"id":1,"direction":"long","order-price":"100","order-quantity":2,
                "stop-loss-price":99,"take-profit-price":102}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_from_push_coerces_string_numbers() {
        let trade = ActiveTrade::from_push("BTCUSDT", &open_push(), 1_700_000_000);
        assert_eq!(trade.key().to_string(), "BTCUSDT:1");
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.order_price, 100.0);
        assert_eq!(trade.stop_loss_price, Some(99.0));
    }

    #[test]
    fn test_merge_preserves_absent_fields_and_clamps_fill() {
        let mut trade = ActiveTrade::from_push("BTCUSDT", &open_push(), 0);
        let update: TradePush = serde_json::from_str(
            r#"{"id":1,"avg-entry-price":101,"entry-quantity":5,"fees":[0.1,0.2]}"#,
        )
        .unwrap();
        trade.merge_push(&update);

        assert_eq!(trade.avg_entry_price, Some(101.0));
        // Fill clamped to the ordered quantity.
        assert_eq!(trade.entry_quantity, 2.0);
        // Untouched by the partial update.
        assert_eq!(trade.stop_loss_price, Some(99.0));
        assert!((trade.fees - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_observe_price_tracks_direction() {
        let mut trade = ActiveTrade::from_push("BTCUSDT", &open_push(), 0);
        trade.observe_price(101.0);
        trade.observe_price(98.0);
        assert_eq!(trade.best_price, Some(101.0));
        assert_eq!(trade.worst_price, Some(98.0));

        trade.direction = Direction::Short;
        trade.observe_price(97.0);
        assert_eq!(trade.best_price, Some(97.0));
    }

    #[test]
    fn test_compact_translation() {
        let row: CompactTrade = serde_json::from_str(
            r#"{"m":"ETHUSDT","i":7,"d":-1,"op":"2000","oq":1,"eq":1,"xq":1,
                "ep":2000,"xp":1990,"pl":0.5,"plc":10,"fe":"1.2","ct":1700000000}"#,
        )
        .unwrap();
        let trade: HistoricalTrade = row.into();
        assert_eq!(trade.key().to_string(), "ETHUSDT:7");
        assert_eq!(trade.direction, Direction::Short);
        assert_eq!(trade.avg_exit_price, 1990.0);
        assert_eq!(trade.fees, 1.2);
    }
}
