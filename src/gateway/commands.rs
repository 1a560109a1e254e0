//! Trade mutation commands. Every command validates against current store
//! state, posts to the command endpoints, and mutates nothing locally: the
//! store only changes when the resulting push arrives on the channel.

use crate::error::{ClientError, Result};
use crate::gateway::rest::RestClient;
use crate::services::Store;
use crate::types::{ActiveTrade, Direction, Method, Notice};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Operator inputs for opening a position. Methods come from the market's
/// profiles or direct operator entry.
#[derive(Debug, Clone)]
pub struct TradePlan {
    pub entry: Method,
    pub quantity_rate: f64,
    pub stop_loss: Method,
    pub take_profit: Method,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct OpenTradeRequest<'a> {
    market_id: &'a str,
    direction: Direction,
    entry: Method,
    quantity_rate: f64,
    stop_loss: Method,
    take_profit: Method,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
    request_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct CloseTradeRequest<'a> {
    market_id: &'a str,
    trade_id: i64,
    request_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ModifyTradeRequest<'a> {
    market_id: &'a str,
    trade_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<Method>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_stop_loss: Option<Method>,
    force: bool,
    request_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct InstrumentRequest<'a> {
    market_id: &'a str,
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ChartRequest<'a> {
    market_id: &'a str,
    action: &'a str,
}

/// Refuse to move the stop loss on a position that is flat or under water
/// unless the caller forces it. Keeps a fat-fingered tighten from locking
/// in a loss.
pub fn stop_loss_guard(trade: &ActiveTrade, force: bool) -> Result<()> {
    if trade.profit_loss_pct <= 0.0 && !force {
        return Err(ClientError::LosingPosition {
            market_id: trade.market_id.clone(),
            trade_id: trade.id,
            pnl_pct: trade.profit_loss_pct,
        });
    }
    Ok(())
}

#[derive(Clone)]
pub struct TradeCommander {
    rest: RestClient,
    store: Arc<Store>,
}

impl TradeCommander {
    pub fn new(rest: RestClient, store: Arc<Store>) -> Self {
        Self { rest, store }
    }

    fn require_market(&self, market_id: &str) -> Result<()> {
        if self.store.market(market_id).is_none() {
            return Err(ClientError::UnknownMarket(market_id.to_string()));
        }
        Ok(())
    }

    fn require_trade(&self, market_id: &str, trade_id: i64) -> Result<ActiveTrade> {
        self.store
            .active_trade(market_id, trade_id)
            .ok_or_else(|| ClientError::UnknownTrade {
                market_id: market_id.to_string(),
                trade_id,
            })
    }

    /// Surface a rejection to the render collaborators, one notice per
    /// server message, then hand the error back.
    fn surface(&self, err: ClientError) -> ClientError {
        for message in err.user_messages() {
            self.store.publish_notice(Notice::Error { message });
        }
        err
    }

    pub async fn open_long(&self, market_id: &str, plan: TradePlan) -> Result<()> {
        self.open(market_id, Direction::Long, plan).await
    }

    pub async fn open_short(&self, market_id: &str, plan: TradePlan) -> Result<()> {
        self.open(market_id, Direction::Short, plan).await
    }

    async fn open(&self, market_id: &str, direction: Direction, plan: TradePlan) -> Result<()> {
        self.require_market(market_id)?;
        self.store.register_method(plan.entry);
        self.store.register_method(plan.stop_loss);
        self.store.register_method(plan.take_profit);

        let request = OpenTradeRequest {
            market_id,
            direction,
            entry: plan.entry,
            quantity_rate: plan.quantity_rate,
            stop_loss: plan.stop_loss,
            take_profit: plan.take_profit,
            label: plan.label.as_deref(),
            request_id: Uuid::new_v4(),
        };
        info!(market_id, ?direction, request_id = %request.request_id, "opening trade");
        self.rest
            .post_trade(&request)
            .await
            .map_err(|err| self.surface(err))?;
        Ok(())
    }

    pub async fn close_trade(&self, market_id: &str, trade_id: i64) -> Result<()> {
        self.require_trade(market_id, trade_id)?;
        let request = CloseTradeRequest {
            market_id,
            trade_id,
            request_id: Uuid::new_v4(),
        };
        info!(market_id, trade_id, "closing trade");
        self.rest
            .delete_trade(&request)
            .await
            .map_err(|err| self.surface(err))?;
        Ok(())
    }

    /// Move the stop loss. Losing or flat positions are refused before any
    /// request goes out unless `force` is set; the flag travels with the
    /// request so the server applies the same override.
    pub async fn modify_stop_loss(
        &self,
        market_id: &str,
        trade_id: i64,
        stop_loss: Method,
        force: bool,
    ) -> Result<()> {
        let trade = self.require_trade(market_id, trade_id)?;
        stop_loss_guard(&trade, force)?;
        self.store.register_method(stop_loss);
        self.modify(
            ModifyTradeRequest {
                market_id,
                trade_id,
                stop_loss: Some(stop_loss),
                take_profit: None,
                dynamic_stop_loss: None,
                force,
                request_id: Uuid::new_v4(),
            },
        )
        .await
    }

    pub async fn modify_take_profit(
        &self,
        market_id: &str,
        trade_id: i64,
        take_profit: Method,
    ) -> Result<()> {
        self.require_trade(market_id, trade_id)?;
        self.store.register_method(take_profit);
        self.modify(
            ModifyTradeRequest {
                market_id,
                trade_id,
                stop_loss: None,
                take_profit: Some(take_profit),
                dynamic_stop_loss: None,
                force: false,
                request_id: Uuid::new_v4(),
            },
        )
        .await
    }

    /// Attach a trailing stop. The server recomputes the stop level as
    /// price moves, so there is no guard here.
    pub async fn add_dynamic_stop_loss(
        &self,
        market_id: &str,
        trade_id: i64,
        dynamic_stop_loss: Method,
    ) -> Result<()> {
        self.require_trade(market_id, trade_id)?;
        self.store.register_method(dynamic_stop_loss);
        self.modify(
            ModifyTradeRequest {
                market_id,
                trade_id,
                stop_loss: None,
                take_profit: None,
                dynamic_stop_loss: Some(dynamic_stop_loss),
                force: false,
                request_id: Uuid::new_v4(),
            },
        )
        .await
    }

    async fn modify(&self, request: ModifyTradeRequest<'_>) -> Result<()> {
        debug!(market_id = request.market_id, trade_id = request.trade_id, "modifying trade");
        self.rest
            .post_trade(&request)
            .await
            .map_err(|err| self.surface(err))?;
        Ok(())
    }

    pub async fn set_auto_trading(&self, market_id: &str, enabled: bool) -> Result<()> {
        self.require_market(market_id)?;
        info!(market_id, enabled, "toggling auto trading");
        self.rest
            .post_instrument(&InstrumentRequest { market_id, enabled })
            .await
            .map_err(|err| self.surface(err))?;
        Ok(())
    }

    pub async fn subscribe_chart(&self, market_id: &str) -> Result<()> {
        self.chart(market_id, "subscribe").await
    }

    pub async fn unsubscribe_chart(&self, market_id: &str) -> Result<()> {
        self.chart(market_id, "unsubscribe").await
    }

    async fn chart(&self, market_id: &str, action: &str) -> Result<()> {
        self.require_market(market_id)?;
        debug!(market_id, action, "chart subscription change");
        self.rest
            .post_chart(&ChartRequest { market_id, action })
            .await
            .map_err(|err| self.surface(err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TradePush;

    fn trade(pnl_pct: f64) -> ActiveTrade {
        let push: TradePush = serde_json::from_str(r#"{"id":1,"direction":"long"}"#).unwrap();
        let mut trade = ActiveTrade::from_push("BTCUSDT", &push, 0);
        trade.profit_loss_pct = pnl_pct;
        trade
    }

    #[test]
    fn test_guard_refuses_losing_position() {
        let err = stop_loss_guard(&trade(-1.2), false).unwrap_err();
        match err {
            ClientError::LosingPosition { pnl_pct, .. } => assert_eq!(pnl_pct, -1.2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_guard_refuses_flat_position() {
        assert!(stop_loss_guard(&trade(0.0), false).is_err());
    }

    #[test]
    fn test_guard_allows_winning_or_forced() {
        assert!(stop_loss_guard(&trade(0.7), false).is_ok());
        assert!(stop_loss_guard(&trade(-3.5), true).is_ok());
    }
}
