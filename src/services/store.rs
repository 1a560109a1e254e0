//! Domain State Store
//!
//! Single mutable resource of the client. Holds markets, trades (active and
//! historical), alerts, signals, regions, tickers, balances and service
//! health, and enforces the identity invariants:
//!
//! - entity keys are unique within their collection
//! - a trade id lives in at most one of the active/historical sets
//! - the historical set is append-only (duplicate insert overwrites, never
//!   duplicates)
//! - derived trade distances are recomputed on every mutation, never cached
//!
//! Every mutation entry point is synchronous and total: malformed input is a
//! no-op plus a recorded decode error, never a fault. External collaborators
//! read through the getters and the notice broadcast; they never mutate.

use crate::services::metrics;
use crate::types::{
    ActiveTrade, Alert, AlertPush, Balance, BalancePush, EventKey, HistoricalTrade, Market,
    Method, Notice,
    Region, RegionPush, ServiceHealth, SignalEvent, SignalPush, Ticker, TickerPush, TradeKey,
    TradePush, TradeSnapshot,
};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// In-memory domain store. Cheap to share via `Arc`.
pub struct Store {
    markets: DashMap<String, Market>,
    /// Method registry: each method registered once by its key string.
    methods: DashMap<String, Method>,
    active_trades: DashMap<TradeKey, ActiveTrade>,
    historical_trades: DashMap<TradeKey, HistoricalTrade>,
    alerts: DashMap<EventKey, Alert>,
    signals: DashMap<EventKey, SignalEvent>,
    regions: DashMap<EventKey, Region>,
    tickers: DashMap<String, Ticker>,
    balances: DashMap<String, Balance>,
    health: DashMap<String, ServiceHealth>,
    decode_errors: AtomicU64,
    notice_tx: broadcast::Sender<Notice>,
}

impl Store {
    pub fn new() -> Arc<Self> {
        let (notice_tx, _) = broadcast::channel(1024);
        Arc::new(Self {
            markets: DashMap::new(),
            methods: DashMap::new(),
            active_trades: DashMap::new(),
            historical_trades: DashMap::new(),
            alerts: DashMap::new(),
            signals: DashMap::new(),
            regions: DashMap::new(),
            tickers: DashMap::new(),
            balances: DashMap::new(),
            health: DashMap::new(),
            decode_errors: AtomicU64::new(0),
            notice_tx,
        })
    }

    // ==========================================================================
    // Trades
    // ==========================================================================

    /// Insert or update an active trade from a push record. Inserting a key
    /// that already reached the historical set is a no-op: late open/update
    /// frames for a closed trade never resurrect it.
    pub fn upsert_active_trade(&self, market_id: &str, push: &TradePush, timestamp: i64) {
        if market_id.is_empty() {
            self.record_decode_error("trade push without market scope");
            return;
        }
        let key = TradeKey::new(market_id, push.id);
        if self.historical_trades.contains_key(&key) {
            debug!("Dropping trade push for closed trade {}", key);
            return;
        }

        let mut entry = self
            .active_trades
            .entry(key)
            .or_insert_with(|| ActiveTrade::from_push(market_id, push, timestamp));
        entry.merge_push(push);
        let current = self.tickers.get(market_id).and_then(|t| t.mid());
        Self::recompute_trade(entry.value_mut(), current);
    }

    /// Remove a trade from the active set (no-op if absent) and insert the
    /// translated final record into the historical set, keyed by the final
    /// identity the server reports. A duplicate key overwrites.
    pub fn move_to_historical(&self, market_id: &str, trade_id: i64, final_push: &TradePush) {
        if market_id.is_empty() {
            self.record_decode_error("trade close without market scope");
            return;
        }
        self.active_trades
            .remove(&TradeKey::new(market_id, trade_id));

        let finalized = HistoricalTrade::from_final(market_id, final_push);
        let key = finalized.key();
        if self.historical_trades.insert(key.clone(), finalized).is_some() {
            debug!("Historical trade {} overwritten by duplicate close", key);
        }
    }

    /// Record an already-closed trade pushed in the compact historical shape
    /// (`th` frames). Evicts any active entry with the same key first, so an
    /// id never lives in both sets.
    pub fn record_historical_trade(&self, trade: HistoricalTrade) {
        self.active_trades.remove(&trade.key());
        self.historical_trades.insert(trade.key(), trade);
    }

    /// Recompute a trade's derived distances from the current market price.
    /// `current` falls back to the trade's own reference price.
    fn recompute_trade(trade: &mut ActiveTrade, current: Option<f64>) {
        let entry_price = trade.reference_price();
        let current = current.unwrap_or(entry_price);

        trade.stop_distance_pct = trade
            .stop_loss_price
            .map(|sl| metrics::price_distance_pct(current, sl, trade.direction));
        trade.take_profit_distance_pct = trade
            .take_profit_price
            .map(|tp| metrics::price_distance_pct(current, tp, trade.direction));

        let sl_rate = trade
            .stop_loss_price
            .map(|sl| metrics::signed_move_pct(entry_price, sl, trade.direction))
            .unwrap_or(0.0);
        let tp_rate = trade
            .take_profit_price
            .map(|tp| metrics::signed_move_pct(entry_price, tp, trade.direction))
            .unwrap_or(0.0);
        trade.pnl_distance = metrics::normalize_pnl_rate(trade.profit_loss_pct, sl_rate, tp_rate);
    }

    // ==========================================================================
    // Tickers & balances
    // ==========================================================================

    /// Merge a partial ticker push: present fields overwrite, spread is
    /// recomputed, and the market's bid/ask plus every active trade on the
    /// market are refreshed.
    pub fn upsert_ticker(&self, market_id: &str, push: &TickerPush, timestamp: i64) {
        if market_id.is_empty() {
            self.record_decode_error("ticker push without market scope");
            return;
        }
        let mid = {
            let mut ticker = self
                .tickers
                .entry(market_id.to_string())
                .or_insert_with(|| Ticker::new(market_id));
            ticker.merge(push, timestamp);
            ticker.mid()
        };

        if let Some(mut market) = self.markets.get_mut(market_id) {
            if let Some(bid) = push.bid {
                market.bid = Some(bid);
            }
            if let Some(ask) = push.ask {
                market.ask = Some(ask);
            }
        }

        for mut entry in self
            .active_trades
            .iter_mut()
            .filter(|t| t.market_id == market_id)
        {
            if let Some(price) = mid {
                entry.observe_price(price);
            }
            Self::recompute_trade(entry.value_mut(), mid);
        }
    }

    /// Merge a partial balance push, keyed by asset symbol: present fields
    /// overwrite, absent fields keep their stored value.
    pub fn upsert_balance(&self, push: &BalancePush) {
        let mut entry = self
            .balances
            .entry(push.asset.clone())
            .or_insert_with(|| Balance::new(&push.asset));
        entry.merge(push);
    }

    // ==========================================================================
    // Alerts, signals, regions
    // ==========================================================================

    /// Record an alert. Key collision overwrites: alerts are never mutated,
    /// so an identical key means a replayed frame.
    pub fn append_alert(&self, market_id: &str, push: &AlertPush, timestamp: i64) {
        if market_id.is_empty() {
            self.record_decode_error("alert push without market scope");
            return;
        }
        let alert = Alert::from_push(market_id, push, timestamp);
        self.alerts.insert(alert.key(), alert);
    }

    pub fn remove_alert(&self, market_id: &str, id: i64) {
        self.alerts.remove(&EventKey::new(market_id, id));
    }

    /// Record a signal. Signals lacking a stable id key on their timestamp;
    /// a collision overwrites (explicit policy, see DESIGN.md).
    pub fn append_signal(&self, market_id: &str, push: &SignalPush, timestamp: i64) {
        if market_id.is_empty() {
            self.record_decode_error("signal push without market scope");
            return;
        }
        let signal = SignalEvent::from_push(market_id, push, timestamp);
        self.signals.insert(signal.key(), signal);
    }

    pub fn upsert_region(&self, market_id: &str, push: &RegionPush) {
        if market_id.is_empty() {
            self.record_decode_error("region push without market scope");
            return;
        }
        let region = Region::from_push(market_id, push);
        self.regions.insert(region.key(), region);
    }

    pub fn remove_region(&self, market_id: &str, id: i64) {
        self.regions.remove(&EventKey::new(market_id, id));
    }

    // ==========================================================================
    // Service health
    // ==========================================================================

    pub fn record_ping(&self, service: &str, timestamp: i64) {
        let mut entry = self
            .health
            .entry(service.to_string())
            .or_insert_with(|| ServiceHealth::new(service));
        entry.last_ping = timestamp;
    }

    pub fn set_service_connected(&self, service: &str, connected: bool) {
        let mut entry = self
            .health
            .entry(service.to_string())
            .or_insert_with(|| ServiceHealth::new(service));
        entry.connected = connected;
    }

    // ==========================================================================
    // Method registry
    // ==========================================================================

    /// Register a method once by its key; re-registration is a no-op.
    pub fn register_method(&self, method: Method) {
        self.methods.entry(method.key()).or_insert(method);
    }

    // ==========================================================================
    // Seeding (initial fetch and reconnect re-seed)
    // ==========================================================================

    /// Replace the market set wholesale and register every profile method
    /// observed in the snapshot.
    pub fn seed_markets(&self, markets: Vec<Market>) {
        self.markets.clear();
        for market in markets {
            for profile in market.profiles.values() {
                self.register_method(profile.entry);
                self.register_method(profile.stop_loss);
                self.register_method(profile.take_profit);
            }
            self.markets.insert(market.id.clone(), market);
        }
        info!("Seeded {} markets", self.markets.len());
    }

    /// Replace the active set wholesale from a snapshot. Rows whose key is
    /// already historical are skipped, same as incremental upserts.
    pub fn seed_active_trades(&self, rows: Vec<TradeSnapshot>, timestamp: i64) {
        self.active_trades.clear();
        for row in rows {
            self.upsert_active_trade(&row.market_id, &row.trade, timestamp);
        }
        info!("Seeded {} active trades", self.active_trades.len());
    }

    /// Replace the historical set wholesale from translated snapshot rows.
    pub fn seed_historical_trades(&self, trades: Vec<HistoricalTrade>) {
        self.historical_trades.clear();
        for trade in trades {
            self.historical_trades.insert(trade.key(), trade);
        }
        info!("Seeded {} historical trades", self.historical_trades.len());
    }

    pub fn seed_balances(&self, balances: Vec<Balance>) {
        self.balances.clear();
        for balance in balances {
            self.balances.insert(balance.asset.clone(), balance);
        }
        info!("Seeded {} balances", self.balances.len());
    }

    pub fn seed_regions(&self, regions: Vec<(String, RegionPush)>) {
        self.regions.clear();
        for (market_id, push) in regions {
            self.upsert_region(&market_id, &push);
        }
        info!("Seeded {} regions", self.regions.len());
    }

    // ==========================================================================
    // Notices & decode errors
    // ==========================================================================

    /// Subscribe to ephemeral notices (signal alerts, command errors,
    /// lifecycle transitions).
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notice_tx.subscribe()
    }

    /// Publish a notice; dropped silently when nobody listens.
    pub fn publish_notice(&self, notice: Notice) {
        let _ = self.notice_tx.send(notice);
    }

    /// Count a dropped/malformed frame. Never fatal.
    pub fn record_decode_error(&self, context: &str) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
        debug!("Decode error: {}", context);
    }

    pub fn decode_errors(&self) -> u64 {
        self.decode_errors.load(Ordering::Relaxed)
    }

    // ==========================================================================
    // Read access
    // ==========================================================================

    pub fn market(&self, market_id: &str) -> Option<Market> {
        self.markets.get(market_id).map(|m| m.clone())
    }

    pub fn markets(&self) -> Vec<Market> {
        self.markets.iter().map(|m| m.value().clone()).collect()
    }

    pub fn ticker(&self, market_id: &str) -> Option<Ticker> {
        self.tickers.get(market_id).map(|t| t.clone())
    }

    pub fn active_trade(&self, market_id: &str, trade_id: i64) -> Option<ActiveTrade> {
        self.active_trades
            .get(&TradeKey::new(market_id, trade_id))
            .map(|t| t.clone())
    }

    pub fn active_trades(&self) -> Vec<ActiveTrade> {
        self.active_trades
            .iter()
            .map(|t| t.value().clone())
            .collect()
    }

    pub fn historical_trade(&self, market_id: &str, trade_id: i64) -> Option<HistoricalTrade> {
        self.historical_trades
            .get(&TradeKey::new(market_id, trade_id))
            .map(|t| t.clone())
    }

    pub fn historical_trades(&self) -> Vec<HistoricalTrade> {
        self.historical_trades
            .iter()
            .map(|t| t.value().clone())
            .collect()
    }

    pub fn balance(&self, asset: &str) -> Option<Balance> {
        self.balances.get(asset).map(|b| b.clone())
    }

    pub fn balances(&self) -> Vec<Balance> {
        self.balances.iter().map(|b| b.value().clone()).collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.iter().map(|a| a.value().clone()).collect()
    }

    pub fn signals(&self) -> Vec<SignalEvent> {
        self.signals.iter().map(|s| s.value().clone()).collect()
    }

    pub fn regions(&self) -> Vec<Region> {
        self.regions.iter().map(|r| r.value().clone()).collect()
    }

    pub fn service_health(&self, service: &str) -> Option<ServiceHealth> {
        self.health.get(service).map(|h| h.clone())
    }

    pub fn methods(&self) -> Vec<Method> {
        self.methods.iter().map(|m| *m.value()).collect()
    }

    /// Quote string at the market's display precision (default 2).
    pub fn format_price(&self, market_id: &str, price: f64) -> String {
        let decimals = self
            .markets
            .get(market_id)
            .map(|m| m.quote_decimals())
            .unwrap_or(2);
        metrics::format_quote(price, decimals)
    }
}

impl Default for Store {
    fn default() -> Self {
        let (notice_tx, _) = broadcast::channel(1024);
        Self {
            markets: DashMap::new(),
            methods: DashMap::new(),
            active_trades: DashMap::new(),
            historical_trades: DashMap::new(),
            alerts: DashMap::new(),
            signals: DashMap::new(),
            regions: DashMap::new(),
            tickers: DashMap::new(),
            balances: DashMap::new(),
            health: DashMap::new(),
            decode_errors: AtomicU64::new(0),
            notice_tx,
        }
    }
}
