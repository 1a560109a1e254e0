//! End-to-end routing tests: raw wire frames in, store state out.
//!
//! Frames are built as JSON envelopes exactly as the push channel receives
//! them, so these tests cover the envelope parse, the payload decode, and
//! the store mutation together.

use wraith::protocol::Router;
use wraith::services::Store;
use wraith::types::{Direction, Envelope, Notice};

fn frame(json: &str) -> Envelope {
    serde_json::from_str(json).expect("test frame must parse")
}

fn setup() -> (Router, std::sync::Arc<Store>) {
    let store = Store::new();
    (Router::new(store.clone()), store)
}

// =============================================================================
// Unknown / malformed frames
// =============================================================================

mod tolerance_tests {
    use super::*;

    #[test]
    fn test_unknown_tag_mutates_nothing() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"zz","b":1,"v":{"id":1}}"#,
        ));

        assert!(store.active_trades().is_empty());
        assert!(store.historical_trades().is_empty());
        assert_eq!(store.decode_errors(), 0);
    }

    #[test]
    fn test_unknown_category_mutates_nothing() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"brand-new","s":"BTCUSDT","t":"to","b":1,"v":{"id":1}}"#,
        ));
        assert!(store.active_trades().is_empty());
    }

    #[test]
    fn test_malformed_payload_counts_decode_error() {
        let (router, store) = setup();
        // `to` payload missing the required id.
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1,"v":{"direction":"long"}}"#,
        ));
        assert!(store.active_trades().is_empty());
        assert_eq!(store.decode_errors(), 1);

        // Ticker payload that is not an object.
        router.dispatch(&frame(r#"{"c":"trader","s":"BTCUSDT","t":"tk","b":1,"v":[1,2,3]}"#));
        assert_eq!(store.decode_errors(), 2);
    }

    #[test]
    fn test_market_scoped_frame_without_scope_is_counted() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","t":"to","b":1,"v":{"id":1,"direction":"long"}}"#,
        ));
        assert!(store.active_trades().is_empty());
        assert_eq!(store.decode_errors(), 1);
    }
}

// =============================================================================
// Trade lifecycle
// =============================================================================

mod trade_tests {
    use super::*;

    #[test]
    fn test_open_update_close_lifecycle() {
        let (router, store) = setup();

        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1000,
                "v":{"id":1,"direction":"long","order-price":100.0,"order-quantity":2.0,
                     "stop-loss-price":95.0,"take-profit-price":110.0}}"#,
        ));
        let trade = store.active_trade("BTCUSDT", 1).expect("trade opened");
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.order_price, 100.0);
        assert_eq!(trade.stop_loss_price, Some(95.0));
        // Flat at entry.
        assert_eq!(trade.pnl_distance, 0.0);

        // Partial update: only present fields change.
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"tu","b":1001,
                "v":{"id":1,"entry-quantity":2.0,"avg-entry-price":100.2,
                     "profit-loss-pct":"1.2","fees":[0.05,0.05]}}"#,
        ));
        let trade = store.active_trade("BTCUSDT", 1).unwrap();
        assert_eq!(trade.direction, Direction::Long);
        assert_eq!(trade.order_price, 100.0);
        assert_eq!(trade.entry_quantity, 2.0);
        assert_eq!(trade.avg_entry_price, Some(100.2));
        assert_eq!(trade.profit_loss_pct, 1.2);
        assert_eq!(trade.fees, 0.1);
        // In profit, below take-profit: strictly inside (0, 1).
        assert!(trade.pnl_distance > 0.0 && trade.pnl_distance < 1.0);

        // Close: leaves the active set, enters the historical set once.
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"tx","b":1002,
                "v":{"id":1,"avg-exit-price":102.7,"profit-loss-pct":"2.5","close-time":1002}}"#,
        ));
        assert!(store.active_trade("BTCUSDT", 1).is_none());
        let closed = store.historical_trade("BTCUSDT", 1).expect("trade closed");
        assert_eq!(closed.profit_loss_pct, 2.5);
        assert_eq!(closed.avg_exit_price, 102.7);

        // Late update for the closed id must not resurrect it.
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"tu","b":1003,
                "v":{"id":1,"profit-loss-pct":9.9}}"#,
        ));
        assert!(store.active_trade("BTCUSDT", 1).is_none());
        assert_eq!(store.historical_trade("BTCUSDT", 1).unwrap().profit_loss_pct, 2.5);
        assert_eq!(store.historical_trades().len(), 1);
    }

    #[test]
    fn test_historical_push_evicts_matching_active_entry() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1,
                "v":{"id":4,"direction":"long","order-price":100.0}}"#,
        ));
        // Compact historical row carries its own market id.
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"th","b":2,
                "v":{"m":"BTCUSDT","i":4,"d":1,"ep":100.0,"xp":101.0,"pl":"1.0"}}"#,
        ));
        assert!(store.active_trade("BTCUSDT", 4).is_none());
        assert_eq!(store.historical_trade("BTCUSDT", 4).unwrap().profit_loss_pct, 1.0);
    }

    #[test]
    fn test_same_trade_id_on_two_markets_is_two_trades() {
        let (router, store) = setup();
        for market in ["BTCUSDT", "ETHUSDT"] {
            router.dispatch(&frame(&format!(
                r#"{{"c":"strategy-trade","s":"{market}","t":"to","b":1,
                    "v":{{"id":7,"direction":"short","order-price":10}}}}"#
            )));
        }
        assert_eq!(store.active_trades().len(), 2);
        assert!(store.active_trade("BTCUSDT", 7).is_some());
        assert!(store.active_trade("ETHUSDT", 7).is_some());
    }

    #[test]
    fn test_fill_is_clamped_to_order_quantity() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1,
                "v":{"id":3,"direction":"long","order-quantity":1.0,"entry-quantity":1.5}}"#,
        ));
        assert_eq!(store.active_trade("BTCUSDT", 3).unwrap().entry_quantity, 1.0);
    }
}

// =============================================================================
// Tickers
// =============================================================================

mod ticker_tests {
    use super::*;

    #[test]
    fn test_partial_pushes_merge_field_by_field() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"trader","s":"BTCUSDT","t":"tk","b":10,"v":{"bid":100.0,"ask":101.0}}"#,
        ));
        router.dispatch(&frame(
            r#"{"c":"trader","s":"BTCUSDT","t":"tk","b":11,"v":{"last":"100.6"}}"#,
        ));

        let ticker = store.ticker("BTCUSDT").expect("ticker stored");
        assert_eq!(ticker.bid, Some(100.0));
        assert_eq!(ticker.ask, Some(101.0));
        assert_eq!(ticker.last, Some(100.6));
        assert_eq!(ticker.spread, Some(1.0));
        assert_eq!(ticker.updated_at, 11);
        assert_eq!(ticker.mid(), Some(100.5));
    }

    #[test]
    fn test_ticker_refreshes_trade_distances_and_extremes() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1,
                "v":{"id":1,"direction":"long","order-price":100.0,"order-quantity":1.0,
                     "stop-loss-price":95.0,"take-profit-price":110.0}}"#,
        ));

        router.dispatch(&frame(
            r#"{"c":"trader","s":"BTCUSDT","t":"tk","b":2,"v":{"bid":104.0,"ask":106.0}}"#,
        ));
        let trade = store.active_trade("BTCUSDT", 1).unwrap();
        // Distances come from the mid (105): (105-95)/105 and (105-110)/105.
        let stop = trade.stop_distance_pct.unwrap();
        let take = trade.take_profit_distance_pct.unwrap();
        assert!((stop - 10.0 / 105.0).abs() < 1e-12);
        assert!((take + 5.0 / 105.0).abs() < 1e-12);
        assert_eq!(trade.best_price, Some(105.0));
        assert_eq!(trade.worst_price, Some(105.0));

        // A lower mid moves worst, not best.
        router.dispatch(&frame(
            r#"{"c":"trader","s":"BTCUSDT","t":"tk","b":3,"v":{"bid":98.0,"ask":100.0}}"#,
        ));
        let trade = store.active_trade("BTCUSDT", 1).unwrap();
        assert_eq!(trade.best_price, Some(105.0));
        assert_eq!(trade.worst_price, Some(99.0));
    }

    #[test]
    fn test_ticker_on_other_market_leaves_trades_alone() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-trade","s":"BTCUSDT","t":"to","b":1,
                "v":{"id":1,"direction":"long","order-price":100.0}}"#,
        ));
        router.dispatch(&frame(
            r#"{"c":"trader","s":"ETHUSDT","t":"tk","b":2,"v":{"bid":10.0,"ask":11.0}}"#,
        ));
        let trade = store.active_trade("BTCUSDT", 1).unwrap();
        assert_eq!(trade.best_price, None);
    }
}

// =============================================================================
// Balances
// =============================================================================

mod balance_tests {
    use super::*;

    #[test]
    fn test_balance_pushes_merge_preserving_absent_fields() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"trader","s":"acct","t":"ab","b":1,
                "v":{"asset":"USDT","kind":"margin","total":"1000","available":800,
                     "locked":200,"margin-level":4.2,"unrealized-pnl":-25.5}}"#,
        ));
        let balance = store.balance("USDT").expect("balance stored");
        assert_eq!(balance.total, 1000.0);
        assert_eq!(balance.margin_level, Some(4.2));

        // A partial push for the same asset only touches the fields it
        // carries; everything else keeps its stored value.
        router.dispatch(&frame(
            r#"{"c":"trader","s":"acct","t":"ab","b":2,
                "v":{"asset":"USDT","unrealized-pnl":-30.0}}"#,
        ));
        let balance = store.balance("USDT").unwrap();
        assert_eq!(balance.total, 1000.0);
        assert_eq!(balance.available, 800.0);
        assert_eq!(balance.locked, 200.0);
        assert_eq!(balance.margin_level, Some(4.2));
        assert_eq!(balance.unrealized_pnl, Some(-30.0));
        assert_eq!(store.balances().len(), 1);

        // A push for an unseen asset creates the entry.
        router.dispatch(&frame(
            r#"{"c":"trader","s":"acct","t":"ab","b":3,
                "v":{"asset":"BTC","total":0.5,"available":0.5}}"#,
        ));
        assert_eq!(store.balance("BTC").unwrap().total, 0.5);
        assert_eq!(store.balances().len(), 2);
    }
}

// =============================================================================
// Alerts, signals, regions
// =============================================================================

mod event_tests {
    use super::*;

    #[test]
    fn test_alert_create_and_remove() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy-alert","s":"BTCUSDT","t":"ac","b":5,
                "v":{"id":42,"price":101.5,"direction":"long","message":"breakout"}}"#,
        ));
        assert_eq!(store.alerts().len(), 1);

        router.dispatch(&frame(
            r#"{"c":"strategy-alert","s":"BTCUSDT","t":"ar","b":6,"v":{"id":42}}"#,
        ));
        assert!(store.alerts().is_empty());
    }

    #[test]
    fn test_signal_alert_is_surfaced_not_stored() {
        let (router, store) = setup();
        let mut notices = store.subscribe_notices();
        router.dispatch(&frame(
            r#"{"c":"strategy-alert","s":"BTCUSDT","t":"sa","b":5,
                "v":{"id":1,"price":99.0,"message":"stop hunt"}}"#,
        ));
        assert!(store.alerts().is_empty());
        match notices.try_recv().unwrap() {
            Notice::SignalAlert { market_id, alert } => {
                assert_eq!(market_id, "BTCUSDT");
                assert_eq!(alert.message.as_deref(), Some("stop hunt"));
            }
            other => panic!("unexpected notice: {other:?}"),
        }
    }

    #[test]
    fn test_unstable_signal_ids_key_on_time_and_overwrite() {
        let (router, store) = setup();
        // Two signals with id -1 and the same event time collapse into one.
        for label in ["first", "second"] {
            router.dispatch(&frame(&format!(
                r#"{{"c":"strategy-signal","s":"BTCUSDT","t":"sg","b":500,
                    "v":{{"id":-1,"time":500,"label":"{label}"}}}}"#
            )));
        }
        let signals = store.signals();
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].label.as_deref(), Some("second"));

        // A different event time is a different signal.
        router.dispatch(&frame(
            r#"{"c":"strategy-signal","s":"BTCUSDT","t":"sg","b":501,
                "v":{"id":-1,"time":501,"label":"third"}}"#,
        ));
        assert_eq!(store.signals().len(), 2);
    }

    #[test]
    fn test_region_create_signal_remove() {
        let (router, store) = setup();
        let mut notices = store.subscribe_notices();

        router.dispatch(&frame(
            r#"{"c":"strategy-region","s":"BTCUSDT","t":"rc","b":7,
                "v":{"id":9,"price-from":95.0,"price-to":96.5,"time-from":100,"time-to":200}}"#,
        ));
        assert_eq!(store.regions().len(), 1);

        // Region signal is surfaced to the display layer, store unchanged.
        router.dispatch(&frame(
            r#"{"c":"strategy-region","s":"BTCUSDT","t":"rs","b":8,
                "v":{"id":9,"price-from":95.0,"price-to":96.5}}"#,
        ));
        assert_eq!(store.regions().len(), 1);
        assert!(matches!(
            notices.try_recv().unwrap(),
            Notice::RegionSignal { .. }
        ));

        router.dispatch(&frame(
            r#"{"c":"strategy-region","s":"BTCUSDT","t":"rr","b":9,"v":{"id":9}}"#,
        ));
        assert!(store.regions().is_empty());
    }
}

// =============================================================================
// Service liveness
// =============================================================================

mod liveness_tests {
    use super::*;

    #[test]
    fn test_ping_and_conn_frames_track_health() {
        let (router, store) = setup();
        router.dispatch(&frame(
            r#"{"c":"strategy","s":"strategy","n":"ping","t":"i","b":1234,"v":0}"#,
        ));
        let health = store.service_health("strategy").expect("health entry");
        assert_eq!(health.last_ping, 1234);

        router.dispatch(&frame(
            r#"{"c":"trader","s":"trader","n":"conn","t":"b","b":1235,"v":false}"#,
        ));
        assert!(!store.service_health("trader").unwrap().connected);

        // conn frame whose payload is not a bool is malformed.
        router.dispatch(&frame(
            r#"{"c":"watcher","s":"watcher","n":"conn","t":"b","b":1236,"v":"yes"}"#,
        ));
        assert_eq!(store.decode_errors(), 1);
    }
}
