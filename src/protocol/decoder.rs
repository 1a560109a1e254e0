//! Envelope decoder: raw frame payload → typed value.
//!
//! Dispatch is on the type tag alone. The decoder is total: an unknown tag
//! yields [`Decoded::Absent`], a payload that doesn't match its tag's shape
//! yields [`Decoded::Malformed`]. It never returns an error; the router
//! decides what dropping a frame means.
//!
//! Payloads for the currently-used tags are pass-through; the indirection
//! exists so a future tag can gain transformation logic without touching the
//! router.

use crate::types::{
    AlertPush, BalancePush, Bar, CompactTrade, Envelope, GenericSeries, OhlcSeries, RegionPush,
    RemoveRef, ScatterSeries, SignalPush, TickerPush, TradePush, TypeTag,
};
use serde::de::DeserializeOwned;

/// Typed payload of one frame.
#[derive(Debug, Clone)]
pub enum Decoded {
    Bool(bool),
    Int(i64),
    IntList(Vec<i64>),
    Float(f64),
    FloatPair(f64, f64),
    FloatSeries(Vec<f64>),
    FloatBarSeries(Vec<Bar>),
    StringList(Vec<String>),
    TradeOpen(TradePush),
    TradeUpdate(TradePush),
    TradeClose(TradePush),
    HistoricalTrade(CompactTrade),
    Series(GenericSeries),
    ScatterSeries(ScatterSeries),
    OhlcSeries(OhlcSeries),
    Ticker(TickerPush),
    Signal(SignalPush),
    SignalAlert(AlertPush),
    CreateAlert(AlertPush),
    RemoveAlert(RemoveRef),
    SignalRegion(RegionPush),
    CreateRegion(RegionPush),
    RemoveRegion(RemoveRef),
    AccountBalance(BalancePush),
    /// Recognized tag, payload did not match its shape.
    Malformed,
    /// Unrecognized tag. The wire format evolves; this is not an error.
    Absent,
}

fn parse<T: DeserializeOwned>(envelope: &Envelope, wrap: fn(T) -> Decoded) -> Decoded {
    match serde_json::from_value::<T>(envelope.payload.clone()) {
        Ok(value) => wrap(value),
        Err(_) => Decoded::Malformed,
    }
}

/// Decode one frame. Total; see the module docs.
pub fn decode(envelope: &Envelope) -> Decoded {
    match envelope.tag {
        TypeTag::Bool => parse(envelope, Decoded::Bool),
        TypeTag::Int => parse(envelope, Decoded::Int),
        TypeTag::IntList => parse(envelope, Decoded::IntList),
        TypeTag::Float => parse(envelope, Decoded::Float),
        TypeTag::FloatPair => parse(envelope, |pair: [f64; 2]| Decoded::FloatPair(pair[0], pair[1])),
        TypeTag::FloatSeries => parse(envelope, Decoded::FloatSeries),
        TypeTag::FloatBarSeries => parse(envelope, Decoded::FloatBarSeries),
        TypeTag::StringList => parse(envelope, Decoded::StringList),
        TypeTag::TradeOpen => parse(envelope, Decoded::TradeOpen),
        TypeTag::TradeUpdate => parse(envelope, Decoded::TradeUpdate),
        TypeTag::TradeClose => parse(envelope, Decoded::TradeClose),
        TypeTag::HistoricalTrade => parse(envelope, Decoded::HistoricalTrade),
        TypeTag::Series => parse(envelope, Decoded::Series),
        TypeTag::ScatterSeries => parse(envelope, Decoded::ScatterSeries),
        TypeTag::OhlcSeries => parse(envelope, Decoded::OhlcSeries),
        TypeTag::Ticker => parse(envelope, Decoded::Ticker),
        TypeTag::Signal => parse(envelope, Decoded::Signal),
        TypeTag::SignalAlert => parse(envelope, Decoded::SignalAlert),
        TypeTag::CreateAlert => parse(envelope, Decoded::CreateAlert),
        TypeTag::RemoveAlert => parse(envelope, Decoded::RemoveAlert),
        TypeTag::SignalRegion => parse(envelope, Decoded::SignalRegion),
        TypeTag::CreateRegion => parse(envelope, Decoded::CreateRegion),
        TypeTag::RemoveRegion => parse(envelope, Decoded::RemoveRegion),
        TypeTag::AccountBalance => parse(envelope, Decoded::AccountBalance),
        TypeTag::Unknown => Decoded::Absent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(json: &str) -> Envelope {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_unknown_tag_is_absent() {
        let frame = envelope(r#"{"c":"general","t":"zz","v":{"anything":true}}"#);
        assert!(matches!(decode(&frame), Decoded::Absent));
    }

    #[test]
    fn test_malformed_known_tag() {
        let frame = envelope(r#"{"c":"trader","t":"tk","v":"not-an-object"}"#);
        assert!(matches!(decode(&frame), Decoded::Malformed));

        let frame = envelope(r#"{"c":"strategy-trade","t":"to","v":{"direction":"long"}}"#);
        // Missing required id.
        assert!(matches!(decode(&frame), Decoded::Malformed));
    }

    #[test]
    fn test_scalar_tags() {
        assert!(matches!(
            decode(&envelope(r#"{"c":"general","t":"b","v":true}"#)),
            Decoded::Bool(true)
        ));
        assert!(matches!(
            decode(&envelope(r#"{"c":"general","t":"i","v":42}"#)),
            Decoded::Int(42)
        ));
        match decode(&envelope(r#"{"c":"general","t":"fp","v":[1.5,2.5]}"#)) {
            Decoded::FloatPair(a, b) => {
                assert_eq!(a, 1.5);
                assert_eq!(b, 2.5);
            }
            other => panic!("expected float pair, got {:?}", other),
        }
    }

    #[test]
    fn test_trade_open_payload_passes_through() {
        let frame = envelope(
            r#"{"c":"strategy-trade","t":"to","s":"BTCUSDT",
                "v":{"id":1,"direction":"long","order-price":100,"order-quantity":1}}"#,
        );
        match decode(&frame) {
            Decoded::TradeOpen(push) => {
                assert_eq!(push.id, 1);
                assert_eq!(push.order_price, Some(100.0));
            }
            other => panic!("expected trade open, got {:?}", other),
        }
    }

    #[test]
    fn test_balance_payload() {
        let frame = envelope(
            r#"{"c":"trader","t":"ab","v":{"asset":"USDT","kind":"margin","total":"100","available":90}}"#,
        );
        match decode(&frame) {
            Decoded::AccountBalance(push) => assert_eq!(push.total, Some(100.0)),
            other => panic!("expected balance, got {:?}", other),
        }
    }
}
