//! Stream router: one decoded frame in, at most one store mutation out.
//!
//! Frames are dispatched in arrival order and never batched. The routing key
//! is (category, type tag); anything that doesn't match a known combination
//! is dropped: silently for unknown tags (the wire format evolves), with a
//! recorded decode error for malformed payloads of known tags.

use crate::protocol::decoder::{decode, Decoded};
use crate::services::Store;
use crate::types::{Category, Envelope, Notice};
use std::sync::Arc;
use tracing::debug;

/// Routes decoded frames into the domain store.
#[derive(Clone)]
pub struct Router {
    store: Arc<Store>,
}

impl Router {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Process one frame. Total: never panics, never returns an error.
    pub fn dispatch(&self, envelope: &Envelope) {
        let decoded = decode(envelope);
        match decoded {
            Decoded::Malformed => {
                self.store.record_decode_error(&format!(
                    "malformed {:?} payload in {} frame",
                    envelope.tag, envelope.category
                ));
                return;
            }
            Decoded::Absent => {
                debug!("Dropping frame with unrecognized tag in {}", envelope.category);
                return;
            }
            _ => {}
        }

        let scope = envelope.scope_or_empty();
        match envelope.category {
            Category::Trader | Category::Watcher | Category::Strategy => {
                self.handle_service_frame(envelope, decoded, scope);
            }
            Category::StrategyTrade => match decoded {
                Decoded::TradeOpen(push) | Decoded::TradeUpdate(push) => {
                    self.store.upsert_active_trade(scope, &push, envelope.timestamp);
                }
                Decoded::TradeClose(push) => {
                    self.store.move_to_historical(scope, push.id, &push);
                }
                Decoded::HistoricalTrade(row) => {
                    self.store.record_historical_trade(row.into());
                }
                _ => debug!("Dropping unrouted strategy-trade frame"),
            },
            Category::StrategyAlert => match decoded {
                Decoded::SignalAlert(push) => {
                    // Ephemeral: surfaced to the display layer, not stored.
                    self.store.publish_notice(Notice::SignalAlert {
                        market_id: scope.to_string(),
                        alert: push,
                    });
                }
                Decoded::CreateAlert(push) => {
                    self.store.append_alert(scope, &push, envelope.timestamp);
                }
                Decoded::RemoveAlert(reference) => {
                    self.store.remove_alert(scope, reference.id);
                }
                _ => debug!("Dropping unrouted strategy-alert frame"),
            },
            Category::StrategyRegion => match decoded {
                Decoded::CreateRegion(push) => {
                    self.store.upsert_region(scope, &push);
                }
                Decoded::RemoveRegion(reference) => {
                    self.store.remove_region(scope, reference.id);
                }
                Decoded::SignalRegion(push) => {
                    // Placeholder handling: surfaced, store untouched.
                    self.store.publish_notice(Notice::RegionSignal {
                        market_id: scope.to_string(),
                        region: push,
                    });
                }
                _ => debug!("Dropping unrouted strategy-region frame"),
            },
            Category::StrategySignal => match decoded {
                Decoded::Signal(push) => {
                    self.store.append_signal(scope, &push, envelope.timestamp);
                }
                _ => debug!("Dropping unrouted strategy-signal frame"),
            },
            // Chart/info frames are consumed by the display layer directly;
            // general frames carry nothing the store tracks.
            Category::StrategyChart | Category::StrategyInfo | Category::General => {
                debug!("Ignoring {} frame", envelope.category);
            }
            Category::Unknown => {
                debug!("Dropping frame with unknown category");
            }
        }
    }

    /// Liveness/connectivity frames shared by the trader/watcher/strategy
    /// categories, plus the trader-only ticker and balance updates.
    fn handle_service_frame(&self, envelope: &Envelope, decoded: Decoded, scope: &str) {
        match envelope.name.as_deref() {
            Some("ping") => {
                self.store.record_ping(scope, envelope.timestamp);
                return;
            }
            Some("conn") => {
                if let Decoded::Bool(connected) = decoded {
                    self.store.set_service_connected(scope, connected);
                } else {
                    self.store.record_decode_error("conn frame without bool payload");
                }
                return;
            }
            _ => {}
        }

        if envelope.category == Category::Trader {
            match decoded {
                Decoded::Ticker(push) => {
                    self.store.upsert_ticker(scope, &push, envelope.timestamp);
                    return;
                }
                Decoded::AccountBalance(push) => {
                    self.store.upsert_balance(&push);
                    return;
                }
                _ => {}
            }
        }

        debug!(
            "Dropping unrouted {} frame (group {:?}, name {:?})",
            envelope.category, envelope.group, envelope.name
        );
    }
}
