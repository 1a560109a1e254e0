//! Push channel: websocket connection, reconnect loop, and the mandatory
//! snapshot re-seed that precedes every read loop.

use crate::config::Config;
use crate::error::{ClientError, Result};
use crate::gateway::rest::RestClient;
use crate::gateway::session::{ConnectionState, Session};
use crate::protocol::Router;
use crate::services::Store;
use crate::types::{Envelope, Notice};
use futures_util::{SinkExt, StreamExt};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

pub struct PushChannel {
    config: Config,
    rest: RestClient,
    router: Router,
    store: Arc<Store>,
    session: Arc<RwLock<Session>>,
}

impl PushChannel {
    pub fn new(config: Config, rest: RestClient, store: Arc<Store>) -> Self {
        let session = rest.session();
        Self {
            config,
            rest,
            router: Router::new(Arc::clone(&store)),
            store,
            session,
        }
    }

    /// Run the channel until the session loses its tokens. Each pass
    /// connects, re-seeds, and reads until the socket drops; the delay
    /// between passes grows with consecutive failures and resets after a
    /// session that got as far as the read loop.
    pub async fn run(&self) -> Result<()> {
        let mut attempt: u32 = 0;
        loop {
            match self.run_once().await {
                Ok(()) => {
                    attempt = 0;
                    info!("push channel closed, reconnecting");
                }
                Err(ClientError::NotAuthenticated) => {
                    return Err(ClientError::NotAuthenticated);
                }
                Err(err) => {
                    warn!(error = %err, "push channel error");
                }
            }

            if let Ok(mut session) = self.session.write() {
                session.mark_channel_closed();
            }
            self.store.publish_notice(Notice::Lifecycle {
                state: ConnectionState::Disconnected.label().to_string(),
            });

            let delay = self.config.reconnect.delay_ms(attempt);
            attempt = attempt.saturating_add(1);
            debug!(delay_ms = delay, "waiting before reconnect");
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// A single connect, re-seed, and read pass. Returns Ok on a clean
    /// close and Err on transport or seeding failure; `run` wraps this in
    /// the reconnect loop.
    pub async fn run_once(&self) -> Result<()> {
        let (ws_token, auth_token) = self
            .session
            .read()
            .ok()
            .and_then(|session| session.channel_tokens())
            .ok_or(ClientError::NotAuthenticated)?;

        let url = channel_url(&self.config.ws_url(), &ws_token, &auth_token);
        let (stream, _) = connect_async(&url).await?;
        debug!("push channel connected");

        // Re-seed before reading a single frame. Pushes that raced the
        // snapshot fetches sit in the socket buffer and replay on top of
        // fresh state, so the store never resumes from a stale baseline.
        self.seed().await?;

        if let Ok(mut session) = self.session.write() {
            session.mark_channel_open();
        }
        self.store.publish_notice(Notice::Lifecycle {
            state: ConnectionState::Connected { channel_open: true }
                .label()
                .to_string(),
        });

        let (mut write, mut read) = stream.split();
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => self.router.dispatch(&envelope),
                    Err(err) => {
                        error!(error = %err, "unparseable frame");
                        self.store.record_decode_error("frame");
                    }
                },
                Ok(Message::Ping(payload)) => {
                    write.send(Message::Pong(payload)).await?;
                }
                Ok(Message::Close(_)) => {
                    debug!("server closed push channel");
                    break;
                }
                Ok(_) => {}
                Err(err) => {
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Wholesale snapshot replacement across every store domain.
    async fn seed(&self) -> Result<()> {
        let markets = self.rest.fetch_markets().await?;
        self.store.seed_markets(markets);

        let trades = self.rest.fetch_active_trades().await?;
        self.store
            .seed_active_trades(trades, chrono::Utc::now().timestamp());

        let historical = self.rest.fetch_historical_trades().await?;
        self.store.seed_historical_trades(historical);

        let balances = self.rest.fetch_balances().await?;
        self.store.seed_balances(balances);

        let regions = self.rest.fetch_regions().await?;
        self.store.seed_regions(
            regions
                .into_iter()
                .map(|row| (row.market_id, row.region))
                .collect(),
        );

        debug!("store re-seeded");
        Ok(())
    }
}

/// Build the channel URL with both tokens percent-encoded as query
/// parameters. Falls back to the bare base if it fails to parse, which
/// the transport will then reject with a useful error.
fn channel_url(base: &str, ws_token: &str, auth_token: &str) -> String {
    match reqwest::Url::parse_with_params(
        base,
        &[("ws-token", ws_token), ("token", auth_token)],
    ) {
        Ok(url) => url.to_string(),
        Err(_) => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_url_encodes_token_delimiters() {
        let url = channel_url("ws://127.0.0.1:8331", "a&b=c#d", "plain");
        assert!(url.contains("ws-token=a%26b%3Dc%23d"));
        assert!(url.contains("token=plain"));
        assert!(!url.contains('#'));
    }

    #[test]
    fn test_channel_url_plain_tokens() {
        let url = channel_url("ws://example.com:9000", "ws123", "auth456");
        assert_eq!(url, "ws://example.com:9000/?ws-token=ws123&token=auth456");
    }
}
