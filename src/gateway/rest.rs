//! HTTP surface of the gateway: auth, snapshot fetches, and the command
//! endpoints the trade commander posts to.

use crate::error::{ClientError, Result};
use crate::gateway::session::{AuthResponse, Credentials, Session, SESSION_HEADER};
use crate::types::{
    Balance, CompactTrade, HistoricalTrade, Market, RegionSnapshot, TradeSnapshot,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::{debug, warn};

/// Error body the server attaches to rejected requests. Both shapes occur in
/// the wild: a `messages` array or a single `error` string.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    messages: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ApiErrorBody {
    fn into_messages(self) -> Vec<String> {
        if !self.messages.is_empty() {
            self.messages
        } else if let Some(error) = self.error {
            vec![error]
        } else {
            vec!["request rejected".to_string()]
        }
    }
}

/// Thin wrapper over reqwest holding the base URL and shared session.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<RwLock<Session>>,
}

impl RestClient {
    pub fn new(base_url: String, session: Arc<RwLock<Session>>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            session,
        }
    }

    pub fn session(&self) -> Arc<RwLock<Session>> {
        Arc::clone(&self.session)
    }

    /// Exchange credentials for the token triple. On success the session
    /// moves to connected (channel still closed) and the retry ladder
    /// resets; on rejection it drops to disconnected and the ladder
    /// advances.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<()> {
        if let Ok(mut session) = self.session.write() {
            session.begin_auth();
        }

        let url = format!("{}/auth", self.base_url);
        let outcome = async {
            let response = self.http.post(&url).json(credentials).send().await?;
            if response.status().is_success() {
                Ok(response.json::<AuthResponse>().await?)
            } else {
                let status = response.status();
                let detail = match response.json::<ApiErrorBody>().await {
                    Ok(body) => body.into_messages().join("; "),
                    Err(_) => format!("status {status}"),
                };
                Err(ClientError::AuthRejected(detail))
            }
        }
        .await;

        match outcome {
            Ok(tokens) => {
                if let Ok(mut session) = self.session.write() {
                    session.apply_auth(tokens);
                }
                debug!("authenticated");
                Ok(())
            }
            Err(err) => {
                if let Ok(mut session) = self.session.write() {
                    let delay = session.fail_auth();
                    warn!(error = %err, retry_in_ms = delay.as_millis() as u64, "auth failed");
                }
                Err(err)
            }
        }
    }

    fn auth_headers(&self) -> Result<(String, String)> {
        self.session
            .read()
            .ok()
            .and_then(|session| session.auth_headers())
            .ok_or(ClientError::NotAuthenticated)
    }

    async fn authed_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (token, session_id) = self.auth_headers()?;
        let response = self
            .http
            .get(format!("{}/{}", self.base_url, path))
            .bearer_auth(token)
            .header(SESSION_HEADER, session_id)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn authed_send<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let (token, session_id) = self.auth_headers()?;
        let response = self
            .http
            .request(method, format!("{}/{}", self.base_url, path))
            .bearer_auth(token)
            .header(SESSION_HEADER, session_id)
            .json(body)
            .send()
            .await?;
        Self::parse(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json::<T>().await?)
        } else {
            let status = response.status();
            let messages = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.into_messages(),
                Err(_) => vec![format!("request failed with status {status}")],
            };
            Err(ClientError::CommandRejected { messages })
        }
    }

    // --- snapshot fetches -------------------------------------------------

    /// Markets with embedded trade profiles.
    pub async fn fetch_markets(&self) -> Result<Vec<Market>> {
        self.authed_get("strategy").await
    }

    pub async fn fetch_active_trades(&self) -> Result<Vec<TradeSnapshot>> {
        self.authed_get("strategy/trade").await
    }

    /// Historical rows arrive in the compact array-of-records shape and are
    /// widened here so nothing downstream sees the short field names.
    pub async fn fetch_historical_trades(&self) -> Result<Vec<HistoricalTrade>> {
        let rows: Vec<CompactTrade> = self.authed_get("strategy/historical").await?;
        Ok(rows.into_iter().map(HistoricalTrade::from).collect())
    }

    pub async fn fetch_balances(&self) -> Result<Vec<Balance>> {
        self.authed_get("trader").await
    }

    pub async fn fetch_regions(&self) -> Result<Vec<RegionSnapshot>> {
        self.authed_get("strategy/region").await
    }

    // --- command endpoints ------------------------------------------------

    pub async fn post_trade(&self, body: &impl Serialize) -> Result<serde_json::Value> {
        self.authed_send(reqwest::Method::POST, "strategy/trade", body)
            .await
    }

    pub async fn delete_trade(&self, body: &impl Serialize) -> Result<serde_json::Value> {
        self.authed_send(reqwest::Method::DELETE, "strategy/trade", body)
            .await
    }

    pub async fn post_instrument(&self, body: &impl Serialize) -> Result<serde_json::Value> {
        self.authed_send(reqwest::Method::POST, "strategy/instrument", body)
            .await
    }

    pub async fn post_chart(&self, body: &impl Serialize) -> Result<serde_json::Value> {
        self.authed_send(reqwest::Method::POST, "strategy/chart", body)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_body_shapes() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"messages":["too small","bad price"]}"#).unwrap();
        assert_eq!(body.into_messages(), vec!["too small", "bad price"]);

        let body: ApiErrorBody = serde_json::from_str(r#"{"error":"nope"}"#).unwrap();
        assert_eq!(body.into_messages(), vec!["nope"]);

        let body: ApiErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(body.into_messages(), vec!["request rejected"]);
    }

    #[tokio::test]
    async fn test_requests_require_auth() {
        let session = Arc::new(RwLock::new(Session::new()));
        let client = RestClient::new("http://127.0.0.1:9".to_string(), session);
        let err = client.fetch_markets().await.unwrap_err();
        assert!(matches!(err, ClientError::NotAuthenticated));
    }
}
