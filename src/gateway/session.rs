//! Session state: credentials, tokens, connection lifecycle, auth backoff.
//!
//! Exactly one session exists per client instance. It is created at startup
//! and cleared on logout or fatal auth failure. Every authenticated request
//! attaches the auth token (bearer) and the session id (header); the push
//! channel additionally needs the channel auth token.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Header carrying the session identifier on every authenticated request.
pub const SESSION_HEADER: &str = "X-Session";

/// Operator credentials. Both kinds resolve to the same token triple.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Credentials {
    ApiKey {
        #[serde(rename = "api-key")]
        api_key: String,
    },
    Password {
        identifier: String,
        password: String,
    },
}

impl Credentials {
    /// Pick credentials from config: API key wins when both are present.
    pub fn from_config(config: &crate::config::Config) -> Option<Self> {
        if let Some(ref key) = config.api_key {
            return Some(Credentials::ApiKey {
                api_key: key.clone(),
            });
        }
        match (&config.identifier, &config.password) {
            (Some(identifier), Some(password)) => Some(Credentials::Password {
                identifier: identifier.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Token triple returned by `POST auth`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AuthResponse {
    pub auth_token: String,
    pub ws_auth_token: String,
    pub session: String,
}

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Authenticating,
    Connected { channel_open: bool },
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Connected { channel_open: true } => "connected",
            ConnectionState::Connected { channel_open: false } => "connected (channel closed)",
        }
    }
}

/// Auth retry delay ladder: 0 → 1s → 5s → 10s → 15s, holding at 15s.
/// Resets to the bottom on successful auth. The ladder only *suggests* a
/// delay; re-submission stays manual.
#[derive(Debug, Clone, Default)]
pub struct BackoffLadder {
    step: usize,
}

const LADDER_MS: [u64; 5] = [0, 1_000, 5_000, 10_000, 15_000];

impl BackoffLadder {
    /// Suggested delay for the next attempt, then advance one rung.
    pub fn advance(&mut self) -> Duration {
        let delay = Duration::from_millis(LADDER_MS[self.step]);
        self.step = (self.step + 1).min(LADDER_MS.len() - 1);
        delay
    }

    /// Suggested delay for the next attempt without advancing.
    pub fn current(&self) -> Duration {
        Duration::from_millis(LADDER_MS[self.step])
    }

    pub fn reset(&mut self) {
        self.step = 0;
    }
}

/// The one mutable session of the client.
#[derive(Debug, Default)]
pub struct Session {
    auth_token: Option<String>,
    ws_auth_token: Option<String>,
    session_id: Option<String>,
    state: Option<ConnectionState>,
    backoff: BackoffLadder,
}

impl Session {
    pub fn new() -> Self {
        Self {
            auth_token: None,
            ws_auth_token: None,
            session_id: None,
            state: Some(ConnectionState::Disconnected),
            backoff: BackoffLadder::default(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.unwrap_or(ConnectionState::Disconnected)
    }

    pub fn begin_auth(&mut self) {
        self.state = Some(ConnectionState::Authenticating);
    }

    /// Apply a successful auth: store tokens, reset the ladder, move to
    /// connected-with-closed-channel.
    pub fn apply_auth(&mut self, response: AuthResponse) {
        self.auth_token = Some(response.auth_token);
        self.ws_auth_token = Some(response.ws_auth_token);
        self.session_id = Some(response.session);
        self.backoff.reset();
        self.state = Some(ConnectionState::Connected {
            channel_open: false,
        });
    }

    /// Record a failed auth: advance the ladder, drop back to disconnected.
    /// Returns the delay suggestion for the next manual attempt.
    pub fn fail_auth(&mut self) -> Duration {
        self.state = Some(ConnectionState::Disconnected);
        self.backoff.advance()
    }

    /// Suggested retry delay without consuming a rung.
    pub fn retry_delay(&self) -> Duration {
        self.backoff.current()
    }

    pub fn mark_channel_open(&mut self) {
        if matches!(self.state(), ConnectionState::Connected { .. }) {
            self.state = Some(ConnectionState::Connected { channel_open: true });
        }
    }

    /// An unexpected channel close always leaves the session disconnected,
    /// never a silent desync.
    pub fn mark_channel_closed(&mut self) {
        self.state = Some(ConnectionState::Disconnected);
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.is_some() && self.session_id.is_some()
    }

    /// (bearer token, session id) for outbound requests.
    pub fn auth_headers(&self) -> Option<(String, String)> {
        match (&self.auth_token, &self.session_id) {
            (Some(token), Some(session)) => Some((token.clone(), session.clone())),
            _ => None,
        }
    }

    /// (channel token, primary token) query parameters for the push channel.
    pub fn channel_tokens(&self) -> Option<(String, String)> {
        match (&self.ws_auth_token, &self.auth_token) {
            (Some(ws), Some(auth)) => Some((ws.clone(), auth.clone())),
            _ => None,
        }
    }

    /// Logout / fatal auth failure: drop tokens and state.
    pub fn clear(&mut self) {
        *self = Session::new();
    }
}
