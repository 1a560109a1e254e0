use thiserror::Error;

/// Client error taxonomy. Nothing here is fatal to the process: decode
/// problems are counted and dropped before they become errors, and every
/// variant degrades to a user-visible notification plus unmodified state.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Credentials rejected. No automatic retry; the backoff ladder only
    /// suggests a delay for the next manual attempt.
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// A command the server refused, one message per server-reported error.
    #[error("Command rejected: {}", messages.join("; "))]
    CommandRejected { messages: Vec<String> },

    /// Client-side breakeven guard: stop-loss moves on a losing trade are
    /// blocked unless forced.
    #[error("Trade {market_id}:{trade_id} is at {pnl_pct}%: refusing stop-loss move without force")]
    LosingPosition {
        market_id: String,
        trade_id: i64,
        pnl_pct: f64,
    },

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Unknown market: {0}")]
    UnknownMarket(String),

    #[error("Unknown trade: {market_id}:{trade_id}")]
    UnknownTrade { market_id: String, trade_id: i64 },

    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),
}

impl ClientError {
    /// The individually-surfaceable messages of this error: one per
    /// server-reported message for command rejections, otherwise the error's
    /// own display form.
    pub fn user_messages(&self) -> Vec<String> {
        match self {
            ClientError::CommandRejected { messages } if !messages.is_empty() => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
