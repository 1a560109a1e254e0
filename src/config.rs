use std::env;

/// Channel reconnect policy: capped exponential backoff.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// First retry delay in milliseconds.
    pub base_delay_ms: u64,
    /// Delay ceiling in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl ReconnectConfig {
    /// Delay for the given attempt (0-based), doubling up to the cap.
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(1u64 << attempt.min(16))
            .min(self.max_delay_ms)
    }
}

/// Application configuration. Host/ports and credentials come from the
/// environment; everything else has working defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host.
    pub host: String,
    /// Request/response port.
    pub port: u16,
    /// Push-channel port.
    pub ws_port: u16,
    /// Use TLS (https/wss) for both surfaces.
    pub tls: bool,
    /// API-key credential (preferred when present).
    pub api_key: Option<String>,
    /// Identifier/password credential.
    pub identifier: Option<String>,
    pub password: Option<String>,
    /// Staleness threshold for service health display (seconds).
    pub ping_stale_secs: i64,
    /// Channel reconnect policy.
    pub reconnect: ReconnectConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("WRAITH_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("WRAITH_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8330);
        let ws_port: u16 = env::var("WRAITH_WS_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(8331);

        Self {
            host,
            port,
            ws_port,
            tls: env::var("WRAITH_TLS")
                .ok()
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            api_key: env::var("WRAITH_API_KEY").ok(),
            identifier: env::var("WRAITH_IDENTIFIER").ok(),
            password: env::var("WRAITH_PASSWORD").ok(),
            ping_stale_secs: env::var("WRAITH_PING_STALE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            reconnect: ReconnectConfig {
                base_delay_ms: env::var("WRAITH_RECONNECT_BASE_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000),
                max_delay_ms: env::var("WRAITH_RECONNECT_MAX_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30_000),
            },
        }
    }

    /// Base URL of the request/response surface.
    pub fn api_url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}:{}", scheme, self.host, self.port)
    }

    /// Base URL of the push channel.
    pub fn ws_url(&self) -> String {
        let scheme = if self.tls { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.host, self.ws_port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        Config {
            host: "trade.local".to_string(),
            port: 8330,
            ws_port: 8331,
            tls: false,
            api_key: None,
            identifier: Some("operator".to_string()),
            password: Some("secret".to_string()),
            ping_stale_secs: 30,
            reconnect: ReconnectConfig::default(),
        }
    }

    #[test]
    fn test_urls() {
        let mut config = test_config();
        assert_eq!(config.api_url(), "http://trade.local:8330");
        assert_eq!(config.ws_url(), "ws://trade.local:8331");

        config.tls = true;
        assert_eq!(config.api_url(), "https://trade.local:8330");
        assert_eq!(config.ws_url(), "wss://trade.local:8331");
    }

    #[test]
    fn test_reconnect_delay_doubles_to_cap() {
        let reconnect = ReconnectConfig::default();
        assert_eq!(reconnect.delay_ms(0), 1_000);
        assert_eq!(reconnect.delay_ms(1), 2_000);
        assert_eq!(reconnect.delay_ms(4), 16_000);
        assert_eq!(reconnect.delay_ms(5), 30_000);
        assert_eq!(reconnect.delay_ms(60), 30_000);
    }
}
