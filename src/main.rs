use std::sync::{Arc, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wraith::gateway::{Credentials, PushChannel, RestClient, Session};
use wraith::services::Store;
use wraith::types::Notice;
use wraith::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wraith=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!("Starting Wraith against {}", config.api_url());

    let credentials = Credentials::from_config(&config)
        .ok_or_else(|| anyhow::anyhow!("no credentials configured: set WRAITH_API_KEY or WRAITH_IDENTIFIER/WRAITH_PASSWORD"))?;

    let session = Arc::new(RwLock::new(Session::new()));
    let store = Store::new();
    let rest = RestClient::new(config.api_url(), Arc::clone(&session));

    if let Err(err) = rest.authenticate(&credentials).await {
        error!(error = %err, "authentication failed");
        anyhow::bail!("authentication failed: {err}");
    }

    // Log notices so a headless run still shows errors and lifecycle moves.
    let mut notices = store.subscribe_notices();
    tokio::spawn(async move {
        while let Ok(notice) = notices.recv().await {
            match notice {
                Notice::Error { message } => warn!("server: {message}"),
                Notice::Lifecycle { state } => info!("connection: {state}"),
                other => info!(?other, "notice"),
            }
        }
    });

    // Warn when a backend service stops pinging.
    let stale_secs = config.ping_stale_secs;
    let health_store = store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(10));
        loop {
            interval.tick().await;
            let now = chrono::Utc::now().timestamp();
            for service in ["trader", "watcher", "strategy"] {
                if let Some(health) = health_store.service_health(service) {
                    if health.is_stale(now, stale_secs) {
                        warn!(service, last_ping = health.last_ping, "service ping is stale");
                    }
                }
            }
        }
    });

    let channel = PushChannel::new(config, rest, store);
    channel.run().await?;
    Ok(())
}
