//! Shopfront - order and inventory service

use anyhow::Result;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront::api::{self, AppState};
use shopfront::auth::TokenVerifier;
use shopfront::notify::Notifier;
use shopfront::store::{MemoryStore, PgStore, Store};
use shopfront::{AppConfig, Shop};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| config.log_level.clone().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    tracing::debug!(?config, "configuration loaded");

    let notifier = Notifier::connect(config.nats_url.as_deref(), &config.nats_subject_prefix).await;
    let listener = TcpListener::bind(config.bind_addr).await?;

    match config.database_url.as_deref() {
        Some(url) => {
            let store = PgStore::connect(url, config.db_max_connections).await?;
            store.migrate().await?;
            serve(store, notifier, &config, listener).await
        }
        None => {
            tracing::warn!(env = %config.env, "DATABASE_URL not set; using the in-memory store, data is lost on exit");
            serve(MemoryStore::new(), notifier, &config, listener).await
        }
    }
}

async fn serve<S: Store>(store: S, notifier: Notifier, config: &AppConfig, listener: TcpListener) -> Result<()> {
    let shop = Shop::new(store)
        .with_notifier(notifier)
        .with_pricing(config.pricing)
        .with_company(config.company.clone());
    let app = api::router(AppState::new(shop, TokenVerifier::hs256(&config.jwt_secret)));

    tracing::info!("🚀 Shopfront listening on {}", config.bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
