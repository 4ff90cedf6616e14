mod config;
mod error;
mod payload;
mod router;
mod state;
mod store;
mod util;

use dotenvy::dotenv;
use futures::FutureExt;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use std::sync::Arc;

use booru_client::BooruClient;
use booru_core::{CacheStore, Gateway, MemoryStore};

use crate::{config::AppConfig, state::AppState, store::RedisStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // 1. Initialize logger
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env()?
        .add_directive("hyper::proto=info".parse()?)
        .add_directive("hyper::client=info".parse()?)
        .add_directive("reqwest=info".parse()?);
    tracing_subscriber::fmt().with_env_filter(filter).compact().init();

    // 2. Load configuration
    let config = AppConfig::from_env()?;

    // 3. Initialize cache store
    let store: Arc<dyn CacheStore> = match &config.redis_url {
        Some(url) => Arc::new(util::retry(|| RedisStore::connect(url, &config.cache_prefix)).await?),
        None => {
            tracing::warn!("REDIS_URL is not set, caching in memory");
            Arc::new(MemoryStore::new())
        }
    };

    // 4. Initialize upstream client and gateway
    let client = BooruClient::new(config.upstream_timeout)?;
    let gateway = Gateway::new(Arc::new(client), store)
        .with_ttl(config.ttl)
        .with_credentials(config.credentials.clone());

    // 5. Setup state and router
    let app_state = AppState {
        gateway: Arc::new(gateway),
    };
    let app = router::app(app_state);

    // 6. Start server
    tracing::info!("Server starting at {}", config.address);
    axum::Server::bind(&config.address.parse()?)
        .serve(app.into_make_service())
        .with_graceful_shutdown(tokio::signal::ctrl_c().map(|_| ()))
        .await?;
    tracing::info!("Server stopped");
    Ok(())
}
