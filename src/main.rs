//! Shopfront - catalog, wishlist and ordering backend

use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront::auth::Access;
use shopfront::config::Config;
use shopfront::media::MediaStorage;
use shopfront::messaging::{EventPublisher, NatsPublisher, NoopPublisher};
use shopfront::service::Shop;
use shopfront::store::Repositories;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = Config::from_env()?;

    let repos = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Repositories::postgres(db)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, data is kept in memory only");
            Repositories::memory()
        }
    };

    let events: Arc<dyn EventPublisher> = match &config.nats_url {
        Some(url) => match NatsPublisher::connect(url).await {
            Ok(publisher) => Arc::new(publisher),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events are dropped");
                Arc::new(NoopPublisher)
            }
        },
        None => Arc::new(NoopPublisher),
    };

    let shop = Shop::new(repos, MediaStorage::new(&config.media_root), events, Access::new(&config.manager_role));
    if let Some(admin) = &config.admin {
        shop.accounts.ensure_superuser(&admin.username, &admin.password).await?;
    }

    let app = shopfront::http::router(shop, &config);
    tracing::info!("Shopfront listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?, app).await?;
    Ok(())
}
