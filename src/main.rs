//! crm-server: REST API for CRM orders
//!
//! Reads configuration from the YAML file named by `CRM_CONFIG` (optional),
//! environment overrides and `.env`. Without a database URL, or when built
//! without the `mysql` feature, orders are kept in memory.

use anyhow::Result;
use crm::config::CrmConfig;
use crm::core::store::OrderStorage;
use crm::server::ServerBuilder;
use crm::storage::InMemoryStorage;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm=info,tower_http=info".into()),
        )
        .init();

    let config_path = std::env::var("CRM_CONFIG").ok();
    let config = CrmConfig::load(config_path.as_deref())?;

    let storage = open_storage(&config).await?;

    ServerBuilder::new()
        .with_shared_storage(storage)
        .with_page_policy(config.access.pages.clone())
        .serve(&config.server.bind)
        .await
}

#[cfg(feature = "mysql")]
async fn open_storage(config: &CrmConfig) -> Result<Arc<dyn OrderStorage>> {
    use crm::storage::mysql::{MysqlStorage, ensure_schema};
    use sqlx::mysql::MySqlPoolOptions;
    use std::time::Duration;

    let Some(url) = config.database.url.as_deref() else {
        tracing::warn!("DATABASE_URL not set, orders are kept in memory");
        return Ok(Arc::new(InMemoryStorage::new()));
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_secs))
        .connect(url)
        .await?;
    ensure_schema(&pool).await?;

    tracing::info!(
        max_connections = config.database.max_connections,
        "connected to MySQL"
    );
    Ok(Arc::new(MysqlStorage::new(pool)))
}

#[cfg(not(feature = "mysql"))]
async fn open_storage(config: &CrmConfig) -> Result<Arc<dyn OrderStorage>> {
    if config.database.url.is_some() {
        tracing::warn!("built without the mysql feature, ignoring DATABASE_URL");
    }
    tracing::warn!("orders are kept in memory");
    Ok(Arc::new(InMemoryStorage::new()))
}
