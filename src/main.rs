use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use webhook_dashboard::{start_server, Config, PgEventStore};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = Config::from_env()?;
    info!(
        database_url = %config.database_url_masked(),
        server_addr = %config.server_addr,
        max_connections = config.database_max_connections,
        "Configuration loaded"
    );

    let store = PgEventStore::connect(&config.database_url, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    store
        .migrate()
        .await
        .context("Failed to prepare database schema")?;
    info!("Database ready");

    let result = start_server(
        Arc::new(store.clone()),
        config.server_addr,
        config.request_timeout,
    )
    .await;

    store.close().await;
    info!("Database connections closed");

    result.context("HTTP server failed")
}

fn init_tracing() {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,webhook_dashboard=debug,tower_http=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}
