// Ledger Reconciliation - Local-Data Server
// Serves the local ledger slice for an inplay upload's date span

use anyhow::{Context, Result};
use ledger_recon::api::{router, AppState};
use ledger_recon::{setup_database, verify_count, Config};
use rusqlite::Connection;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,ledger_recon=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("🌐 Ledger Reconciliation - Local-Data Server");

    let config = Config::from_env()?;

    // Open database
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    setup_database(&conn)?;
    info!(
        path = %config.database_path.display(),
        rows = verify_count(&conn)?,
        "✓ Database opened"
    );

    let app = router(AppState::new(conn));

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;

    info!("🚀 Server running on http://{}", config.bind_address);
    info!("   API: http://{}/api/local-data?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD", config.bind_address);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
