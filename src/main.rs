use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use bill_relief::api::{AppState, quiz_routes};
use bill_relief::config::ServerConfig;
use bill_relief::leads::{CompositeSink, WebhookSink};
use bill_relief::quiz::Catalog;
use bill_relief::store::LibSqlStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = ServerConfig::from_env().context("Invalid configuration")?;

    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("Failed to load quiz catalog from {}", path.display()))?,
        None => Catalog::builtin(),
    };
    info!(
        questions = catalog.questions.len(),
        info_pages = catalog.info_pages.len(),
        "Quiz catalog ready"
    );

    // ── Sinks ───────────────────────────────────────────────────────────
    let store = Arc::new(
        LibSqlStore::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    let mut leads = CompositeSink::new().with(store.clone());

    if let Some(url) = config.sheet_url.clone() {
        let webhook = WebhookSink::new(url, config.submit_timeout)
            .context("Failed to set up spreadsheet webhook")?;
        leads = leads.with(Arc::new(webhook));
        info!("Spreadsheet webhook enabled");
    }

    let state = AppState::new(catalog, Arc::new(leads)).with_history(store);

    // Drop abandoned sessions; their progress is already in the store.
    let sessions = state.sessions.clone();
    let idle = config.session_idle_timeout;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(600)); // Every 10 min
        interval.tick().await; // Skip immediate first tick
        loop {
            interval.tick().await;
            sessions.prune_stale(idle).await;
        }
    });

    let app = quiz_routes(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!("Bill Relief quiz v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://{addr}/api/sessions");
    eprintln!("   Database: {}", config.db_path.display());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await
        .context("Server error")?;

    Ok(())
}
