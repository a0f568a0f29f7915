use bookshelf_api::api::AppState;
use bookshelf_api::config::AppConfig;
use bookshelf_api::storage::JsonlStorage;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("📚 Starting Bookshelf API Server");

    // Load configuration
    let config = AppConfig::load()?;
    info!("📋 Configuration loaded");
    info!("   - Environment: {}", config.server.environment);
    info!("   - Data file: {}", config.storage.data_path.display());

    // Open the book collection
    let storage = Arc::new(JsonlStorage::open(&config.storage.data_path).await?);
    info!("✅ Storage ready ({} books)", storage.count().await);

    let state = AppState {
        storage: storage.clone(),
    };
    let app = bookshelf_api::app(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("📡 Available endpoints:");
    info!("   GET    /health       - Health check");
    info!("   POST   /books        - Add a book");
    info!("   GET    /books        - List books (?name=&reading=&finished=)");
    info!("   GET    /books/{{id}}   - Get a book");
    info!("   PUT    /books/{{id}}   - Update a book");
    info!("   DELETE /books/{{id}}   - Delete a book");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Close the collection
    match storage.flush().await {
        Ok(()) => info!("💾 Collection flushed to {}", storage.path().display()),
        Err(e) => warn!(error = ?e, "⚠️  Failed to flush collection"),
    }

    info!("👋 Server shutting down gracefully");

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, logging which one stopped the server
async fn shutdown_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let received = tokio::select! {
        _ = interrupt => "Ctrl+C",
        _ = terminate => "SIGTERM",
    };

    info!("🛑 {} received, draining connections", received);
}
