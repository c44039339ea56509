use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use docprompt::{config::Config, routes::create_router, storage::UploadDir, utils::init_logger, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();

    // Load configuration
    let config = Config::from_env()?;
    info!(
        port = config.server.port,
        environment = ?config.server.environment,
        pdf_strategy = ?config.upload.pdf_strategy,
        model = %config.llm.model,
        "Configuration loaded"
    );

    if config.llm.groq_api_key.is_none() {
        warn!("GROQ_API_KEY is not set; /api/process will fail until it is configured");
    }

    // The upload directory must exist before the first request arrives
    let upload_dir = UploadDir::init(&config.upload.dir)
        .await
        .with_context(|| format!("Failed to create upload directory {}", config.upload.dir.display()))?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config, upload_dir)?;
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
