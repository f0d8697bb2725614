/**
 * Chat Gateway Server Entry Point
 *
 * Loads configuration, installs tracing and serves the gateway.
 */

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    tracing::info!("[Startup] Server initialization started");

    let config = chatgate::shared::AppConfig::from_env().map_err(|e| {
        tracing::error!("[Startup] Invalid configuration: {}", e);
        e
    })?;
    let port = config.server_port;

    let app = chatgate::backend::create_app(config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("[Startup] Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
