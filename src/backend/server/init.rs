/**
 * Server Initialization
 *
 * Builds the application from a validated `AppConfig`.
 *
 * # Initialization Process
 *
 * 1. Load the store (PostgreSQL or in-memory, bounded by `store_timeout`)
 * 2. Create the room bus and the gateway on top of it
 * 3. Create the JWT identity verifier
 * 4. Create the router
 * 5. Spawn the periodic sweep of rooms nobody listens to
 */

use std::sync::Arc;

use axum::Router;

use super::config::{load_store, StartupError};
use super::state::AppState;
use crate::backend::auth::JwtVerifier;
use crate::backend::realtime::{Gateway, LocalRoomBus, RoomBus};
use crate::backend::routes::create_router;
use crate::shared::AppConfig;

/// Create and configure the Axum application
pub async fn create_app(config: AppConfig) -> Result<Router<()>, StartupError> {
    config.validate()?;
    tracing::info!("[Server] Initializing chat gateway");

    let store = load_store(&config).await?;
    let bus: Arc<dyn RoomBus> = Arc::new(LocalRoomBus::new(config.room_channel_capacity));
    let gateway = Arc::new(Gateway::new(store, bus.clone()));
    let verifier = Arc::new(JwtVerifier::new(config.jwt_secret.clone()));

    let cleanup_interval = config.room_cleanup_interval;
    let app_state = AppState::new(gateway, verifier);
    let app = create_router(app_state);

    spawn_room_cleanup(bus, cleanup_interval);
    tracing::info!("[Server] Router configured with periodic room cleanup");

    Ok(app)
}

/// Periodically drop room channels without subscribers
pub fn spawn_room_cleanup(
    bus: Arc<dyn RoomBus>,
    period: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // the first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = bus.cleanup_inactive();
            if removed > 0 {
                tracing::debug!("[Realtime] Cleaned up {} inactive rooms", removed);
            }
        }
    })
}
