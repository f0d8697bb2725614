/**
 * Router Configuration
 *
 * Combines every route into one Axum router.
 *
 * # Route Order
 *
 * 1. `/messaging` WebSocket upgrade (authenticates itself)
 * 2. `/health`
 * 3. `/api` routes behind the auth middleware
 * 4. JSON 404 fallback
 */

use axum::{routing::get, Json, Router};
use tower_http::trace::TraceLayer;

use crate::backend::error::GatewayError;
use crate::backend::realtime::messaging_socket;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

pub fn create_router(app_state: AppState) -> Router<()> {
    let router = Router::new()
        .route("/messaging", get(messaging_socket))
        .route("/health", get(health));

    let router = configure_api_routes(router, app_state.clone());

    router
        .fallback(|| async { GatewayError::not_found("Route not found") })
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
