/**
 * Error Conversion
 *
 * Renders `GatewayError` as an HTTP response or as a socket error frame.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "Group not found",
 *   "status": 404
 * }
 * ```
 *
 * Internal errors are logged here with their cause; the client only sees
 * the generic message.
 */

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
};

use crate::backend::error::types::GatewayError;
use crate::shared::ServerEvent;

impl GatewayError {
    fn log_if_internal(&self) {
        if let GatewayError::Internal(cause) = self {
            tracing::error!("[Gateway] Internal error: {}", cause);
        }
    }

    /// Error frame sent to the originating connection only
    pub fn to_event(&self) -> ServerEvent {
        self.log_if_internal();
        ServerEvent::error(self.message(), self.code())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log_if_internal();
        let status = self.status_code();
        let message = self.message();

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        Response::builder()
            .status(status)
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
    }
}
