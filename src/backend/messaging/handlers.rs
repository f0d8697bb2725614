//! Messaging HTTP Handlers
//!
//! Read side of direct messaging. Writes go over the WebSocket.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::backend::error::GatewayError;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::Gateway;
use crate::shared::messaging::{ConversationSummary, DirectMessage};

/// `GET /api/messages/conversations`
pub async fn get_conversations(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, GatewayError> {
    let conversations = gateway.router().list_conversations(user.user_id).await?;
    Ok(Json(conversations))
}

/// `GET /api/messages/conversation/{user_id}`
///
/// Also marks the counterpart's messages read.
pub async fn get_conversation(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
    Path(other_user_id): Path<Uuid>,
) -> Result<Json<Vec<DirectMessage>>, GatewayError> {
    let messages = gateway
        .router()
        .list_conversation(user.user_id, other_user_id)
        .await?;
    Ok(Json(messages))
}
