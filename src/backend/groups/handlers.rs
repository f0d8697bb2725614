/**
 * Group HTTP Handlers
 *
 * # Routes
 *
 * - `POST /api/groups` - create a group, caller becomes admin
 * - `GET /api/groups` - every group
 * - `GET /api/groups/my-groups` - groups the caller belongs to
 * - `GET /api/groups/{id}` - one group
 * - `DELETE /api/groups/{id}` - delete (admins only)
 * - `GET /api/groups/{id}/members` - members with profiles
 * - `GET /api/groups/{id}/messages` - history (members only)
 *
 * Joining and leaving happen over the WebSocket so that live
 * subscriptions follow the membership change.
 */

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::backend::error::GatewayError;
use crate::backend::middleware::AuthUser;
use crate::backend::realtime::Gateway;
use crate::shared::messaging::{
    CreateGroupRequest, DeleteGroupResponse, Group, GroupMemberView, GroupMessageView,
};

pub async fn create_group(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
    Json(request): Json<CreateGroupRequest>,
) -> Result<(StatusCode, Json<Group>), GatewayError> {
    let group = gateway.router().create_group(user.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(group)))
}

pub async fn list_groups(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(_user): AuthUser,
) -> Result<Json<Vec<Group>>, GatewayError> {
    Ok(Json(gateway.router().list_groups().await?))
}

pub async fn list_my_groups(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Group>>, GatewayError> {
    Ok(Json(gateway.router().list_my_groups(user.user_id).await?))
}

pub async fn get_group(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(_user): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Group>, GatewayError> {
    Ok(Json(gateway.router().get_group(group_id).await?))
}

pub async fn delete_group(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<DeleteGroupResponse>, GatewayError> {
    gateway.router().delete_group(user.user_id, group_id).await?;
    Ok(Json(DeleteGroupResponse {
        message: "Group deleted successfully".to_string(),
    }))
}

pub async fn list_group_members(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(_user): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<GroupMemberView>>, GatewayError> {
    Ok(Json(gateway.router().list_group_members(group_id).await?))
}

pub async fn list_group_messages(
    State(gateway): State<Arc<Gateway>>,
    AuthUser(user): AuthUser,
    Path(group_id): Path<Uuid>,
) -> Result<Json<Vec<GroupMessageView>>, GatewayError> {
    let messages = gateway
        .router()
        .list_group_messages(user.user_id, group_id)
        .await?;
    Ok(Json(messages))
}
