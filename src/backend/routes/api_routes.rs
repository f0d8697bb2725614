/**
 * API Routes
 *
 * # Messages
 * - `GET /api/messages/conversations`
 * - `GET /api/messages/conversation/{user_id}`
 *
 * # Groups
 * - `POST /api/groups`, `GET /api/groups`
 * - `GET /api/groups/my-groups`
 * - `GET /api/groups/{id}`, `DELETE /api/groups/{id}`
 * - `GET /api/groups/{id}/members`
 * - `GET /api/groups/{id}/messages`
 *
 * Every route here sits behind `auth_middleware`.
 */

use axum::{
    middleware,
    routing::get,
    Router,
};

use crate::backend::groups::{
    create_group, delete_group, get_group, list_group_members, list_group_messages,
    list_groups, list_my_groups,
};
use crate::backend::messaging::{get_conversation, get_conversations};
use crate::backend::middleware::auth_middleware;
use crate::backend::server::state::AppState;

pub fn configure_api_routes(router: Router<AppState>, app_state: AppState) -> Router<AppState> {
    let api = Router::new()
        .route("/api/messages/conversations", get(get_conversations))
        .route("/api/messages/conversation/{user_id}", get(get_conversation))
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/groups/my-groups", get(list_my_groups))
        .route("/api/groups/{id}", get(get_group).delete(delete_group))
        .route("/api/groups/{id}/members", get(list_group_members))
        .route("/api/groups/{id}/messages", get(list_group_messages))
        .route_layer(middleware::from_fn_with_state(app_state, auth_middleware));

    router.merge(api)
}
