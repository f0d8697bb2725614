/**
 * Authentication Middleware
 *
 * Protects the `/api` routes. Extracts the bearer token from the
 * Authorization header, verifies it through the configured
 * `IdentityVerifier`, checks the user still exists and attaches an
 * `AuthenticatedUser` to the request extensions.
 *
 * Every failure is a 401 rendered by `GatewayError`.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::backend::auth::extract_bearer;
use crate::backend::error::GatewayError;
use crate::backend::server::state::AppState;
use crate::shared::messaging::Role;

/// Authenticated user data extracted from the bearer token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

/// Authentication middleware
///
/// 1. Extracts the token from the Authorization header
/// 2. Verifies it
/// 3. Checks the user is known to the store
/// 4. Attaches the user to the request extensions
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, GatewayError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer)
        .ok_or_else(|| {
            tracing::warn!("[Auth] Missing or malformed Authorization header");
            GatewayError::unauthorized("Missing credential")
        })?;

    let identity = app_state.verifier.verify(token).await?;

    if app_state.store().get_user(identity.user_id).await?.is_none() {
        tracing::warn!("[Auth] User {} not found", identity.user_id);
        return Err(GatewayError::unauthorized("Unknown user"));
    }

    request.extensions_mut().insert(AuthenticatedUser {
        user_id: identity.user_id,
        email: identity.email,
        role: identity.role,
    });

    Ok(next.run(request).await)
}

/// Extract the authenticated user set by the middleware
pub fn extract_authenticated_user(parts: &Parts) -> Result<AuthenticatedUser, GatewayError> {
    parts
        .extensions
        .get::<AuthenticatedUser>()
        .cloned()
        .ok_or_else(|| {
            tracing::warn!("[Auth] AuthenticatedUser not found in request extensions");
            GatewayError::unauthorized("Not authenticated")
        })
}

/// Axum extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct AuthUser(pub AuthenticatedUser);

impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = GatewayError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        extract_authenticated_user(parts).map(AuthUser)
    }
}
