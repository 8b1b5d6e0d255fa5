use std::sync::Arc;

use axum::{
    Json,
    extract::FromRequestParts,
    http::{HeaderValue, StatusCode, header::AUTHORIZATION, header::WWW_AUTHENTICATE, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::helpers::{TokenValidationError, extract_bearer_token, has_role, validate_token};
use crate::server::AppState;
use crate::types::{Role, User};

const ADMIN_ONLY: &[Role] = &[Role::Admin];
const OWNER_ONLY: &[Role] = &[Role::Owner];

/// Extractor that requires any authenticated account
pub struct RequireAuth(pub User);

/// Extractor that requires an ADMIN account
pub struct RequireAdmin(pub User);

/// Extractor that requires an OWNER account
pub struct RequireOwner(pub User);

#[derive(Debug)]
pub enum AuthError {
    MissingAuth,
    InvalidScheme,
    InvalidToken,
    TokenExpired,
    Forbidden,
    InternalError,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "Authentication required"),
            AuthError::InvalidScheme => (StatusCode::UNAUTHORIZED, "Invalid authorization scheme"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "Token expired"),
            AuthError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to access this resource",
            ),
            AuthError::InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Server error"),
        };

        let mut response = (status, Json(json!({ "message": message }))).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"storerate\""),
            );
        }

        response
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state, &Role::ALL)?;
        Ok(RequireAuth(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireAdmin {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state, ADMIN_ONLY)?;
        Ok(RequireAdmin(user))
    }
}

impl FromRequestParts<Arc<AppState>> for RequireOwner {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let user = authenticate(parts, state, OWNER_ONLY)?;
        Ok(RequireOwner(user))
    }
}

/// Verifies the bearer token, resolves the user and checks the allow-list.
fn authenticate(
    parts: &Parts,
    state: &Arc<AppState>,
    allowed: &[Role],
) -> Result<User, AuthError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let raw_token = extract_bearer_token(auth_header)
        .map_err(AuthError::from)?
        .ok_or(AuthError::MissingAuth)?;

    let user = validate_token(state, &raw_token).map_err(AuthError::from)?;

    if !has_role(&user, allowed) {
        tracing::warn!(
            "{} {} denied to {} ({})",
            parts.method,
            parts.uri.path(),
            user.id,
            user.role
        );
        return Err(AuthError::Forbidden);
    }

    Ok(user)
}

impl From<TokenValidationError> for AuthError {
    fn from(e: TokenValidationError) -> Self {
        match e {
            TokenValidationError::InvalidScheme => AuthError::InvalidScheme,
            TokenValidationError::InvalidToken => AuthError::InvalidToken,
            TokenValidationError::TokenExpired => AuthError::TokenExpired,
            TokenValidationError::InternalError => AuthError::InternalError,
        }
    }
}
