use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{extract_token, validate_jwt, AuthError, Claims, TokenType};
use crate::error::ApiError;
use crate::state::AppState;

/// Roles allowed through the admin gate
pub const ADMIN_ROLES: &[&str] = &["admin", "editor"];

/// Authenticated user context extracted from the access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        ADMIN_ROLES.contains(&self.role.as_str())
    }
}

/// Verify the access token from the bearer header or `jwt_token` cookie.
/// Fails closed with 401 before any handler (and so any query) runs.
pub fn authenticate(headers: &HeaderMap, state: &AppState) -> Result<AuthUser, ApiError> {
    let token = extract_token(headers).ok_or(AuthError::MissingToken)?;
    let claims = validate_jwt(&token, TokenType::Access, &state.config.auth)?;
    Ok(AuthUser::from(claims))
}

/// Gate for `/api/admin/*`: valid access token and an admin role
pub async fn admin_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_user = authenticate(&headers, &state)?;

    if !auth_user.is_admin() {
        tracing::warn!(user_id = auth_user.user_id, role = %auth_user.role, "Admin access denied");
        return Err(ApiError::forbidden("Insufficient permissions"));
    }

    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already verified by the admin gate
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }
        authenticate(&parts.headers, state)
    }
}
