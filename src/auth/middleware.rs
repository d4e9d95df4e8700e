//! Authentication Middleware
//! Mission: Protect API endpoints with JWT and session validation

use crate::api::AppState;
use crate::auth::models::{CurrentUser, Role};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

/// Auth middleware for protected routes.
///
/// Validates the Bearer token, checks that its session is still live, then
/// reloads the account and re-resolves the role from its current flags.
/// The resulting `CurrentUser` goes into request extensions as the explicit
/// caller context for every authorization check downstream.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(AuthError::MissingToken)?;

    let claims = state
        .jwt
        .validate_token(token)
        .map_err(|_| AuthError::InvalidToken)?;

    let session_id = Uuid::parse_str(&claims.sid).map_err(|_| AuthError::InvalidToken)?;
    let account_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

    let active = state
        .db
        .session_active(&session_id)
        .map_err(|_| AuthError::Internal)?;
    if !active {
        return Err(AuthError::SessionRevoked);
    }

    let account = state
        .db
        .account_by_id(&account_id)
        .map_err(|_| AuthError::Internal)?
        .ok_or(AuthError::InvalidToken)?;

    if !account.is_active {
        return Err(AuthError::SessionRevoked);
    }

    let role = Role::resolve(&account).ok_or(AuthError::NoDashboardRole)?;

    req.extensions_mut().insert(CurrentUser {
        account_id,
        username: account.username,
        name: account.name,
        role,
        session_id,
    });

    Ok(next.run(req).await)
}

/// Auth error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    SessionRevoked,
    NoDashboardRole,
    Internal,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authorization token"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid or expired token"),
            AuthError::SessionRevoked => (StatusCode::UNAUTHORIZED, "Session is no longer valid"),
            AuthError::NoDashboardRole => {
                (StatusCode::FORBIDDEN, "Account has no dashboard access")
            }
            AuthError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_responses() {
        let missing = AuthError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let revoked = AuthError::SessionRevoked.into_response();
        assert_eq!(revoked.status(), StatusCode::UNAUTHORIZED);

        let no_role = AuthError::NoDashboardRole.into_response();
        assert_eq!(no_role.status(), StatusCode::FORBIDDEN);
    }
}
