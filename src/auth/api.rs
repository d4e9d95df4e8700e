//! Authentication API Endpoints
//! Mission: Login, logout, and staff management

use crate::api::AppState;
use crate::auth::models::{
    Account, AccountResponse, CreateStaffRequest, CurrentUser, LoginRequest, LoginResponse, Role,
    UpdateStaffRequest,
};
use crate::auth::store::ProvisionError;
use crate::db::StoreError;
use crate::policy::{authorize, Action, PolicyError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Login endpoint - POST /api/auth/login
///
/// The claimed role must match the role resolved from the account's flags;
/// a mismatch is denied with a message naming the actual role and no session
/// is established.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthApiError> {
    info!("🔐 Login attempt: {}", payload.username);

    let account = state
        .db
        .verify_credentials(&payload.username, &payload.password)
        .map_err(|e| {
            error!("Credential check failed: {}", e);
            AuthApiError::Internal
        })?
        .ok_or_else(|| {
            warn!("❌ Failed login attempt: {}", payload.username);
            AuthApiError::InvalidCredentials
        })?;

    if !account.is_active {
        warn!("❌ Login attempt for inactive account: {}", payload.username);
        return Err(AuthApiError::InvalidCredentials);
    }

    let actual = Role::resolve(&account).ok_or(AuthApiError::NoDashboardRole)?;

    if Role::from_str(&payload.role) != Some(actual) {
        warn!(
            "❌ Role mismatch for {}: claimed {}, actual {}",
            payload.username,
            payload.role,
            actual.as_str()
        );
        return Err(AuthApiError::RoleMismatch { actual });
    }

    let session_id = state.db.create_session(&account.id).map_err(|e| {
        error!("Session creation failed: {}", e);
        AuthApiError::Internal
    })?;

    let (token, expires_in) = state
        .jwt
        .generate_token(&account, &session_id)
        .map_err(|_| AuthApiError::Internal)?;

    info!(
        "✅ Login successful: {} ({})",
        account.username,
        actual.as_str()
    );

    Ok(Json(LoginResponse {
        token,
        expires_in,
        role: actual,
        user: AccountResponse::from_account(&account),
    }))
}

/// Logout endpoint - POST /api/auth/logout
///
/// Revokes the caller's session unconditionally; the token is dead from
/// here on even though it has not expired.
pub async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<StatusCode, AuthApiError> {
    state.db.revoke_session(&user.session_id).map_err(|e| {
        error!("Session revocation failed: {}", e);
        AuthApiError::Internal
    })?;

    info!("👋 Logged out: {}", user.username);
    Ok(StatusCode::NO_CONTENT)
}

/// Current account info - GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<AccountResponse>, AuthApiError> {
    let account = load_account(&state, &user.account_id)?;
    Ok(Json(AccountResponse::from_account(&account)))
}

/// List staff accounts - GET /api/staff
pub async fn list_staff(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<AccountResponse>>, AuthApiError> {
    authorize(Some(&user), Action::ListStaff)?;

    let staff = state.db.list_staff().map_err(|e| {
        error!("Staff listing failed: {}", e);
        AuthApiError::Internal
    })?;

    let response: Vec<AccountResponse> = staff.iter().map(AccountResponse::from_account).collect();
    Ok(Json(response))
}

/// Accounts bookable as the clinician on an appointment - GET /api/doctors
pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<AccountResponse>>, AuthApiError> {
    authorize(Some(&user), Action::ListStaff)?;

    let doctors = state.db.list_doctors().map_err(|e| {
        error!("Doctor listing failed: {}", e);
        AuthApiError::Internal
    })?;

    let response: Vec<AccountResponse> =
        doctors.iter().map(AccountResponse::from_account).collect();
    Ok(Json(response))
}

/// Provision a staff or doctor account - POST /api/staff (Admin only)
pub async fn create_staff(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), AuthApiError> {
    authorize(Some(&user), Action::AddStaff)?;

    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AuthApiError::Validation("Name and email are required"));
    }
    if payload.password.len() < 8 {
        return Err(AuthApiError::Validation(
            "Password must be at least 8 characters",
        ));
    }

    let account = state
        .db
        .provision_account(
            payload.name.trim(),
            payload.email.trim(),
            &payload.password,
            &payload.role,
            payload.specialization.as_deref(),
        )
        .map_err(|e| match e {
            ProvisionError::DuplicateEmail => AuthApiError::DuplicateEmail,
            other => {
                error!("Provisioning failed: {}", other);
                AuthApiError::Internal
            }
        })?;

    Ok((StatusCode::CREATED, Json(AccountResponse::from_account(&account))))
}

/// Edit a staff account - PUT /api/staff/:id (Admin only)
pub async fn update_staff(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(staff_id): Path<Uuid>,
    Json(payload): Json<UpdateStaffRequest>,
) -> Result<Json<AccountResponse>, AuthApiError> {
    authorize(Some(&user), Action::EditStaff)?;

    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AuthApiError::Validation("Name and email are required"));
    }

    let account = state
        .db
        .update_staff(
            &staff_id,
            payload.name.trim(),
            payload.email.trim(),
            &payload.role,
            payload.specialization.as_deref(),
        )
        .map_err(|e| match e {
            ProvisionError::DuplicateEmail => AuthApiError::DuplicateEmail,
            ProvisionError::Store(StoreError::NotFound) => AuthApiError::NotFound,
            other => {
                error!("Staff update failed: {}", other);
                AuthApiError::Internal
            }
        })?;

    Ok(Json(AccountResponse::from_account(&account)))
}

/// Delete a staff account - DELETE /api/staff/:id (Admin only)
pub async fn delete_staff(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(staff_id): Path<Uuid>,
) -> Result<StatusCode, AuthApiError> {
    authorize(Some(&user), Action::DeleteStaff)?;

    if staff_id == user.account_id {
        return Err(AuthApiError::CannotDeleteSelf);
    }

    match state.db.delete_account(&staff_id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound) => Err(AuthApiError::NotFound),
        Err(e) => {
            error!("Staff deletion failed: {}", e);
            Err(AuthApiError::Internal)
        }
    }
}

fn load_account(state: &AppState, id: &Uuid) -> Result<Account, AuthApiError> {
    state
        .db
        .account_by_id(id)
        .map_err(|e| {
            error!("Account lookup failed: {}", e);
            AuthApiError::Internal
        })?
        .ok_or(AuthApiError::NotFound)
}

/// Auth API errors
#[derive(Debug)]
pub enum AuthApiError {
    InvalidCredentials,
    RoleMismatch { actual: Role },
    NoDashboardRole,
    Policy(PolicyError),
    DuplicateEmail,
    Validation(&'static str),
    NotFound,
    CannotDeleteSelf,
    Internal,
}

impl From<PolicyError> for AuthApiError {
    fn from(err: PolicyError) -> Self {
        AuthApiError::Policy(err)
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
            }
            AuthApiError::RoleMismatch { actual } => (
                StatusCode::FORBIDDEN,
                format!(
                    "Invalid role selection. Please login as {}",
                    actual.as_str()
                ),
            ),
            AuthApiError::NoDashboardRole => (
                StatusCode::FORBIDDEN,
                "Account has no dashboard access".to_string(),
            ),
            AuthApiError::Policy(err) => return err.into_response(),
            AuthApiError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "Email already exists. Please use a different email address.".to_string(),
            ),
            AuthApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.to_string()),
            AuthApiError::NotFound => (StatusCode::NOT_FOUND, "Staff member not found".to_string()),
            AuthApiError::CannotDeleteSelf => (
                StatusCode::BAD_REQUEST,
                "Cannot delete your own account".to_string(),
            ),
            AuthApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_mismatch_names_actual_role() {
        let response = AuthApiError::RoleMismatch { actual: Role::Doctor }.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AuthApiError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthApiError::DuplicateEmail.into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthApiError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthApiError::Policy(PolicyError::Forbidden)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }
}
