//! Appointment API Endpoints
//! Mission: Booking, scoped access, status updates, and the dashboard

use crate::api::AppState;
use crate::appointments::models::{
    Appointment, AppointmentDetail, AppointmentStatus, BookAppointmentRequest,
    StatusUpdateRequest, UpdateAppointmentRequest,
};
use crate::auth::models::{CurrentUser, Role};
use crate::db::StoreError;
use crate::policy::{appointment_scope, authorize, Action, PolicyError};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::error;
use uuid::Uuid;

/// Book an appointment - POST /api/appointments
///
/// The clinician defaults to the caller; whoever ends up on the appointment
/// must resolve to the Doctor role.
pub async fn add_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppointmentApiError> {
    authorize(Some(&user), Action::AddAppointment)?;

    let clinician_id = payload.doctor_id.unwrap_or(user.account_id);
    ensure_doctor(&state, &clinician_id)?;

    // The patient must exist; FK errors should never be the first signal
    state
        .db
        .patient_by_id(&payload.patient_id)
        .map_err(AppointmentApiError::internal)?
        .ok_or(AppointmentApiError::PatientNotFound)?;

    let appointment = state
        .db
        .insert_appointment(&clinician_id, &payload)
        .map_err(AppointmentApiError::internal)?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

/// View an appointment - GET /api/appointments/:id
///
/// Non-admins only see their own; anything else reads as missing.
pub async fn view_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<AppointmentDetail>, AppointmentApiError> {
    authorize(Some(&user), Action::ViewAppointment)?;

    let detail = state
        .db
        .appointment_detail(&appointment_id, appointment_scope(&user))
        .map_err(AppointmentApiError::internal)?
        .ok_or(AppointmentApiError::NotFound)?;

    Ok(Json(detail))
}

/// Edit an appointment - PUT /api/appointments/:id
pub async fn edit_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppointmentApiError> {
    authorize(Some(&user), Action::EditAppointment)?;

    ensure_doctor(&state, &payload.doctor_id)?;
    state
        .db
        .patient_by_id(&payload.patient_id)
        .map_err(AppointmentApiError::internal)?
        .ok_or(AppointmentApiError::PatientNotFound)?;

    match state
        .db
        .update_appointment(&appointment_id, appointment_scope(&user), &payload)
    {
        Ok(appointment) => Ok(Json(appointment)),
        Err(StoreError::NotFound) => Err(AppointmentApiError::NotFound),
        Err(e) => Err(AppointmentApiError::internal(e)),
    }
}

/// Delete an appointment - DELETE /api/appointments/:id
pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(appointment_id): Path<Uuid>,
) -> Result<StatusCode, AppointmentApiError> {
    authorize(Some(&user), Action::DeleteAppointment)?;

    match state
        .db
        .delete_appointment(&appointment_id, appointment_scope(&user))
    {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound) => Err(AppointmentApiError::NotFound),
        Err(e) => Err(AppointmentApiError::internal(e)),
    }
}

/// All appointments, most recent first - GET /api/appointments
pub async fn manage_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<AppointmentDetail>>, AppointmentApiError> {
    authorize(Some(&user), Action::ManageAppointments)?;

    let appointments = state
        .db
        .list_appointments()
        .map_err(AppointmentApiError::internal)?;
    Ok(Json(appointments))
}

/// Status update - POST /api/appointments/:id/status
///
/// JSON contract: `{"success": true}` on success; unknown codes are a
/// client fault rejected before any mutation; store faults are a server
/// fault. Method routing answers anything but POST with 405.
pub async fn set_appointment_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Response {
    if let Err(e) = authorize(Some(&user), Action::SetAppointmentStatus) {
        return e.into_response();
    }

    let Some(status) = AppointmentStatus::from_code(&payload.status) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": "Invalid status" })),
        )
            .into_response();
    };

    match state
        .db
        .set_appointment_status(&appointment_id, appointment_scope(&user), status)
    {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(StoreError::NotFound) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Appointment not found" })),
        )
            .into_response(),
        Err(e) => {
            error!("Status update failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

/// Dashboard payload: role-prefixed display name plus the caller's own
/// appointments, most recent first
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub display_name: String,
    pub role: Role,
    pub appointments: Vec<AppointmentDetail>,
}

/// Dashboard - GET /api/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<DashboardResponse>, AppointmentApiError> {
    authorize(Some(&user), Action::Dashboard)?;

    let appointments = state
        .db
        .list_appointments_for_account(&user.account_id)
        .map_err(AppointmentApiError::internal)?;

    Ok(Json(DashboardResponse {
        display_name: format!("{} {}", user.role.title(), user.name),
        role: user.role,
        appointments,
    }))
}

/// The designated clinician must resolve to Doctor.
fn ensure_doctor(state: &AppState, clinician_id: &Uuid) -> Result<(), AppointmentApiError> {
    let account = state
        .db
        .account_by_id(clinician_id)
        .map_err(AppointmentApiError::internal)?
        .ok_or(AppointmentApiError::InvalidDoctor)?;

    if Role::resolve(&account) != Some(Role::Doctor) {
        return Err(AppointmentApiError::InvalidDoctor);
    }
    Ok(())
}

/// Appointment API errors
#[derive(Debug)]
pub enum AppointmentApiError {
    NotFound,
    PatientNotFound,
    InvalidDoctor,
    Policy(PolicyError),
    Internal,
}

impl AppointmentApiError {
    fn internal(err: StoreError) -> Self {
        error!("Appointment store error: {}", err);
        AppointmentApiError::Internal
    }
}

impl From<PolicyError> for AppointmentApiError {
    fn from(err: PolicyError) -> Self {
        AppointmentApiError::Policy(err)
    }
}

impl IntoResponse for AppointmentApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppointmentApiError::NotFound => {
                (StatusCode::NOT_FOUND, "Appointment not found".to_string())
            }
            AppointmentApiError::PatientNotFound => {
                (StatusCode::NOT_FOUND, "Patient not found".to_string())
            }
            AppointmentApiError::InvalidDoctor => (
                StatusCode::BAD_REQUEST,
                "Selected clinician is not a doctor".to_string(),
            ),
            AppointmentApiError::Policy(err) => return err.into_response(),
            AppointmentApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
