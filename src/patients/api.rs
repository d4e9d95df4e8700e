//! Patient API Endpoints
//! Mission: Public intake plus authenticated patient record management

use crate::api::AppState;
use crate::appointments::models::AppointmentDetail;
use crate::auth::models::CurrentUser;
use crate::db::StoreError;
use crate::patients::models::{Patient, PatientForm};
use crate::policy::{authorize, Action, PolicyError};
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

/// Public patient intake - POST /api/intake
///
/// The one unauthenticated write in the system.
pub async fn intake(
    State(state): State<AppState>,
    Json(form): Json<PatientForm>,
) -> Result<(StatusCode, Json<Patient>), PatientApiError> {
    authorize(None, Action::PatientIntake)?;
    form.validate().map_err(PatientApiError::Validation)?;

    match state.db.insert_patient(&form) {
        Ok(patient) => Ok((StatusCode::CREATED, Json(patient))),
        Err(e) if e.violates("patients.email") => Err(PatientApiError::DuplicateEmail),
        Err(e) => {
            error!("Patient intake failed: {}", e);
            Err(PatientApiError::Internal)
        }
    }
}

/// List patients - GET /api/patients
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<Patient>>, PatientApiError> {
    authorize(Some(&user), Action::ListPatients)?;

    let patients = state.db.list_patients().map_err(|e| {
        error!("Patient listing failed: {}", e);
        PatientApiError::Internal
    })?;
    Ok(Json(patients))
}

/// Patient record with the caller's appointments for them
#[derive(Debug, Serialize)]
pub struct PatientDetailResponse {
    pub patient: Patient,
    pub appointments: Vec<AppointmentDetail>,
}

/// Patient detail - GET /api/patients/:id
pub async fn patient_detail(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<PatientDetailResponse>, PatientApiError> {
    authorize(Some(&user), Action::PatientDetail)?;

    let patient = state
        .db
        .patient_by_id(&patient_id)
        .map_err(|e| {
            error!("Patient lookup failed: {}", e);
            PatientApiError::Internal
        })?
        .ok_or(PatientApiError::NotFound)?;

    let appointments = state
        .db
        .list_appointments_for_account_and_patient(&user.account_id, &patient_id)
        .map_err(|e| {
            error!("Appointment lookup failed: {}", e);
            PatientApiError::Internal
        })?;

    Ok(Json(PatientDetailResponse {
        patient,
        appointments,
    }))
}

/// Edit a patient record - PUT /api/patients/:id
pub async fn edit_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
    Json(form): Json<PatientForm>,
) -> Result<Json<Patient>, PatientApiError> {
    authorize(Some(&user), Action::EditPatient)?;
    form.validate().map_err(PatientApiError::Validation)?;

    match state.db.update_patient(&patient_id, &form) {
        Ok(patient) => Ok(Json(patient)),
        Err(StoreError::NotFound) => Err(PatientApiError::NotFound),
        Err(e) if e.violates("patients.email") => Err(PatientApiError::DuplicateEmail),
        Err(e) => {
            error!("Patient update failed: {}", e);
            Err(PatientApiError::Internal)
        }
    }
}

/// Delete a patient record - DELETE /api/patients/:id
pub async fn delete_patient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(patient_id): Path<Uuid>,
) -> Result<StatusCode, PatientApiError> {
    authorize(Some(&user), Action::DeletePatient)?;

    match state.db.delete_patient(&patient_id) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(StoreError::NotFound) => Err(PatientApiError::NotFound),
        Err(e) => {
            error!("Patient deletion failed: {}", e);
            Err(PatientApiError::Internal)
        }
    }
}

/// Patient API errors
#[derive(Debug)]
pub enum PatientApiError {
    Validation(String),
    DuplicateEmail,
    NotFound,
    Policy(PolicyError),
    Internal,
}

impl From<PolicyError> for PatientApiError {
    fn from(err: PolicyError) -> Self {
        PatientApiError::Policy(err)
    }
}

impl IntoResponse for PatientApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PatientApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            PatientApiError::DuplicateEmail => (
                StatusCode::CONFLICT,
                "A patient with this email already exists".to_string(),
            ),
            PatientApiError::NotFound => {
                (StatusCode::NOT_FOUND, "Patient not found".to_string())
            }
            PatientApiError::Policy(err) => return err.into_response(),
            PatientApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
