use axum::{
    middleware,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::appointments::api as appointments_api;
use crate::auth::{api as auth_api, auth_middleware, JwtHandler};
use crate::db::Database;
use crate::middleware::request_logging;
use crate::patients::api as patients_api;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub jwt: Arc<JwtHandler>,
}

/// Create the API router.
///
/// Only health, login, and patient intake are reachable without a session;
/// everything else sits behind the auth middleware.
pub fn create_router(db: Arc<Database>, jwt: Arc<JwtHandler>) -> Router {
    let state = AppState { db, jwt };

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/login", post(auth_api::login))
        .route("/api/intake", post(patients_api::intake));

    let protected = Router::new()
        .route("/api/auth/logout", post(auth_api::logout))
        .route("/api/auth/me", get(auth_api::me))
        .route(
            "/api/staff",
            get(auth_api::list_staff).post(auth_api::create_staff),
        )
        .route(
            "/api/staff/:id",
            put(auth_api::update_staff).delete(auth_api::delete_staff),
        )
        .route("/api/doctors", get(auth_api::list_doctors))
        .route("/api/patients", get(patients_api::list_patients))
        .route(
            "/api/patients/:id",
            get(patients_api::patient_detail)
                .put(patients_api::edit_patient)
                .delete(patients_api::delete_patient),
        )
        .route(
            "/api/appointments",
            get(appointments_api::manage_appointments).post(appointments_api::add_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(appointments_api::view_appointment)
                .put(appointments_api::edit_appointment)
                .delete(appointments_api::delete_appointment),
        )
        .route(
            "/api/appointments/:id/status",
            post(appointments_api::set_appointment_status),
        )
        .route("/api/dashboard", get(appointments_api::dashboard))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(middleware::from_fn(request_logging))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ===== Route Handlers =====

/// Health check endpoint
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}
