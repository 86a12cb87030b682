pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::routing::{get, patch, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/api/admin/sessions", post(handlers::sessions::issue_session))
        .route("/api/session", axum::routing::delete(handlers::sessions::revoke_session))
        .route("/api/me", get(handlers::sessions::me))
        .route(
            "/api/users",
            get(handlers::directory::list_users).post(handlers::directory::create_user),
        )
        .route(
            "/api/users/:id",
            patch(handlers::directory::update_user).delete(handlers::directory::delete_user),
        )
        .route(
            "/api/departments",
            get(handlers::directory::list_departments).post(handlers::directory::create_department),
        )
        .route(
            "/api/departments/:id",
            patch(handlers::directory::update_department)
                .delete(handlers::directory::delete_department),
        )
        .route(
            "/api/patients",
            get(handlers::directory::list_patients).post(handlers::directory::create_patient),
        )
        .route(
            "/api/patients/:id",
            get(handlers::directory::get_patient).patch(handlers::directory::update_patient),
        )
        .route(
            "/api/doctors",
            get(handlers::directory::list_doctors).post(handlers::directory::create_doctor),
        )
        .route("/api/doctors/:id", get(handlers::directory::get_doctor))
        .route("/api/doctors/:id/slots", get(handlers::appointments::doctor_slots))
        .route(
            "/api/doctors/:id/conflict",
            get(handlers::appointments::doctor_conflict),
        )
        .route("/api/staff", post(handlers::directory::create_staff))
        .route(
            "/api/appointments",
            get(handlers::appointments::list_appointments)
                .post(handlers::appointments::create_appointment),
        )
        .route(
            "/api/appointments/:id",
            get(handlers::appointments::get_appointment)
                .patch(handlers::appointments::update_appointment),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(handlers::appointments::cancel_appointment),
        )
        .route("/api/appointments/:id/ics", get(handlers::calendar::download_ics))
        .route(
            "/api/records",
            get(handlers::clinical::list_records).post(handlers::clinical::create_record),
        )
        .route("/api/records/:id", get(handlers::clinical::get_record))
        .route(
            "/api/medications",
            get(handlers::clinical::list_medications).post(handlers::clinical::prescribe),
        )
        .route(
            "/api/medications/:id/status",
            patch(handlers::clinical::update_medication_status),
        )
        .route(
            "/api/lab-results",
            get(handlers::clinical::list_lab_results).post(handlers::clinical::order_lab),
        )
        .route("/api/lab-results/:id", patch(handlers::clinical::update_lab_result))
        .route(
            "/api/messages",
            get(handlers::messages::inbox).post(handlers::messages::send_message),
        )
        .route("/api/messages/sent", get(handlers::messages::sent))
        .route("/api/messages/:id/read", post(handlers::messages::mark_read))
        .route(
            "/api/feedback",
            get(handlers::feedback::list_feedback).post(handlers::feedback::submit_feedback),
        )
        .route(
            "/api/feedback/:id",
            get(handlers::feedback::get_feedback).patch(handlers::feedback::update_feedback),
        )
        .route("/api/reports/dashboard", get(handlers::reports::dashboard))
        .route(
            "/api/reports/appointments",
            get(handlers::reports::appointment_report),
        )
        .route("/api/events", get(handlers::events::invalidation_stream))
        .with_state(state)
}
