use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use rusqlite::Connection;
use serde_json::{json, Value};
use tower::ServiceExt;

use clinicdesk::config::AppConfig;
use clinicdesk::db;
use clinicdesk::db::queries;
use clinicdesk::models::{NewDoctor, NewPatient, NewUser, Role};
use clinicdesk::services::identity::{DbSessions, IdentityProvider};
use clinicdesk::state::AppState;

// ── Mock Identity ──

struct MockIdentity {
    tokens: HashMap<String, i64>,
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn user_id(&self, token: &str) -> anyhow::Result<Option<i64>> {
        Ok(self.tokens.get(token).copied())
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        session_ttl_hours: 24,
        cors_origin: None,
    }
}

struct Clinic {
    state: Arc<AppState>,
    doctor_id: i64,
    patient_id: i64,
    other_patient_id: i64,
    patient_user: i64,
    doctor_user: i64,
}

fn add_user(conn: &Connection, email: &str, name: &str, role: Role) -> i64 {
    queries::create_user(
        conn,
        &NewUser {
            email: email.to_string(),
            name: name.to_string(),
            role,
            phone: None,
        },
    )
    .unwrap()
}

fn add_patient(conn: &Connection, user_id: i64) -> i64 {
    queries::create_patient(
        conn,
        &NewPatient {
            user_id,
            date_of_birth: None,
            gender: None,
            blood_type: None,
            address: None,
            emergency_contact: None,
            allergies: None,
        },
    )
    .unwrap()
}

/// Seeds one user per role. Tokens are `admin`, `staff`, `doctor`, `patient`, `other`.
fn seed(conn: &Connection) -> (HashMap<String, i64>, i64, i64, i64, i64, i64) {
    let admin = add_user(conn, "admin@clinic.test", "Avery Admin", Role::Admin);
    let staff = add_user(conn, "desk@clinic.test", "Sam Desk", Role::Staff);
    let doctor_user = add_user(conn, "house@clinic.test", "Dr. House", Role::Doctor);
    let doctor_id = queries::create_doctor(
        conn,
        &NewDoctor {
            user_id: doctor_user,
            department_id: None,
            specialization: "Diagnostics".to_string(),
            license_number: None,
            years_of_experience: None,
            bio: None,
        },
    )
    .unwrap();
    let patient_user = add_user(conn, "pat@clinic.test", "Pat Doe", Role::Patient);
    let patient_id = add_patient(conn, patient_user);
    let other_user = add_user(conn, "lee@clinic.test", "Lee Roe", Role::Patient);
    let other_patient_id = add_patient(conn, other_user);

    let tokens = HashMap::from([
        ("admin".to_string(), admin),
        ("staff".to_string(), staff),
        ("doctor".to_string(), doctor_user),
        ("patient".to_string(), patient_user),
        ("other".to_string(), other_user),
    ]);
    (tokens, doctor_id, patient_id, other_patient_id, patient_user, doctor_user)
}

fn test_clinic() -> Clinic {
    let conn = db::init_db(":memory:").unwrap();
    let (tokens, doctor_id, patient_id, other_patient_id, patient_user, doctor_user) = seed(&conn);
    let state = Arc::new(AppState::new(
        Arc::new(Mutex::new(conn)),
        test_config(),
        Box::new(MockIdentity { tokens }),
    ));
    Clinic {
        state,
        doctor_id,
        patient_id,
        other_patient_id,
        patient_user,
        doctor_user,
    }
}

fn test_app(state: Arc<AppState>) -> Router {
    clinicdesk::router(state)
}

async fn call(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let res = test_app(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn call_raw(
    state: &Arc<AppState>,
    method: &str,
    uri: &str,
    token: &str,
    body: &str,
) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let res = test_app(state.clone()).oneshot(request).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn book(clinic: &Clinic, time: &str) -> i64 {
    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, time)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["data"]["id"].as_i64().unwrap()
}

fn booking(patient_id: i64, doctor_id: i64, time: &str) -> Value {
    json!({
        "patient_id": patient_id,
        "doctor_id": doctor_id,
        "date": "2024-06-01",
        "time": time,
        "appointment_type": "consultation",
        "reason": "Persistent cough"
    })
}

// ── Health & Auth ──

#[tokio::test]
async fn test_health() {
    let clinic = test_clinic();
    let (status, json) = call(&clinic.state, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_requires_session() {
    let clinic = test_clinic();

    let (status, json) = call(&clinic.state, "GET", "/api/appointments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "not signed in");

    let (status, _) = call(&clinic.state, "GET", "/api/appointments", Some("nobody"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_me_returns_role_profile() {
    let clinic = test_clinic();
    let (status, json) = call(&clinic.state, "GET", "/api/me", Some("patient"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["user"]["role"], "patient");
    assert_eq!(json["data"]["patient"]["id"], clinic.patient_id);
}

#[tokio::test]
async fn test_issue_session_with_admin_token() {
    let conn = db::init_db(":memory:").unwrap();
    let (_, _, _, _, patient_user, _) = seed(&conn);
    let db = Arc::new(Mutex::new(conn));
    let state = Arc::new(AppState::new(
        db.clone(),
        test_config(),
        Box::new(DbSessions::new(db)),
    ));

    let (status, _) = call(
        &state,
        "POST",
        "/api/admin/sessions",
        Some("wrong-token"),
        Some(json!({ "user_id": patient_user })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, json) = call(
        &state,
        "POST",
        "/api/admin/sessions",
        Some("test-token"),
        Some(json!({ "user_id": patient_user })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let token = json["data"]["token"].as_str().unwrap().to_string();

    let (status, json) = call(&state, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["user"]["id"], patient_user);

    let (status, _) = call(&state, "DELETE", "/api/session", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&state, "GET", "/api/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── Appointments ──

#[tokio::test]
async fn test_book_and_double_book() {
    let clinic = test_clinic();

    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["status"], "scheduled");
    assert_eq!(json["data"]["duration_minutes"], 30);

    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("other"),
        Some(booking(clinic.other_patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_patient_cannot_book_for_another_patient() {
    let clinic = test_clinic();
    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.other_patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_unknown_doctor_is_not_found() {
    let clinic = test_clinic();
    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("staff"),
        Some(booking(clinic.patient_id, 999, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "doctor not found");
}

#[tokio::test]
async fn test_slots_and_conflict_endpoints() {
    let clinic = test_clinic();
    let slots_uri = format!("/api/doctors/{}/slots?date=2024-06-01", clinic.doctor_id);

    let (status, json) = call(&clinic.state, "GET", &slots_uri, Some("patient"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 16);
    assert_eq!(json["data"][0], json!({ "time": "09:00", "available": true }));

    call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "10:00")),
    )
    .await;

    let (_, json) = call(&clinic.state, "GET", &slots_uri, Some("patient"), None).await;
    let times: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times.len(), 15);
    assert!(!times.contains(&"10:00"));

    let conflict_uri = format!(
        "/api/doctors/{}/conflict?date=2024-06-01&time=10:00",
        clinic.doctor_id
    );
    let (status, json) = call(&clinic.state, "GET", &conflict_uri, Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["conflict"], true);

    let (status, _) = call(
        &clinic.state,
        "GET",
        "/api/doctors/999/slots?date=2024-06-01",
        Some("patient"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patient_update_is_field_restricted() {
    let clinic = test_clinic();
    let (_, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    let id = json["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/appointments/{id}");

    let (status, json) = call(
        &clinic.state,
        "PATCH",
        &uri,
        Some("patient"),
        Some(json!({ "symptoms": "Fever since Tuesday" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["symptoms"], "Fever since Tuesday");

    let (status, _) = call(
        &clinic.state,
        "PATCH",
        &uri,
        Some("patient"),
        Some(json!({ "notes": "VIP" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(
        &clinic.state,
        "PATCH",
        &uri,
        Some("doctor"),
        Some(json!({ "status": "confirmed", "notes": "Bring prior x-rays" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "confirmed");

    let (status, json) = call(
        &clinic.state,
        "PATCH",
        &uri,
        Some("doctor"),
        Some(json!({ "status": "scheduled" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["error"], "cannot change status from confirmed to scheduled");
}

#[tokio::test]
async fn test_cancel_records_canceller() {
    let clinic = test_clinic();
    let (_, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    let id = json["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/appointments/{id}/cancel");

    let (status, _) = call(&clinic.state, "POST", &uri, Some("other"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(
        &clinic.state,
        "POST",
        &uri,
        Some("patient"),
        Some(json!({ "reason": "Feeling better" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["cancelled_by"], clinic.patient_user);
    assert_eq!(json["data"]["cancellation_reason"], "Feeling better");

    // Re-cancel without a body succeeds and re-stamps.
    let (status, json) = call(&clinic.state, "POST", &uri, Some("doctor"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["cancelled_by"], clinic.doctor_user);

    // The slot is free again.
    let (status, _) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("other"),
        Some(booking(clinic.other_patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_list_is_scoped_per_role() {
    let clinic = test_clinic();
    call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "10:00")),
    )
    .await;
    call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("other"),
        Some(booking(clinic.other_patient_id, clinic.doctor_id, "11:00")),
    )
    .await;

    let (_, json) = call(&clinic.state, "GET", "/api/appointments", Some("patient"), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);

    let (_, json) = call(&clinic.state, "GET", "/api/appointments", Some("doctor"), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);

    let (_, json) = call(
        &clinic.state,
        "GET",
        "/api/appointments?date=2024-06-01&status=scheduled",
        Some("staff"),
        None,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_ics_export() {
    let clinic = test_clinic();
    let (_, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(booking(clinic.patient_id, clinic.doctor_id, "14:00")),
    )
    .await;
    let id = json["data"]["id"].as_i64().unwrap();

    let res = test_app(clinic.state.clone())
        .oneshot(
            Request::builder()
                .uri(format!("/api/appointments/{id}/ics"))
                .header(header::AUTHORIZATION, "Bearer patient")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::CONTENT_TYPE],
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("DTSTART:20240601T140000"));
    assert!(ics.contains("SUMMARY:consultation with Dr. House"));

    let (status, _) = call(
        &clinic.state,
        "GET",
        &format!("/api/appointments/{id}/ics"),
        Some("other"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

// ── Directory, messaging, reports ──

#[tokio::test]
async fn test_user_admin_is_admin_only() {
    let clinic = test_clinic();
    let new_user = json!({ "email": "nurse@clinic.test", "name": "Nia Nurse", "role": "staff" });

    let (status, _) = call(&clinic.state, "POST", "/api/users", Some("staff"), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, json) = call(&clinic.state, "POST", "/api/users", Some("admin"), Some(new_user.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["data"]["role"], "staff");

    let (status, _) = call(&clinic.state, "POST", "/api/users", Some("admin"), Some(new_user)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = call(&clinic.state, "GET", "/api/users?role=patient", Some("admin"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_messages_between_users() {
    let clinic = test_clinic();
    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/messages",
        Some("doctor"),
        Some(json!({
            "recipient_id": clinic.patient_user,
            "subject": "Results",
            "body": "Your results look normal."
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["data"]["id"].as_i64().unwrap();

    let (_, json) = call(&clinic.state, "GET", "/api/messages", Some("patient"), None).await;
    assert_eq!(json["data"]["unread"], 1);
    assert_eq!(json["data"]["messages"][0]["sender_name"], "Dr. House");
    assert_eq!(json["data"]["messages"][0]["recipient_name"], "Pat Doe");

    let uri = format!("/api/messages/{id}/read");
    let (status, _) = call(&clinic.state, "POST", &uri, Some("doctor"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, json) = call(&clinic.state, "POST", &uri, Some("patient"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["is_read"], true);

    let (_, json) = call(&clinic.state, "GET", "/api/messages/sent", Some("doctor"), None).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_dashboard_per_role() {
    let clinic = test_clinic();
    let (status, json) = call(&clinic.state, "GET", "/api/reports/dashboard", Some("staff"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["view"], "clinic");
    assert_eq!(json["data"]["total_patients"], 2);

    let (_, json) = call(&clinic.state, "GET", "/api/reports/dashboard", Some("patient"), None).await;
    assert_eq!(json["data"]["view"], "patient");

    let (status, _) = call(
        &clinic.state,
        "GET",
        "/api/reports/appointments?from=2024-06-01&to=2024-06-30",
        Some("doctor"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_events_stream_requires_token() {
    let clinic = test_clinic();
    let (status, _) = call(&clinic.state, "GET", "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let res = test_app(clinic.state.clone())
        .oneshot(
            Request::builder()
                .uri("/api/events?token=staff")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()[header::CONTENT_TYPE], "text/event-stream");
}

// ── Rejected input ──

#[tokio::test]
async fn test_patient_naming_other_fields_is_forbidden() {
    let clinic = test_clinic();
    let id = book(&clinic, "10:00").await;
    let uri = format!("/api/appointments/{id}");

    for body in [
        json!({ "doctor_id": clinic.doctor_id }),
        json!({ "patient_id": clinic.other_patient_id }),
        json!({ "cancellation_reason": "x" }),
        json!({ "date": "2024-02-30" }),
    ] {
        let (status, json) = call(&clinic.state, "PATCH", &uri, Some("patient"), Some(body)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["success"], false);
    }

    let (_, json) = call(&clinic.state, "GET", &uri, Some("patient"), None).await;
    assert_eq!(json["data"]["patient_id"], clinic.patient_id);
}

#[tokio::test]
async fn test_malformed_input_uses_error_envelope() {
    let clinic = test_clinic();
    let id = book(&clinic, "10:00").await;

    let mut bad_date = booking(clinic.patient_id, clinic.doctor_id, "11:00");
    bad_date["date"] = json!("2024-02-30");
    let (status, json) = call(
        &clinic.state,
        "POST",
        "/api/appointments",
        Some("patient"),
        Some(bad_date),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().starts_with("invalid input"));

    let (status, json) = call(
        &clinic.state,
        "PATCH",
        &format!("/api/appointments/{id}"),
        Some("staff"),
        Some(json!({ "bogus": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = call(
        &clinic.state,
        "GET",
        &format!("/api/doctors/{}/slots?date=tomorrow", clinic.doctor_id),
        Some("patient"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) =
        call(&clinic.state, "GET", "/api/appointments/abc", Some("staff"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let (status, json) = call_raw(
        &clinic.state,
        "POST",
        "/api/appointments",
        "patient",
        "{not json",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_malformed_cancel_body_is_rejected() {
    let clinic = test_clinic();
    let id = book(&clinic, "10:00").await;
    let uri = format!("/api/appointments/{id}/cancel");

    let truncated = r#"{"reason": "#;
    let (status, json) = call_raw(&clinic.state, "POST", &uri, "patient", truncated).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);

    let typo = r#"{"reasn": "typo"}"#;
    let (status, _) = call_raw(&clinic.state, "POST", &uri, "patient", typo).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let appointment_uri = format!("/api/appointments/{id}");
    let (_, json) = call(&clinic.state, "GET", &appointment_uri, Some("patient"), None).await;
    assert_eq!(json["data"]["status"], "scheduled");

    let (status, json) = call_raw(&clinic.state, "POST", &uri, "patient", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "cancelled");
    assert_eq!(json["data"]["cancellation_reason"], Value::Null);
}

#[tokio::test]
async fn test_staff_reassigns_doctor_over_http() {
    let clinic = test_clinic();
    let id = book(&clinic, "10:00").await;

    let second_doctor = {
        let db = clinic.state.db().unwrap();
        let user_id = add_user(&db, "grey@clinic.test", "Dr. Grey", Role::Doctor);
        queries::create_doctor(
            &db,
            &NewDoctor {
                user_id,
                department_id: None,
                specialization: "Surgery".to_string(),
                license_number: None,
                years_of_experience: None,
                bio: None,
            },
        )
        .unwrap()
    };

    let (status, json) = call(
        &clinic.state,
        "PATCH",
        &format!("/api/appointments/{id}"),
        Some("staff"),
        Some(json!({ "doctor_id": second_doctor })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["doctor_id"], second_doctor);

    let (_, json) = call(
        &clinic.state,
        "GET",
        &format!("/api/doctors/{}/slots?date=2024-06-01", clinic.doctor_id),
        Some("patient"),
        None,
    )
    .await;
    assert_eq!(json["data"].as_array().unwrap().len(), 16);
}
