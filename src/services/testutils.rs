use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::db::{self, queries};
use crate::models::{NewAppointment, NewDoctor, NewPatient, NewStaffMember, NewUser, Role};
use crate::services::identity::{resolve_caller, Caller, DbSessions};
use crate::state::AppState;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        port: 0,
        database_url: ":memory:".to_string(),
        admin_token: "test-admin-token".to_string(),
        session_ttl_hours: 24,
        cors_origin: None,
    }
}

pub fn new_appointment(patient_id: i64, doctor_id: i64, day: &str, time: &str) -> NewAppointment {
    NewAppointment {
        patient_id,
        doctor_id,
        date: date(day),
        time: time.to_string(),
        duration_minutes: None,
        appointment_type: "consultation".to_string(),
        reason: None,
        symptoms: None,
        notes: None,
    }
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

fn add_patient(conn: &Connection, email: &str, name: &str) -> i64 {
    let user_id = add_user(conn, email, name, Role::Patient);
    queries::create_patient(
        conn,
        &NewPatient {
            user_id,
            date_of_birth: Some(date("1985-04-12")),
            gender: None,
            blood_type: None,
            address: None,
            emergency_contact: None,
            allergies: None,
        },
    )
    .unwrap()
}

fn add_doctor(conn: &Connection, email: &str, name: &str) -> i64 {
    let user_id = add_user(conn, email, name, Role::Doctor);
    queries::create_doctor(
        conn,
        &NewDoctor {
            user_id,
            department_id: None,
            specialization: "General Practice".to_string(),
            license_number: None,
            years_of_experience: Some(8),
            bio: None,
        },
    )
    .unwrap()
}

/// An in-memory clinic with one user of each role plus a second patient and doctor.
pub struct Fixture {
    pub state: AppState,
    pub admin: Caller,
    pub staff: Caller,
    pub doctor: Caller,
    pub other_doctor: Caller,
    pub patient: Caller,
    pub other_patient: Caller,
    pub doctor_id: i64,
    pub other_doctor_id: i64,
    pub patient_id: i64,
    pub other_patient_id: i64,
}

impl Fixture {
    pub fn new() -> Self {
        let conn = db::init_db(":memory:").unwrap();

        let admin_user = add_user(&conn, "admin@clinic.test", "Avery Admin", Role::Admin);
        let staff_user = add_user(&conn, "desk@clinic.test", "Sam Desk", Role::Staff);
        queries::create_staff(
            &conn,
            &NewStaffMember {
                user_id: staff_user,
                department_id: None,
                position: "Receptionist".to_string(),
            },
        )
        .unwrap();
        let doctor_id = add_doctor(&conn, "house@clinic.test", "Dr. House");
        let other_doctor_id = add_doctor(&conn, "grey@clinic.test", "Dr. Grey");
        let patient_id = add_patient(&conn, "pat@clinic.test", "Pat Doe");
        let other_patient_id = add_patient(&conn, "lee@clinic.test", "Lee Roe");

        let caller_for = |user_id: i64| resolve_caller(&conn, user_id).unwrap();
        let patient_caller = |id: i64| {
            let user_id = queries::get_patient(&conn, id).unwrap().unwrap().user_id;
            caller_for(user_id)
        };
        let doctor_caller = |id: i64| {
            let user_id = queries::get_doctor(&conn, id).unwrap().unwrap().user_id;
            caller_for(user_id)
        };

        let admin = caller_for(admin_user);
        let staff = caller_for(staff_user);
        let doctor = doctor_caller(doctor_id);
        let other_doctor = doctor_caller(other_doctor_id);
        let patient = patient_caller(patient_id);
        let other_patient = patient_caller(other_patient_id);

        let db = Arc::new(Mutex::new(conn));
        let state = AppState::new(
            db.clone(),
            test_config(),
            Box::new(DbSessions::new(db)),
        );

        Self {
            state,
            admin,
            staff,
            doctor,
            other_doctor,
            patient,
            other_patient,
            doctor_id,
            other_doctor_id,
            patient_id,
            other_patient_id,
        }
    }
}
