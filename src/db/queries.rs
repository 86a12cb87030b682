use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::{ToSql, Type};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{
    Appointment, AppointmentFilter, AppointmentStatus, ClinicStats, Department, DepartmentInput,
    Doctor, DoctorAppointmentSummary, DoctorStats, Feedback, FeedbackStatus, LabResult,
    LabResultStatus, Lifecycle, MedicalRecord, Medication, MedicationStatus, Message, NewDoctor,
    NewPatient, NewStaffMember, NewUser, Patient, PatientStats, PatientUpdate, Role, Session,
    StaffMember, StatusCounts, User,
};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

const DEFAULT_LIST_LIMIT: i64 = 100;

fn now_str() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

fn date_str(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, anyhow::anyhow!(msg).into())
}

fn date_col(row: &Row, idx: usize) -> rusqlite::Result<NaiveDate> {
    let s: String = row.get(idx)?;
    NaiveDate::parse_from_str(&s, DATE_FORMAT)
        .map_err(|_| conversion_error(idx, format!("invalid date: {s}")))
}

fn opt_date_col(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => date_col(row, idx).map(Some),
        None => Ok(None),
    }
}

fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let s: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&s, TIMESTAMP_FORMAT)
        .map_err(|_| conversion_error(idx, format!("invalid timestamp: {s}")))
}

fn opt_ts_col(row: &Row, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    match row.get::<_, Option<String>>(idx)? {
        Some(_) => ts_col(row, idx).map(Some),
        None => Ok(None),
    }
}

fn enum_col<T>(row: &Row, idx: usize, parse: fn(&str) -> Option<T>) -> rusqlite::Result<T> {
    let s: String = row.get(idx)?;
    parse(&s).ok_or_else(|| conversion_error(idx, format!("unexpected value: {s}")))
}

fn count(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> anyhow::Result<i64> {
    Ok(conn.query_row(sql, params, |row| row.get(0))?)
}

// ── Users ──

const USER_COLUMNS: &str = "id, email, name, role, phone, created_at, updated_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: enum_col(row, 3, Role::parse)?,
        phone: row.get(4)?,
        created_at: ts_col(row, 5)?,
        updated_at: ts_col(row, 6)?,
    })
}

pub fn create_user(conn: &Connection, user: &NewUser) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO users (email, name, role, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![user.email, user.name, user.role.as_str(), user.phone, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> anyhow::Result<Option<User>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], user_from_row).optional()?)
}

pub fn list_users(conn: &Connection, role: Option<Role>, limit: i64) -> anyhow::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {USER_COLUMNS} FROM users
         WHERE (?1 IS NULL OR role = ?1)
         ORDER BY name ASC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![role.map(|r| r.as_str()), limit], user_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn save_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE users SET email = ?2, name = ?3, role = ?4, phone = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            user.id,
            user.email,
            user.name,
            user.role.as_str(),
            user.phone,
            now_str(),
        ],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Sessions ──

pub fn create_session(conn: &Connection, user_id: i64, ttl_hours: i64) -> anyhow::Result<Session> {
    let token = uuid::Uuid::new_v4().to_string();
    let now = Utc::now().naive_utc();
    let expires_at = now + Duration::hours(ttl_hours);

    conn.execute(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            token,
            user_id,
            now.format(TIMESTAMP_FORMAT).to_string(),
            expires_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;

    Ok(Session {
        token,
        user_id,
        expires_at,
    })
}

/// The user behind a live session token.
pub fn session_user(conn: &Connection, token: &str) -> anyhow::Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT user_id FROM sessions WHERE token = ?1 AND expires_at > ?2",
            params![token, now_str()],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn delete_session(conn: &Connection, token: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(count > 0)
}

pub fn purge_expired_sessions(conn: &Connection) -> anyhow::Result<usize> {
    let count = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", params![now_str()])?;
    Ok(count)
}

// ── Departments ──

fn department_from_row(row: &Row) -> rusqlite::Result<Department> {
    Ok(Department {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: ts_col(row, 3)?,
    })
}

pub fn create_department(conn: &Connection, input: &DepartmentInput) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO departments (name, description, created_at) VALUES (?1, ?2, ?3)",
        params![input.name, input.description, now_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_department(conn: &Connection, id: i64) -> anyhow::Result<Option<Department>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, created_at FROM departments WHERE id = ?1",
            params![id],
            department_from_row,
        )
        .optional()?)
}

pub fn list_departments(conn: &Connection) -> anyhow::Result<Vec<Department>> {
    let mut stmt =
        conn.prepare("SELECT id, name, description, created_at FROM departments ORDER BY name ASC")?;
    let rows = stmt.query_map([], department_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_department(
    conn: &Connection,
    id: i64,
    input: &DepartmentInput,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE departments SET name = ?2, description = ?3 WHERE id = ?1",
        params![id, input.name, input.description],
    )?;
    Ok(count > 0)
}

pub fn delete_department(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM departments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Patients ──

const PATIENT_SELECT: &str = "SELECT p.id, p.user_id, u.name, u.email, p.date_of_birth, p.gender, p.blood_type,
        p.address, p.emergency_contact, p.allergies, p.created_at, p.updated_at
     FROM patients p JOIN users u ON u.id = p.user_id";

fn patient_from_row(row: &Row) -> rusqlite::Result<Patient> {
    Ok(Patient {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        date_of_birth: opt_date_col(row, 4)?,
        gender: row.get(5)?,
        blood_type: row.get(6)?,
        address: row.get(7)?,
        emergency_contact: row.get(8)?,
        allergies: row.get(9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

pub fn create_patient(conn: &Connection, patient: &NewPatient) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO patients (user_id, date_of_birth, gender, blood_type, address, emergency_contact, allergies, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            patient.user_id,
            patient.date_of_birth.as_ref().map(date_str),
            patient.gender,
            patient.blood_type,
            patient.address,
            patient.emergency_contact,
            patient.allergies,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_patient(conn: &Connection, id: i64) -> anyhow::Result<Option<Patient>> {
    let sql = format!("{PATIENT_SELECT} WHERE p.id = ?1");
    Ok(conn.query_row(&sql, params![id], patient_from_row).optional()?)
}

pub fn get_patient_by_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<Patient>> {
    let sql = format!("{PATIENT_SELECT} WHERE p.user_id = ?1");
    Ok(conn.query_row(&sql, params![user_id], patient_from_row).optional()?)
}

pub fn list_patients(conn: &Connection, limit: i64) -> anyhow::Result<Vec<Patient>> {
    let mut stmt = conn.prepare(&format!("{PATIENT_SELECT} ORDER BY u.name ASC LIMIT ?1"))?;
    let rows = stmt.query_map(params![limit], patient_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Patients with at least one appointment with the given doctor.
pub fn list_patients_for_doctor(conn: &Connection, doctor_id: i64) -> anyhow::Result<Vec<Patient>> {
    let mut stmt = conn.prepare(&format!(
        "{PATIENT_SELECT}
         WHERE p.id IN (SELECT DISTINCT patient_id FROM appointments WHERE doctor_id = ?1)
         ORDER BY u.name ASC"
    ))?;
    let rows = stmt.query_map(params![doctor_id], patient_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_patient(conn: &Connection, id: i64, update: &PatientUpdate) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE patients SET
           date_of_birth = COALESCE(?2, date_of_birth),
           gender = COALESCE(?3, gender),
           blood_type = COALESCE(?4, blood_type),
           address = COALESCE(?5, address),
           emergency_contact = COALESCE(?6, emergency_contact),
           allergies = COALESCE(?7, allergies),
           updated_at = ?8
         WHERE id = ?1",
        params![
            id,
            update.date_of_birth.as_ref().map(date_str),
            update.gender,
            update.blood_type,
            update.address,
            update.emergency_contact,
            update.allergies,
            now_str(),
        ],
    )?;
    Ok(count > 0)
}

// ── Doctors ──

const DOCTOR_SELECT: &str = "SELECT d.id, d.user_id, u.name, u.email, d.department_id, dep.name, d.specialization,
        d.license_number, d.years_of_experience, d.bio, d.created_at, d.updated_at
     FROM doctors d
     JOIN users u ON u.id = d.user_id
     LEFT JOIN departments dep ON dep.id = d.department_id";

fn doctor_from_row(row: &Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        email: row.get(3)?,
        department_id: row.get(4)?,
        department_name: row.get(5)?,
        specialization: row.get(6)?,
        license_number: row.get(7)?,
        years_of_experience: row.get(8)?,
        bio: row.get(9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

pub fn create_doctor(conn: &Connection, doctor: &NewDoctor) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO doctors (user_id, department_id, specialization, license_number, years_of_experience, bio, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        params![
            doctor.user_id,
            doctor.department_id,
            doctor.specialization,
            doctor.license_number,
            doctor.years_of_experience,
            doctor.bio,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_doctor(conn: &Connection, id: i64) -> anyhow::Result<Option<Doctor>> {
    let sql = format!("{DOCTOR_SELECT} WHERE d.id = ?1");
    Ok(conn.query_row(&sql, params![id], doctor_from_row).optional()?)
}

pub fn get_doctor_by_user(conn: &Connection, user_id: i64) -> anyhow::Result<Option<Doctor>> {
    let sql = format!("{DOCTOR_SELECT} WHERE d.user_id = ?1");
    Ok(conn.query_row(&sql, params![user_id], doctor_from_row).optional()?)
}

pub fn list_doctors(conn: &Connection, department_id: Option<i64>) -> anyhow::Result<Vec<Doctor>> {
    let mut stmt = conn.prepare(&format!(
        "{DOCTOR_SELECT} WHERE (?1 IS NULL OR d.department_id = ?1) ORDER BY u.name ASC"
    ))?;
    let rows = stmt.query_map(params![department_id], doctor_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ── Staff ──

fn staff_from_row(row: &Row) -> rusqlite::Result<StaffMember> {
    Ok(StaffMember {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        department_id: row.get(3)?,
        position: row.get(4)?,
        created_at: ts_col(row, 5)?,
    })
}

pub fn create_staff(conn: &Connection, staff: &NewStaffMember) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO staff (user_id, department_id, position, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![staff.user_id, staff.department_id, staff.position, now_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_staff(conn: &Connection, id: i64) -> anyhow::Result<Option<StaffMember>> {
    Ok(conn
        .query_row(
            "SELECT s.id, s.user_id, u.name, s.department_id, s.position, s.created_at
             FROM staff s JOIN users u ON u.id = s.user_id WHERE s.id = ?1",
            params![id],
            staff_from_row,
        )
        .optional()?)
}

// ── Appointments ──

const APPOINTMENT_COLUMNS: &str = "id, patient_id, doctor_id, date, time, duration_minutes, appointment_type, status,
        reason, symptoms, notes, diagnosis, prescription, follow_up_required, follow_up_date,
        cancelled_by, cancellation_reason, cancelled_at, created_at, updated_at";

fn appointment_from_row(row: &Row) -> rusqlite::Result<Appointment> {
    Ok(Appointment {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        date: date_col(row, 3)?,
        time: row.get(4)?,
        duration_minutes: row.get(5)?,
        appointment_type: row.get(6)?,
        status: enum_col(row, 7, AppointmentStatus::parse)?,
        reason: row.get(8)?,
        symptoms: row.get(9)?,
        notes: row.get(10)?,
        diagnosis: row.get(11)?,
        prescription: row.get(12)?,
        follow_up_required: row.get::<_, i32>(13)? != 0,
        follow_up_date: opt_date_col(row, 14)?,
        cancelled_by: row.get(15)?,
        cancellation_reason: row.get(16)?,
        cancelled_at: opt_ts_col(row, 17)?,
        created_at: ts_col(row, 18)?,
        updated_at: ts_col(row, 19)?,
    })
}

pub struct AppointmentInsert<'a> {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub time: &'a str,
    pub duration_minutes: i32,
    pub appointment_type: &'a str,
    pub reason: Option<&'a str>,
    pub symptoms: Option<&'a str>,
    pub notes: Option<&'a str>,
}

/// Inserts with status `scheduled`.
pub fn insert_appointment(conn: &Connection, appt: &AppointmentInsert) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO appointments (patient_id, doctor_id, date, time, duration_minutes, appointment_type, status, reason, symptoms, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
        params![
            appt.patient_id,
            appt.doctor_id,
            date_str(&appt.date),
            appt.time,
            appt.duration_minutes,
            appt.appointment_type,
            AppointmentStatus::Scheduled.as_str(),
            appt.reason,
            appt.symptoms,
            appt.notes,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_appointment(conn: &Connection, id: i64) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], appointment_from_row).optional()?)
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> anyhow::Result<Vec<Appointment>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if let Some(date) = filter.date {
        values.push(Box::new(date_str(&date)));
        clauses.push(format!("date = ?{}", values.len()));
    }
    if let Some(doctor_id) = filter.doctor_id {
        values.push(Box::new(doctor_id));
        clauses.push(format!("doctor_id = ?{}", values.len()));
    }
    if let Some(patient_id) = filter.patient_id {
        values.push(Box::new(patient_id));
        clauses.push(format!("patient_id = ?{}", values.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    values.push(Box::new(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT)));
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments {where_sql}
         ORDER BY date ASC, time ASC LIMIT ?{}",
        values.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn ToSql> = values.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), appointment_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Id of a non-cancelled appointment holding exactly (doctor, date, time).
pub fn find_conflicting_appointment(
    conn: &Connection,
    doctor_id: i64,
    date: &NaiveDate,
    time: &str,
    exclude_id: Option<i64>,
) -> anyhow::Result<Option<i64>> {
    Ok(conn
        .query_row(
            "SELECT id FROM appointments
             WHERE doctor_id = ?1 AND date = ?2 AND time = ?3 AND status != 'cancelled'
               AND (?4 IS NULL OR id != ?4)
             LIMIT 1",
            params![doctor_id, date_str(date), time, exclude_id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Start times on the given day that are held by a scheduled or confirmed appointment.
pub fn booked_times(
    conn: &Connection,
    doctor_id: i64,
    date: &NaiveDate,
) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT time FROM appointments
         WHERE doctor_id = ?1 AND date = ?2 AND status IN ('scheduled', 'confirmed')
         ORDER BY time ASC",
    )?;
    let rows = stmt.query_map(params![doctor_id, date_str(date)], |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Writes every mutable field of the appointment back.
pub fn save_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE appointments SET
           date = ?2, time = ?3, duration_minutes = ?4, appointment_type = ?5, status = ?6,
           reason = ?7, symptoms = ?8, notes = ?9, diagnosis = ?10, prescription = ?11,
           follow_up_required = ?12, follow_up_date = ?13, updated_at = ?14, doctor_id = ?15
         WHERE id = ?1",
        params![
            appt.id,
            date_str(&appt.date),
            appt.time,
            appt.duration_minutes,
            appt.appointment_type,
            appt.status.as_str(),
            appt.reason,
            appt.symptoms,
            appt.notes,
            appt.diagnosis,
            appt.prescription,
            appt.follow_up_required as i32,
            appt.follow_up_date.as_ref().map(date_str),
            now_str(),
            appt.doctor_id,
        ],
    )?;
    Ok(())
}

/// Forces status `cancelled` whatever the current status is.
pub fn cancel_appointment(
    conn: &Connection,
    id: i64,
    cancelled_by: i64,
    reason: Option<&str>,
) -> anyhow::Result<bool> {
    let now = now_str();
    let count = conn.execute(
        "UPDATE appointments SET status = 'cancelled', cancelled_by = ?2, cancellation_reason = ?3,
           cancelled_at = ?4, updated_at = ?4
         WHERE id = ?1",
        params![id, cancelled_by, reason, now],
    )?;
    Ok(count > 0)
}

pub fn doctor_has_patient(conn: &Connection, doctor_id: i64, patient_id: i64) -> anyhow::Result<bool> {
    let n = count(
        conn,
        "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1 AND patient_id = ?2",
        &[&doctor_id, &patient_id],
    )?;
    Ok(n > 0)
}

// ── Medical Records ──

const RECORD_COLUMNS: &str = "id, patient_id, doctor_id, appointment_id, diagnosis, treatment, notes, record_date, created_at, updated_at";

fn record_from_row(row: &Row) -> rusqlite::Result<MedicalRecord> {
    Ok(MedicalRecord {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        appointment_id: row.get(3)?,
        diagnosis: row.get(4)?,
        treatment: row.get(5)?,
        notes: row.get(6)?,
        record_date: date_col(row, 7)?,
        created_at: ts_col(row, 8)?,
        updated_at: ts_col(row, 9)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_medical_record(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    appointment_id: Option<i64>,
    diagnosis: &str,
    treatment: Option<&str>,
    notes: Option<&str>,
    record_date: &NaiveDate,
) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO medical_records (patient_id, doctor_id, appointment_id, diagnosis, treatment, notes, record_date, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            patient_id,
            doctor_id,
            appointment_id,
            diagnosis,
            treatment,
            notes,
            date_str(record_date),
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_medical_record(conn: &Connection, id: i64) -> anyhow::Result<Option<MedicalRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], record_from_row).optional()?)
}

pub fn list_medical_records(
    conn: &Connection,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
    limit: i64,
) -> anyhow::Result<Vec<MedicalRecord>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {RECORD_COLUMNS} FROM medical_records
         WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR doctor_id = ?2)
         ORDER BY record_date DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(params![patient_id, doctor_id, limit], record_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

// ── Medications ──

const MEDICATION_COLUMNS: &str = "id, patient_id, doctor_id, name, dosage, frequency, start_date, end_date, status, notes, created_at, updated_at";

fn medication_from_row(row: &Row) -> rusqlite::Result<Medication> {
    Ok(Medication {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        name: row.get(3)?,
        dosage: row.get(4)?,
        frequency: row.get(5)?,
        start_date: date_col(row, 6)?,
        end_date: opt_date_col(row, 7)?,
        status: enum_col(row, 8, MedicationStatus::parse)?,
        notes: row.get(9)?,
        created_at: ts_col(row, 10)?,
        updated_at: ts_col(row, 11)?,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn create_medication(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    name: &str,
    dosage: &str,
    frequency: &str,
    start_date: &NaiveDate,
    end_date: Option<&NaiveDate>,
    notes: Option<&str>,
) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO medications (patient_id, doctor_id, name, dosage, frequency, start_date, end_date, status, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 'active', ?8, ?9, ?9)",
        params![
            patient_id,
            doctor_id,
            name,
            dosage,
            frequency,
            date_str(start_date),
            end_date.map(date_str),
            notes,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_medication(conn: &Connection, id: i64) -> anyhow::Result<Option<Medication>> {
    let sql = format!("SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], medication_from_row).optional()?)
}

pub fn list_medications(
    conn: &Connection,
    patient_id: Option<i64>,
    status: Option<MedicationStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Medication>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEDICATION_COLUMNS} FROM medications
         WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY start_date DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![patient_id, status.map(|s| s.as_str()), limit],
        medication_from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update_medication_status(
    conn: &Connection,
    id: i64,
    status: MedicationStatus,
    end_date: Option<&NaiveDate>,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE medications SET status = ?2, end_date = COALESCE(?3, end_date), updated_at = ?4
         WHERE id = ?1",
        params![id, status.as_str(), end_date.map(date_str), now_str()],
    )?;
    Ok(count > 0)
}

// ── Lab Results ──

const LAB_COLUMNS: &str = "id, patient_id, doctor_id, test_name, result, normal_range, status, test_date, notes, created_at, updated_at";

fn lab_result_from_row(row: &Row) -> rusqlite::Result<LabResult> {
    Ok(LabResult {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        test_name: row.get(3)?,
        result: row.get(4)?,
        normal_range: row.get(5)?,
        status: enum_col(row, 6, LabResultStatus::parse)?,
        test_date: date_col(row, 7)?,
        notes: row.get(8)?,
        created_at: ts_col(row, 9)?,
        updated_at: ts_col(row, 10)?,
    })
}

pub fn create_lab_result(
    conn: &Connection,
    patient_id: i64,
    doctor_id: i64,
    test_name: &str,
    normal_range: Option<&str>,
    test_date: &NaiveDate,
    notes: Option<&str>,
) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO lab_results (patient_id, doctor_id, test_name, normal_range, status, test_date, notes, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?6, ?7, ?7)",
        params![
            patient_id,
            doctor_id,
            test_name,
            normal_range,
            date_str(test_date),
            notes,
            now,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_lab_result(conn: &Connection, id: i64) -> anyhow::Result<Option<LabResult>> {
    let sql = format!("SELECT {LAB_COLUMNS} FROM lab_results WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], lab_result_from_row).optional()?)
}

pub fn list_lab_results(
    conn: &Connection,
    patient_id: Option<i64>,
    doctor_id: Option<i64>,
    limit: i64,
) -> anyhow::Result<Vec<LabResult>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {LAB_COLUMNS} FROM lab_results
         WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR doctor_id = ?2)
         ORDER BY test_date DESC, id DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(params![patient_id, doctor_id, limit], lab_result_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn save_lab_result(conn: &Connection, lab: &LabResult) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE lab_results SET result = ?2, status = ?3, notes = ?4, updated_at = ?5 WHERE id = ?1",
        params![lab.id, lab.result, lab.status.as_str(), lab.notes, now_str()],
    )?;
    Ok(())
}

// ── Messages ──

// The users table is joined twice; `sender` and `recipient` name each side.
const MESSAGE_SELECT: &str = "SELECT m.id, m.sender_id, sender.name, m.recipient_id, recipient.name,
        m.subject, m.body, m.is_read, m.created_at
     FROM messages m
     JOIN users sender ON sender.id = m.sender_id
     JOIN users recipient ON recipient.id = m.recipient_id";

fn message_from_row(row: &Row) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender_name: row.get(2)?,
        recipient_id: row.get(3)?,
        recipient_name: row.get(4)?,
        subject: row.get(5)?,
        body: row.get(6)?,
        is_read: row.get::<_, i32>(7)? != 0,
        created_at: row.get(8)?,
    })
}

pub fn create_message(
    conn: &Connection,
    sender_id: i64,
    recipient_id: i64,
    subject: &str,
    body: &str,
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO messages (sender_id, recipient_id, subject, body, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![sender_id, recipient_id, subject, body, now_str()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_message(conn: &Connection, id: i64) -> anyhow::Result<Option<Message>> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
    Ok(conn.query_row(&sql, params![id], message_from_row).optional()?)
}

pub fn list_inbox(conn: &Connection, recipient_id: i64, limit: i64) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT} WHERE m.recipient_id = ?1 ORDER BY m.id DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![recipient_id, limit], message_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn list_sent(conn: &Connection, sender_id: i64, limit: i64) -> anyhow::Result<Vec<Message>> {
    let mut stmt = conn.prepare(&format!(
        "{MESSAGE_SELECT} WHERE m.sender_id = ?1 ORDER BY m.id DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![sender_id, limit], message_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn mark_message_read(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("UPDATE messages SET is_read = 1 WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn unread_count(conn: &Connection, recipient_id: i64) -> anyhow::Result<i64> {
    count(
        conn,
        "SELECT COUNT(*) FROM messages WHERE recipient_id = ?1 AND is_read = 0",
        &[&recipient_id],
    )
}

// ── Feedback ──

const FEEDBACK_COLUMNS: &str =
    "id, patient_id, doctor_id, rating, comment, status, response, created_at, updated_at";

fn feedback_from_row(row: &Row) -> rusqlite::Result<Feedback> {
    Ok(Feedback {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        doctor_id: row.get(2)?,
        rating: row.get(3)?,
        comment: row.get(4)?,
        status: enum_col(row, 5, FeedbackStatus::parse)?,
        response: row.get(6)?,
        created_at: ts_col(row, 7)?,
        updated_at: ts_col(row, 8)?,
    })
}

pub fn create_feedback(
    conn: &Connection,
    patient_id: i64,
    doctor_id: Option<i64>,
    rating: i32,
    comment: &str,
) -> anyhow::Result<i64> {
    let now = now_str();
    conn.execute(
        "INSERT INTO feedback (patient_id, doctor_id, rating, comment, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, 'pending', ?5, ?5)",
        params![patient_id, doctor_id, rating, comment, now],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_feedback(conn: &Connection, id: i64) -> anyhow::Result<Option<Feedback>> {
    let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE id = ?1");
    Ok(conn.query_row(&sql, params![id], feedback_from_row).optional()?)
}

pub fn list_feedback(
    conn: &Connection,
    patient_id: Option<i64>,
    status: Option<FeedbackStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Feedback>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {FEEDBACK_COLUMNS} FROM feedback
         WHERE (?1 IS NULL OR patient_id = ?1) AND (?2 IS NULL OR status = ?2)
         ORDER BY id DESC LIMIT ?3"
    ))?;
    let rows = stmt.query_map(
        params![patient_id, status.map(|s| s.as_str()), limit],
        feedback_from_row,
    )?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn save_feedback(conn: &Connection, feedback: &Feedback) -> anyhow::Result<()> {
    conn.execute(
        "UPDATE feedback SET status = ?2, response = ?3, updated_at = ?4 WHERE id = ?1",
        params![
            feedback.id,
            feedback.status.as_str(),
            feedback.response,
            now_str()
        ],
    )?;
    Ok(())
}

// ── Reports ──

fn status_counts(conn: &Connection, sql: &str, params: &[&dyn ToSql]) -> anyhow::Result<StatusCounts> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| {
        Ok((enum_col(row, 0, AppointmentStatus::parse)?, row.get::<_, i64>(1)?))
    })?;

    let mut counts = StatusCounts::default();
    for row in rows {
        let (status, n) = row?;
        counts.add(status, n);
    }
    Ok(counts)
}

// Upcoming: scheduled or confirmed, dated today or later.
const UPCOMING_FOR_DOCTOR: &str = "SELECT COUNT(*) FROM appointments
     WHERE doctor_id = ?1 AND date >= ?2 AND status IN ('scheduled', 'confirmed')";
const UPCOMING_FOR_PATIENT: &str = "SELECT COUNT(*) FROM appointments
     WHERE patient_id = ?1 AND date >= ?2 AND status IN ('scheduled', 'confirmed')";

pub fn clinic_stats(conn: &Connection, today: &NaiveDate) -> anyhow::Result<ClinicStats> {
    let today = date_str(today);

    Ok(ClinicStats {
        total_patients: count(conn, "SELECT COUNT(*) FROM patients", &[])?,
        total_doctors: count(conn, "SELECT COUNT(*) FROM doctors", &[])?,
        total_staff: count(conn, "SELECT COUNT(*) FROM staff", &[])?,
        appointments_today: count(
            conn,
            "SELECT COUNT(*) FROM appointments WHERE date = ?1 AND status != 'cancelled'",
            &[&today],
        )?,
        appointments_by_status: status_counts(
            conn,
            "SELECT status, COUNT(*) FROM appointments GROUP BY status",
            &[],
        )?,
        pending_feedback: count(
            conn,
            "SELECT COUNT(*) FROM feedback WHERE status = 'pending'",
            &[],
        )?,
        average_rating: conn.query_row("SELECT AVG(rating) FROM feedback", [], |row| row.get(0))?,
    })
}

pub fn doctor_stats(conn: &Connection, doctor_id: i64, today: &NaiveDate) -> anyhow::Result<DoctorStats> {
    let today = date_str(today);

    Ok(DoctorStats {
        appointments_today: count(
            conn,
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1 AND date = ?2 AND status != 'cancelled'",
            &[&doctor_id, &today],
        )?,
        upcoming_appointments: count(conn, UPCOMING_FOR_DOCTOR, &[&doctor_id, &today])?,
        completed_appointments: count(
            conn,
            "SELECT COUNT(*) FROM appointments WHERE doctor_id = ?1 AND status = 'completed'",
            &[&doctor_id],
        )?,
        distinct_patients: count(
            conn,
            "SELECT COUNT(DISTINCT patient_id) FROM appointments WHERE doctor_id = ?1",
            &[&doctor_id],
        )?,
        pending_lab_results: count(
            conn,
            "SELECT COUNT(*) FROM lab_results WHERE doctor_id = ?1 AND status = 'pending'",
            &[&doctor_id],
        )?,
    })
}

pub fn patient_stats(
    conn: &Connection,
    patient_id: i64,
    user_id: i64,
    today: &NaiveDate,
) -> anyhow::Result<PatientStats> {
    let today = date_str(today);

    Ok(PatientStats {
        upcoming_appointments: count(conn, UPCOMING_FOR_PATIENT, &[&patient_id, &today])?,
        active_medications: count(
            conn,
            "SELECT COUNT(*) FROM medications WHERE patient_id = ?1 AND status = 'active'",
            &[&patient_id],
        )?,
        pending_lab_results: count(
            conn,
            "SELECT COUNT(*) FROM lab_results WHERE patient_id = ?1 AND status = 'pending'",
            &[&patient_id],
        )?,
        unread_messages: unread_count(conn, user_id)?,
    })
}

/// Per-doctor appointment counts by status for dates in `[from, to]`.
pub fn appointment_report(
    conn: &Connection,
    from: &NaiveDate,
    to: &NaiveDate,
) -> anyhow::Result<Vec<DoctorAppointmentSummary>> {
    let mut stmt = conn.prepare(
        "SELECT d.id, u.name, a.status, COUNT(a.id)
         FROM doctors d
         JOIN users u ON u.id = d.user_id
         JOIN appointments a ON a.doctor_id = d.id
         WHERE a.date >= ?1 AND a.date <= ?2
         GROUP BY d.id, u.name, a.status
         ORDER BY u.name ASC, d.id ASC",
    )?;
    let rows = stmt.query_map(params![date_str(from), date_str(to)], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, String>(1)?,
            enum_col(row, 2, AppointmentStatus::parse)?,
            row.get::<_, i64>(3)?,
        ))
    })?;

    let mut report: Vec<DoctorAppointmentSummary> = Vec::new();
    for row in rows {
        let (doctor_id, doctor_name, status, n) = row?;
        match report.last_mut() {
            Some(entry) if entry.doctor_id == doctor_id => {
                entry.counts.add(status, n);
                entry.total += n;
            }
            _ => {
                let mut counts = StatusCounts::default();
                counts.add(status, n);
                report.push(DoctorAppointmentSummary {
                    doctor_id,
                    doctor_name,
                    total: n,
                    counts,
                });
            }
        }
    }
    Ok(report)
}
