use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::status::Lifecycle;

// ── Medical Records ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub appointment_id: Option<i64>,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub record_date: NaiveDate,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicalRecord {
    pub patient_id: i64,
    /// Required when staff or an admin file a record on a doctor's behalf.
    pub doctor_id: Option<i64>,
    pub appointment_id: Option<i64>,
    pub diagnosis: String,
    pub treatment: Option<String>,
    pub notes: Option<String>,
    pub record_date: Option<NaiveDate>,
}

// ── Medications ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: MedicationStatus,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MedicationStatus {
    Active,
    Completed,
    Discontinued,
}

impl MedicationStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(MedicationStatus::Active),
            "completed" => Some(MedicationStatus::Completed),
            "discontinued" => Some(MedicationStatus::Discontinued),
            _ => None,
        }
    }
}

impl Lifecycle for MedicationStatus {
    fn as_str(&self) -> &'static str {
        match self {
            MedicationStatus::Active => "active",
            MedicationStatus::Completed => "completed",
            MedicationStatus::Discontinued => "discontinued",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        match self {
            MedicationStatus::Active => &[MedicationStatus::Completed, MedicationStatus::Discontinued],
            MedicationStatus::Completed | MedicationStatus::Discontinued => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMedication {
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicationStatusUpdate {
    pub status: MedicationStatus,
    pub end_date: Option<NaiveDate>,
}

// ── Lab Results ──

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabResult {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub test_name: String,
    pub result: Option<String>,
    pub normal_range: Option<String>,
    pub status: LabResultStatus,
    pub test_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabResultStatus {
    Pending,
    Completed,
    Reviewed,
}

impl LabResultStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(LabResultStatus::Pending),
            "completed" => Some(LabResultStatus::Completed),
            "reviewed" => Some(LabResultStatus::Reviewed),
            _ => None,
        }
    }
}

impl Lifecycle for LabResultStatus {
    fn as_str(&self) -> &'static str {
        match self {
            LabResultStatus::Pending => "pending",
            LabResultStatus::Completed => "completed",
            LabResultStatus::Reviewed => "reviewed",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        match self {
            LabResultStatus::Pending => &[LabResultStatus::Completed],
            LabResultStatus::Completed => &[LabResultStatus::Reviewed],
            LabResultStatus::Reviewed => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLabResult {
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub test_name: String,
    pub normal_range: Option<String>,
    pub test_date: NaiveDate,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LabResultUpdate {
    pub result: Option<String>,
    pub status: Option<LabResultStatus>,
    pub notes: Option<String>,
}
