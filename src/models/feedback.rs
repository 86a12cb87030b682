use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::status::Lifecycle;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: Option<i64>,
    pub rating: i32,
    pub comment: String,
    pub status: FeedbackStatus,
    pub response: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackStatus {
    Pending,
    Reviewed,
    Resolved,
}

impl FeedbackStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(FeedbackStatus::Pending),
            "reviewed" => Some(FeedbackStatus::Reviewed),
            "resolved" => Some(FeedbackStatus::Resolved),
            _ => None,
        }
    }
}

impl Lifecycle for FeedbackStatus {
    fn as_str(&self) -> &'static str {
        match self {
            FeedbackStatus::Pending => "pending",
            FeedbackStatus::Reviewed => "reviewed",
            FeedbackStatus::Resolved => "resolved",
        }
    }

    fn next_states(&self) -> &'static [Self] {
        match self {
            FeedbackStatus::Pending => &[FeedbackStatus::Reviewed, FeedbackStatus::Resolved],
            FeedbackStatus::Reviewed => &[FeedbackStatus::Resolved],
            FeedbackStatus::Resolved => &[],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewFeedback {
    pub doctor_id: Option<i64>,
    pub rating: i32,
    pub comment: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackUpdate {
    pub status: Option<FeedbackStatus>,
    pub response: Option<String>,
}
