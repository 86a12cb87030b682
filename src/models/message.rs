use serde::{Deserialize, Serialize};

/// A message joined with both parties' names.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub sender_id: i64,
    pub sender_name: String,
    pub recipient_id: i64,
    pub recipient_name: String,
    pub subject: String,
    pub body: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewMessage {
    pub recipient_id: i64,
    pub subject: String,
    pub body: String,
}
