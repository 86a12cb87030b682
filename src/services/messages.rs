use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Message, NewMessage};
use crate::services::identity::Caller;
use crate::services::invalidation::invalidate;
use crate::state::AppState;

const MAX_SUBJECT_LEN: usize = 200;

fn list_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(50).clamp(1, 500)
}

pub fn send_message(state: &AppState, caller: &Caller, input: NewMessage) -> Result<Message, AppError> {
    let subject = input.subject.trim();
    let body = input.body.trim();
    if subject.is_empty() || body.is_empty() {
        return Err(AppError::invalid("subject and body are required"));
    }
    if subject.chars().count() > MAX_SUBJECT_LEN {
        return Err(AppError::invalid(format!(
            "subject is longer than {MAX_SUBJECT_LEN} characters"
        )));
    }
    if input.recipient_id == caller.user_id {
        return Err(AppError::invalid("you cannot message yourself"));
    }

    let message = {
        let db = state.db()?;
        queries::get_user(&db, input.recipient_id)?.ok_or_else(|| AppError::not_found("recipient"))?;
        let id = queries::create_message(&db, caller.user_id, input.recipient_id, subject, body)?;
        queries::get_message(&db, id)?.ok_or_else(|| AppError::not_found("message"))?
    };

    tracing::info!(
        message_id = message.id,
        sender_id = message.sender_id,
        recipient_id = message.recipient_id,
        "message sent"
    );
    invalidate(state, [format!("/messages/{}", message.recipient_id)]);
    Ok(message)
}

pub fn inbox(state: &AppState, caller: &Caller, limit: Option<i64>) -> Result<Vec<Message>, AppError> {
    let db = state.db()?;
    Ok(queries::list_inbox(&db, caller.user_id, list_limit(limit))?)
}

pub fn sent(state: &AppState, caller: &Caller, limit: Option<i64>) -> Result<Vec<Message>, AppError> {
    let db = state.db()?;
    Ok(queries::list_sent(&db, caller.user_id, list_limit(limit))?)
}

pub fn unread_count(state: &AppState, caller: &Caller) -> Result<i64, AppError> {
    let db = state.db()?;
    Ok(queries::unread_count(&db, caller.user_id)?)
}

/// Only the recipient can mark a message read.
pub fn mark_read(state: &AppState, caller: &Caller, id: i64) -> Result<Message, AppError> {
    let message = {
        let db = state.db()?;
        let message = queries::get_message(&db, id)?.ok_or_else(|| AppError::not_found("message"))?;
        if message.recipient_id != caller.user_id {
            tracing::warn!(user_id = caller.user_id, message_id = id, "mark read by non-recipient");
            return Err(AppError::forbidden("only the recipient can mark a message read"));
        }
        if !message.is_read {
            queries::mark_message_read(&db, id)?;
        }
        Message {
            is_read: true,
            ..message
        }
    };

    invalidate(state, [format!("/messages/{}", caller.user_id)]);
    Ok(message)
}
