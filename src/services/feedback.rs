use crate::db::queries;
use crate::errors::{ensure_transition, AppError};
use crate::models::{Feedback, FeedbackStatus, FeedbackUpdate, NewFeedback, Role};
use crate::services::identity::Caller;
use crate::services::invalidation::invalidate;
use crate::services::policy::{Operation, Owners, Scope};
use crate::state::AppState;

pub fn submit_feedback(
    state: &AppState,
    caller: &Caller,
    input: NewFeedback,
) -> Result<Feedback, AppError> {
    caller.scope_for(Operation::SubmitFeedback)?;
    let patient_id = caller.own_patient_id()?;

    if !(1..=5).contains(&input.rating) {
        return Err(AppError::invalid("rating must be between 1 and 5"));
    }
    let comment = input.comment.trim();
    if comment.is_empty() {
        return Err(AppError::invalid("comment is required"));
    }

    let feedback = {
        let db = state.db()?;
        if let Some(doctor_id) = input.doctor_id {
            queries::get_doctor(&db, doctor_id)?.ok_or_else(|| AppError::not_found("doctor"))?;
        }
        let id = queries::create_feedback(&db, patient_id, input.doctor_id, input.rating, comment)?;
        queries::get_feedback(&db, id)?.ok_or_else(|| AppError::not_found("feedback"))?
    };

    tracing::info!(feedback_id = feedback.id, rating = feedback.rating, "feedback submitted");
    invalidate(state, ["/feedback", "/dashboard"]);
    Ok(feedback)
}

/// Patients see only what they submitted; doctors see what was written about them.
pub fn list_feedback(
    state: &AppState,
    caller: &Caller,
    status: Option<FeedbackStatus>,
    limit: Option<i64>,
) -> Result<Vec<Feedback>, AppError> {
    let scope = caller.scope_for(Operation::ReadFeedback)?;
    let limit = limit.unwrap_or(100).clamp(1, 500);
    let db = state.db()?;

    match (scope, caller.role) {
        (Scope::Any, _) => Ok(queries::list_feedback(&db, None, status, limit)?),
        (_, Role::Doctor) => {
            let doctor_id = caller.own_doctor_id()?;
            let about_me = queries::list_feedback(&db, None, status, limit)?
                .into_iter()
                .filter(|f| f.doctor_id == Some(doctor_id))
                .collect();
            Ok(about_me)
        }
        _ => Ok(queries::list_feedback(
            &db,
            Some(caller.own_patient_id()?),
            status,
            limit,
        )?),
    }
}

pub fn get_feedback(state: &AppState, caller: &Caller, id: i64) -> Result<Feedback, AppError> {
    let db = state.db()?;
    let feedback = queries::get_feedback(&db, id)?.ok_or_else(|| AppError::not_found("feedback"))?;
    caller.authorize(
        Operation::ReadFeedback,
        &Owners {
            patient_id: Some(feedback.patient_id),
            doctor_id: feedback.doctor_id,
        },
    )?;
    Ok(feedback)
}

pub fn update_feedback(
    state: &AppState,
    caller: &Caller,
    id: i64,
    update: FeedbackUpdate,
) -> Result<Feedback, AppError> {
    caller.scope_for(Operation::ManageFeedback)?;
    if update.status.is_none() && update.response.is_none() {
        return Err(AppError::invalid("no fields to update"));
    }

    let feedback = {
        let db = state.db()?;
        let mut feedback =
            queries::get_feedback(&db, id)?.ok_or_else(|| AppError::not_found("feedback"))?;
        if let Some(status) = update.status {
            ensure_transition(feedback.status, status)?;
            feedback.status = status;
        }
        if let Some(response) = update.response {
            feedback.response = Some(response);
        }
        queries::save_feedback(&db, &feedback)?;
        feedback
    };

    tracing::info!(
        feedback_id = id,
        status = ?feedback.status,
        handled_by = caller.user_id,
        "feedback updated"
    );
    invalidate(state, ["/feedback", "/dashboard"]);
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testutils::Fixture;

    fn review(doctor_id: Option<i64>, rating: i32) -> NewFeedback {
        NewFeedback {
            doctor_id,
            rating,
            comment: "Short wait, friendly staff.".to_string(),
        }
    }

    #[test]
    fn test_only_patients_submit() {
        let fx = Fixture::new();
        let fb = submit_feedback(&fx.state, &fx.patient, review(Some(fx.doctor_id), 5)).unwrap();
        assert_eq!(fb.patient_id, fx.patient_id);
        assert_eq!(fb.status, FeedbackStatus::Pending);

        for caller in [&fx.admin, &fx.staff, &fx.doctor] {
            assert!(matches!(
                submit_feedback(&fx.state, caller, review(None, 4)),
                Err(AppError::Forbidden(_))
            ));
        }
    }

    #[test]
    fn test_rating_bounds() {
        let fx = Fixture::new();
        for rating in [0, 6, -1] {
            assert!(matches!(
                submit_feedback(&fx.state, &fx.patient, review(None, rating)),
                Err(AppError::Invalid(_))
            ));
        }
        assert!(matches!(
            submit_feedback(&fx.state, &fx.patient, review(Some(4242), 3)),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_staff_moves_feedback_through_lifecycle() {
        let fx = Fixture::new();
        let fb = submit_feedback(&fx.state, &fx.patient, review(None, 2)).unwrap();

        let reviewed = update_feedback(
            &fx.state,
            &fx.staff,
            fb.id,
            FeedbackUpdate {
                status: Some(FeedbackStatus::Reviewed),
                response: Some("Sorry about the wait.".to_string()),
            },
        )
        .unwrap();
        assert_eq!(reviewed.status, FeedbackStatus::Reviewed);

        let err = update_feedback(
            &fx.state,
            &fx.staff,
            fb.id,
            FeedbackUpdate {
                status: Some(FeedbackStatus::Pending),
                response: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidTransition { .. }));

        assert!(matches!(
            update_feedback(&fx.state, &fx.patient, fb.id, FeedbackUpdate::default()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_feedback_visibility() {
        let fx = Fixture::new();
        let mine = submit_feedback(&fx.state, &fx.patient, review(Some(fx.doctor_id), 5)).unwrap();
        submit_feedback(&fx.state, &fx.other_patient, review(None, 3)).unwrap();

        assert_eq!(list_feedback(&fx.state, &fx.patient, None, None).unwrap().len(), 1);
        assert_eq!(list_feedback(&fx.state, &fx.staff, None, None).unwrap().len(), 2);
        assert_eq!(
            list_feedback(&fx.state, &fx.admin, Some(FeedbackStatus::Resolved), None)
                .unwrap()
                .len(),
            0
        );

        assert!(get_feedback(&fx.state, &fx.doctor, mine.id).is_ok());
        assert_eq!(list_feedback(&fx.state, &fx.doctor, None, None).unwrap().len(), 1);
        assert!(list_feedback(&fx.state, &fx.other_doctor, None, None).unwrap().is_empty());
        assert!(matches!(
            get_feedback(&fx.state, &fx.other_patient, mine.id),
            Err(AppError::Forbidden(_))
        ));
    }
}
