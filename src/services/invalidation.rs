use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Pages whose cached rendering is stale after a mutation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Invalidation {
    pub paths: Vec<String>,
    pub at: String,
}

pub fn invalidate<I, S>(state: &AppState, paths: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
    if paths.is_empty() {
        return;
    }

    tracing::debug!(?paths, "invalidating cached pages");
    let event = Invalidation {
        paths,
        at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    // No subscribers is fine
    let _ = state.invalidation_tx.send(event);
}

pub fn appointment_paths(appointment_id: i64, doctor_id: i64) -> Vec<String> {
    vec![
        "/appointments".to_string(),
        format!("/appointments/{appointment_id}"),
        format!("/doctors/{doctor_id}/slots"),
        "/dashboard".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_appointment_paths() {
        let paths = appointment_paths(7, 3);
        assert!(paths.contains(&"/appointments/7".to_string()));
        assert!(paths.contains(&"/doctors/3/slots".to_string()));
        assert!(paths.contains(&"/dashboard".to_string()));
    }
}
