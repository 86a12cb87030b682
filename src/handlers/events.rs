use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use serde::Deserialize;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, IntervalStream};
use tokio_stream::StreamExt;

use crate::errors::AppError;
use crate::handlers::extract::ApiQuery;
use crate::services::identity::authenticate_token;
use crate::state::AppState;

const KEEPALIVE_SECS: u64 = 30;

// GET /api/events?token=... (EventSource can't set headers)
#[derive(Deserialize)]
pub struct EventsQuery {
    pub token: Option<String>,
}

pub async fn invalidation_stream(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<EventsQuery>,
) -> Result<Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>>, AppError> {
    let token = query.token.as_deref().unwrap_or("");
    let caller = authenticate_token(&state, token).await?;
    tracing::debug!(user_id = caller.user_id, "invalidation stream opened");

    let rx = state.invalidation_tx.subscribe();
    let live_stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => match Event::default().event("invalidate").json_data(&event) {
            Ok(event) => Some(Ok::<_, Infallible>(event)),
            Err(e) => {
                tracing::error!(error = %e, "failed to encode invalidation event");
                None
            }
        },
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "invalidation subscriber lagged");
            None
        }
    });

    let keepalive_stream = IntervalStream::new(tokio::time::interval(Duration::from_secs(
        KEEPALIVE_SECS,
    )))
    .map(|_| Ok::<_, Infallible>(Event::default().comment("keepalive")));

    Ok(Sse::new(live_stream.merge(keepalive_stream)))
}
