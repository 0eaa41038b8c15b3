//! Remote store synchronization endpoints

use std::{convert::Infallible, time::Duration};

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};

use crate::{error::AppResult, sync::SyncStatus};

/// Student writes waiting for the store
#[utoipa::path(
    get,
    path = "/sync/status",
    tag = "sync",
    responses(
        (status = 200, description = "Pending writes", body = SyncStatus)
    )
)]
pub async fn get_status(State(state): State<crate::AppState>) -> AppResult<Json<SyncStatus>> {
    let status = state.services.sync.status().await?;
    Ok(Json(status))
}

/// Retry pending writes now
#[utoipa::path(
    post,
    path = "/sync/retry",
    tag = "sync",
    responses(
        (status = 200, description = "Writes still pending after the retry", body = SyncStatus)
    )
)]
pub async fn retry(State(state): State<crate::AppState>) -> AppResult<Json<SyncStatus>> {
    let status = state.services.sync.retry_pending().await?;
    Ok(Json(status))
}

/// Stream of write outcomes, as server-sent events
#[utoipa::path(
    get,
    path = "/sync/events",
    tag = "sync",
    responses(
        (status = 200, description = "Event stream of SyncEvent", body = String, content_type = "text/event-stream")
    )
)]
pub async fn events(
    State(state): State<crate::AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.services.sync.subscribe()).filter_map(|received| {
        match received {
            Ok(event) => Event::default().event("sync").json_data(&event).ok().map(Ok),
            Err(e) => {
                tracing::debug!("Sync event subscriber dropped events: {}", e);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
