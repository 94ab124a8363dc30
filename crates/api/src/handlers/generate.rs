//! Handlers for layout generation jobs: create, status and log streaming.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use copilot_core::error::CoreError;
use copilot_core::job::GenerateRequest;
use copilot_core::job_events::{SSE_EVENT_COMPLETE, SSE_EVENT_LOG};
use copilot_core::types::JobId;
use copilot_events::{LogEvent, Subscription};
use futures::stream::{self, Stream, StreamExt};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a job id path segment. Malformed ids are reported as unknown jobs.
pub(crate) fn parse_job_id(raw: &str) -> Result<JobId, AppError> {
    raw.parse().map_err(|_| job_not_found(raw))
}

pub(crate) fn job_not_found(id: impl ToString) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Job",
        id: id.to_string(),
    })
}

/// SSE `data` fields cannot carry carriage returns; progress-bar output
/// uses them, so they become line breaks on the wire.
fn log_event(line: &str) -> Event {
    Event::default()
        .event(SSE_EVENT_LOG)
        .data(line.replace('\r', "\n"))
}

fn complete_event(status: &str) -> Event {
    Event::default().event(SSE_EVENT_COMPLETE).data(status)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/generate
///
/// Create a job and start its generator in the background. Responds as
/// soon as the job is registered; progress is observed via the stream.
pub async fn create_job(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> AppResult<impl IntoResponse> {
    let job = state.engine.create(&request).await?;
    let _handle = state.engine.start(job.job_id, request);

    tracing::info!(job_id = %job.job_id, "Generation job accepted");

    Ok((StatusCode::CREATED, Json(DataResponse { data: job })))
}

/// GET /api/generate/{id}/status
pub async fn job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let job_id = parse_job_id(&id)?;
    let job = state
        .engine
        .get(job_id)
        .await
        .ok_or_else(|| job_not_found(job_id))?;

    Ok(Json(DataResponse { data: job }))
}

/// GET /api/generate/{id}/stream
///
/// Server-sent events: one `log` event per line of history, then each live
/// line, then a single `complete` event whose data is the final status.
/// The subscription is released when the client disconnects.
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let job_id = parse_job_id(&id)?;
    let log_stream = state
        .engine
        .open_log_stream(job_id)
        .await
        .ok_or_else(|| job_not_found(job_id))?;

    tracing::debug!(
        job_id = %job_id,
        replayed = log_stream.history.len(),
        "Log stream opened",
    );

    let history = stream::iter(log_stream.history)
        .map(|line| Ok::<_, Infallible>(log_event(&line)));
    let live = live_events(log_stream.subscription);

    Ok(Sse::new(history.chain(live)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    ))
}

/// Live part of a log stream, ending after the `complete` event.
fn live_events(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some(subscription), |state| async move {
        let mut subscription = state?;
        match subscription.recv().await? {
            LogEvent::Line(line) => Some((Ok(log_event(&line)), Some(subscription))),
            LogEvent::End(status) => {
                tracing::debug!(
                    job_id = %subscription.job_id(),
                    status = %status,
                    "Log stream complete",
                );
                Some((Ok(complete_event(status.as_str())), None))
            }
        }
    })
}
