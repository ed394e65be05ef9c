use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use super::errors::ApiError;
use super::state::{GuardedLibrary, OptionalSchedulerHandle, ServerState};
use crate::background_jobs::{jobs::REINDEX_JOB_ID, JobError};

#[derive(Serialize)]
struct KeysResponse {
    keys: Vec<&'static str>,
}

#[derive(Serialize)]
struct ReindexResponse {
    job: &'static str,
    /// False when a pass was already running and no new one was started.
    started: bool,
}

async fn get_info(State(library): State<GuardedLibrary>) -> Result<Response, ApiError> {
    Ok(Json(library.info()?).into_response())
}

async fn get_keys(State(library): State<GuardedLibrary>) -> Response {
    Json(KeysResponse {
        keys: library.list_attribute_names(),
    })
    .into_response()
}

async fn post_reindex(
    State(scheduler): State<OptionalSchedulerHandle>,
) -> Result<Response, ApiError> {
    let Some(scheduler) = scheduler else {
        return Err(ApiError::unavailable("background jobs are not running"));
    };
    let started = match scheduler.trigger(REINDEX_JOB_ID).await {
        Ok(()) => true,
        Err(JobError::AlreadyRunning) => false,
        Err(e) => return Err(ApiError::unavailable(e.to_string())),
    };
    info!("Manual reindex requested, started: {}", started);
    Ok((
        StatusCode::ACCEPTED,
        Json(ReindexResponse {
            job: REINDEX_JOB_ID,
            started,
        }),
    )
        .into_response())
}

pub(super) fn make_admin_routes(state: ServerState) -> Router {
    Router::new()
        .route("/info", get(get_info))
        .route("/keys", get(get_keys))
        .route("/reindex", post(post_reindex))
        .with_state(state)
}
