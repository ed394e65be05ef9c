use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use super::errors::ApiError;
use super::state::{GuardedLibrary, ServerState};
use crate::library::SongRow;

#[derive(Serialize)]
struct SearchResponse {
    songs: Vec<SongRow>,
}

fn parse_song_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found(format!("song with id {} does not exist", raw)))
}

async fn search_songs(
    State(library): State<GuardedLibrary>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filter = match body.get("filter") {
        None => return Err(ApiError::bad_request("filter is missing")),
        Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.as_str()),
        Some(_) => return Err(ApiError::bad_request("filter must be a string")),
    };

    let songs = match filter {
        Some(text) if !text.trim().is_empty() => library.search(text)?,
        _ => {
            debug!("Empty filter, returning no songs");
            Vec::new()
        }
    };
    Ok(Json(SearchResponse { songs }).into_response())
}

async fn get_song(
    State(library): State<GuardedLibrary>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_song_id(&id)?;
    Ok(Json(library.fetch_by_id(id)?).into_response())
}

async fn get_song_attribute(
    State(library): State<GuardedLibrary>,
    Path((id, attribute)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let id = parse_song_id(&id)?;
    let (name, value) = library.fetch_attribute(id, &attribute)?;

    let mut body = Map::new();
    body.insert(name.to_string(), serde_json::to_value(value).unwrap_or(Value::Null));
    body.insert("id".to_string(), Value::from(id));
    Ok(Json(Value::Object(body)).into_response())
}

pub(super) fn make_song_routes(state: ServerState) -> Router {
    Router::new()
        .route("/song", post(search_songs))
        .route("/song/{id}", get(get_song))
        .route("/song/{id}/{attribute}", get(get_song_attribute))
        .with_state(state)
}
