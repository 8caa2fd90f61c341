use crate::{
    app_state::AppState,
    storage::StorageError,
    utils::{e500, HttpError},
};
use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api/visitor-count",
        get(get_visitor_count).post(increment_visitor_count),
    )
}

#[derive(Serialize)]
struct VisitorCount {
    count: i32,
}

#[tracing::instrument(name = "Increment visitor count", skip(app_state))]
async fn increment_visitor_count(
    State(app_state): State<AppState>,
) -> Result<Json<VisitorCount>, HttpError<StorageError>> {
    let count = app_state
        .storage
        .increment_visitor_count()
        .await
        .map_err(e500("Failed to increment visitor count."))?;

    Ok(Json(VisitorCount { count }))
}

#[tracing::instrument(name = "Get visitor count", skip(app_state))]
async fn get_visitor_count(
    State(app_state): State<AppState>,
) -> Result<Json<VisitorCount>, HttpError<StorageError>> {
    let count = app_state
        .storage
        .get_visitor_count()
        .await
        .map_err(e500("Failed to get visitor count."))?;

    Ok(Json(VisitorCount { count }))
}
