use crate::{app_state::AppState, content_client::Feed, domain::Post};
use axum::{extract::State, routing::get, Json, Router};

pub fn router() -> Router<AppState> {
    Router::new().route("/api/posts", get(get_posts))
}

/// Always 200: an unreachable content provider yields an empty feed.
#[tracing::instrument(name = "Get posts", skip(app_state))]
async fn get_posts(State(app_state): State<AppState>) -> Json<Vec<Post>> {
    let feed = app_state.content_client.get_posts().await;

    if let Feed::Fetched(posts) = &feed {
        tracing::info!("Fetched {} posts", posts.len());
    }

    Json(feed.into_posts())
}
