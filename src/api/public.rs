use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};

use super::AppState;
use crate::curriculum::Chapter;

#[utoipa::path(
    get,
    path = "/api/curriculum",
    responses(
        (status = 200, description = "Chapters and lessons in teaching order", body = Vec<Chapter>)
    )
)]
pub async fn get_curriculum(State(state): State<Arc<AppState>>) -> Json<Vec<Chapter>> {
    Json(state.catalog.chapters().to_vec())
}

pub fn get_public_scope() -> Router<Arc<AppState>> {
    Router::new().route("/curriculum", get(get_curriculum))
}
