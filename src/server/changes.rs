use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};

use crate::server::AppState;
use crate::server::dto::ChangeSetParams;
use crate::server::response::{ApiError, ApiResponse};

pub fn changes_router() -> Router<Arc<AppState>> {
    Router::new().route("/changes", get(get_change_set))
}

async fn get_change_set(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ChangeSetParams>,
) -> impl IntoResponse {
    let change_set = state.changes.change_set(params.since)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(change_set)))
}
