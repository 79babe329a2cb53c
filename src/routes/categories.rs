use axum::{Json, Router, extract::State, routing::get};

use crate::{
    error::AppResult,
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List categories", body = ApiResponse<Vec<Category>>),
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<Category>>>> {
    let items = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY id")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Categories",
        items,
        Some(Meta::empty()),
    )))
}
