use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
};
use sqlx::SqlitePool;

use crate::{
    db::{self, RecipeId},
    error::AppResult,
};

// GET /s/:id/
pub async fn short_link(
    State(pool): State<SqlitePool>,
    Path(id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    db::get_recipe_short(&pool, id).await?;

    Ok((
        StatusCode::FOUND,
        [(header::LOCATION, format!("/recipes/{id}"))],
    ))
}
