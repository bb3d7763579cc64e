use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    db::{self, Ingredient, IngredientId},
    error::AppResult,
};

#[derive(Debug, Default, Deserialize)]
pub struct IngredientSearch {
    #[serde(default)]
    name: Option<String>,
}

// GET /api/ingredients/
pub async fn list_ingredients(
    State(pool): State<SqlitePool>,
    Query(search): Query<IngredientSearch>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let prefix = search.name.as_deref().map(str::trim);

    Ok(Json(db::list_ingredients(&pool, prefix).await?))
}

// GET /api/ingredients/:id/
pub async fn get_ingredient(
    State(pool): State<SqlitePool>,
    Path(id): Path<IngredientId>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(db::get_ingredient(&pool, id).await?))
}
