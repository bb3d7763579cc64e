use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};

use crate::error::{AppResult, DBError};

pub type IngredientId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
}

/// One entry of the ingredient fixture file.
#[derive(Debug, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}

fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Catalog ordered by name, optionally narrowed to names starting with `prefix`
/// (case-insensitive for any script).
pub async fn list_ingredients(
    pool: &SqlitePool,
    prefix: Option<&str>,
) -> AppResult<Vec<Ingredient>> {
    let pattern = prefix
        .filter(|prefix| !prefix.is_empty())
        .map(|prefix| format!("{}%", escape_like(&prefix.to_lowercase())));

    let ingredients = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, name, measurement_unit
        FROM ingredients
        WHERE $1 IS NULL OR name_lower LIKE $1 ESCAPE '\'
        ORDER BY name, measurement_unit
        "#,
    )
    .bind(pattern)
    .fetch_all(pool)
    .await?;

    Ok(ingredients)
}

pub async fn get_ingredient(pool: &SqlitePool, id: IngredientId) -> AppResult<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        "SELECT id, name, measurement_unit FROM ingredients WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    ingredient.ok_or(DBError::NotFound("Ingredient not found").into())
}

/// The subset of `ids` with no catalog entry.
pub async fn missing_ingredients(
    pool: &SqlitePool,
    ids: &[IngredientId],
) -> AppResult<Vec<IngredientId>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM ingredients WHERE id IN (");
    let mut separated = query.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let found: Vec<IngredientId> = query.build_query_scalar().fetch_all(pool).await?;

    Ok(ids
        .iter()
        .copied()
        .filter(|id| !found.contains(id))
        .collect())
}

/// Inserts the fixture rows, skipping ones already present. Returns how many were new.
pub async fn load_ingredients(pool: &SqlitePool, ingredients: &[NewIngredient]) -> AppResult<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for ingredient in ingredients {
        let name = ingredient.name.trim();
        inserted += sqlx::query(
            "
            INSERT OR IGNORE INTO ingredients (name, name_lower, measurement_unit)
            VALUES ($1, $2, $3)
            ",
        )
        .bind(name)
        .bind(name.to_lowercase())
        .bind(ingredient.measurement_unit.trim())
        .execute(&mut *tx)
        .await?
        .rows_affected();
    }

    tx.commit().await?;
    tracing::info!(inserted, total = ingredients.len(), "loaded ingredients");

    Ok(inserted)
}
