use sqlx::SqlitePool;

use crate::error::{AppResult, DBError};

use super::{RecipeId, UserId};

/// Per-user recipe sets that share the same `(user_id, recipe_id)` shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Favorites,
    ShoppingCart,
}

impl Collection {
    pub(crate) fn table(self) -> &'static str {
        match self {
            Collection::Favorites => "favorites",
            Collection::ShoppingCart => "carts",
        }
    }

    fn duplicate_message(self) -> &'static str {
        match self {
            Collection::Favorites => "Recipe is already in favorites",
            Collection::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            Collection::Favorites => "Recipe is not in favorites",
            Collection::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub async fn add_to_collection(
    pool: &SqlitePool,
    collection: Collection,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<()> {
    let inserted = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?
    .rows_affected();

    match inserted {
        0 => Err(DBError::AlreadyExists(collection.duplicate_message()).into()),
        _ => Ok(()),
    }
}

pub async fn remove_from_collection(
    pool: &SqlitePool,
    collection: Collection,
    user_id: UserId,
    recipe_id: RecipeId,
) -> AppResult<()> {
    let deleted = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await?
    .rows_affected();

    match deleted {
        0 => Err(DBError::NotFound(collection.missing_message()).into()),
        _ => Ok(()),
    }
}
