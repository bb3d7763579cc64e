use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::{
    error::{AppResult, DBError},
    shopping_list::CartLine,
};

use super::{IngredientId, UserId, UserProfile};

pub type RecipeId = i64;

/// `$1` is the viewing user (or NULL).
const RECIPE_SELECT: &str = "
    SELECT
        recipes.id,
        recipes.name,
        recipes.image,
        recipes.text,
        recipes.cooking_time,
        users.id AS author_id,
        users.email AS author_email,
        users.username AS author_username,
        users.first_name AS author_first_name,
        users.last_name AS author_last_name,
        users.avatar AS author_avatar,
        EXISTS (
            SELECT 1 FROM follows
            WHERE follows.follower_id = $1 AND follows.followee_id = users.id
        ) AS author_is_subscribed,
        EXISTS (
            SELECT 1 FROM favorites
            WHERE favorites.user_id = $1 AND favorites.recipe_id = recipes.id
        ) AS is_favorited,
        EXISTS (
            SELECT 1 FROM carts
            WHERE carts.user_id = $1 AND carts.recipe_id = recipes.id
        ) AS is_in_shopping_cart
    FROM recipes
    INNER JOIN users ON users.id = recipes.author_id";

#[derive(Debug, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub author: UserProfile,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct RecipeIngredient {
    pub id: IngredientId,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Compact form used by favorites, the cart and subscription listings.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct RecipeShort {
    pub id: RecipeId,
    pub name: String,
    pub image: String,
    pub cooking_time: i64,
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: RecipeId,
    name: String,
    image: String,
    text: String,
    cooking_time: i64,
    author_id: UserId,
    author_email: String,
    author_username: String,
    author_first_name: String,
    author_last_name: String,
    author_avatar: Option<String>,
    author_is_subscribed: bool,
    is_favorited: bool,
    is_in_shopping_cart: bool,
}

impl RecipeRow {
    fn into_recipe(self, ingredients: Vec<RecipeIngredient>) -> Recipe {
        Recipe {
            id: self.id,
            author: UserProfile {
                email: self.author_email,
                id: self.author_id,
                username: self.author_username,
                first_name: self.author_first_name,
                last_name: self.author_last_name,
                is_subscribed: self.author_is_subscribed,
                avatar: self.author_avatar,
            },
            ingredients,
            is_favorited: self.is_favorited,
            is_in_shopping_cart: self.is_in_shopping_cart,
            name: self.name,
            image: self.image,
            text: self.text,
            cooking_time: self.cooking_time,
        }
    }
}

#[derive(Debug, FromRow)]
struct IngredientRow {
    recipe_id: RecipeId,
    #[sqlx(flatten)]
    ingredient: RecipeIngredient,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngredientAmount {
    pub id: IngredientId,
    pub amount: i64,
}

pub struct NewRecipe {
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i64,
    pub ingredients: Vec<IngredientAmount>,
}

/// `None` keeps the stored value; the ingredient list is always replaced.
pub struct RecipeChanges {
    pub name: Option<String>,
    pub image: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i64>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Listing filters. `favorited_by` / `in_cart_of` restrict to one user's collection.
#[derive(Debug, Default)]
pub struct RecipeFilter {
    pub author: Option<UserId>,
    pub favorited_by: Option<UserId>,
    pub in_cart_of: Option<UserId>,
}

async fn recipe_ingredients(
    pool: &SqlitePool,
    recipe_ids: &[RecipeId],
) -> AppResult<HashMap<RecipeId, Vec<RecipeIngredient>>> {
    let mut by_recipe: HashMap<RecipeId, Vec<RecipeIngredient>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(by_recipe);
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "
        SELECT
            recipe_ingredients.recipe_id,
            ingredients.id,
            ingredients.name,
            ingredients.measurement_unit,
            recipe_ingredients.amount
        FROM recipe_ingredients
        INNER JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE recipe_ingredients.recipe_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in recipe_ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(") ORDER BY ingredients.name");

    let rows: Vec<IngredientRow> = query.build_query_as().fetch_all(pool).await?;
    for row in rows {
        by_recipe.entry(row.recipe_id).or_default().push(row.ingredient);
    }

    Ok(by_recipe)
}

async fn attach_ingredients(pool: &SqlitePool, rows: Vec<RecipeRow>) -> AppResult<Vec<Recipe>> {
    let ids = rows.iter().map(|row| row.id).collect::<Vec<RecipeId>>();
    let mut ingredients = recipe_ingredients(pool, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let list = ingredients.remove(&row.id).unwrap_or_default();
            row.into_recipe(list)
        })
        .collect())
}

pub async fn retrieve_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
    user_id: Option<UserId>,
) -> AppResult<Recipe> {
    let row = sqlx::query_as::<_, RecipeRow>(&format!("{RECIPE_SELECT} WHERE recipes.id = $2"))
        .bind(user_id)
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    let Some(row) = row else {
        return Err(DBError::NotFound("Recipe not found").into());
    };

    let mut recipes = attach_ingredients(pool, vec![row]).await?;
    recipes.pop().ok_or(DBError::NotFound("Recipe not found").into())
}

const FILTER_CLAUSE: &str = "
    WHERE ($2 IS NULL OR recipes.author_id = $2)
        AND ($3 IS NULL OR EXISTS (
            SELECT 1 FROM favorites
            WHERE favorites.user_id = $3 AND favorites.recipe_id = recipes.id
        ))
        AND ($4 IS NULL OR EXISTS (
            SELECT 1 FROM carts
            WHERE carts.user_id = $4 AND carts.recipe_id = recipes.id
        ))";

pub async fn list_recipes(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    user_id: Option<UserId>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, RecipeRow>(&format!(
        "{RECIPE_SELECT} {FILTER_CLAUSE} ORDER BY recipes.id DESC LIMIT $5 OFFSET $6"
    ))
    .bind(user_id)
    .bind(filter.author)
    .bind(filter.favorited_by)
    .bind(filter.in_cart_of)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    attach_ingredients(pool, rows).await
}

pub async fn count_recipes(
    pool: &SqlitePool,
    filter: &RecipeFilter,
    user_id: Option<UserId>,
) -> AppResult<i64> {
    let count = sqlx::query_scalar(&format!(
        "SELECT COUNT(*) FROM ({RECIPE_SELECT} {FILTER_CLAUSE})"
    ))
    .bind(user_id)
    .bind(filter.author)
    .bind(filter.favorited_by)
    .bind(filter.in_cart_of)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

pub async fn recipe_author(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<UserId> {
    let author = sqlx::query_scalar("SELECT author_id FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .fetch_optional(pool)
        .await?;

    author.ok_or(DBError::NotFound("Recipe not found").into())
}

pub async fn get_recipe_short(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<RecipeShort> {
    let recipe = sqlx::query_as::<_, RecipeShort>(
        "SELECT id, name, image, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    recipe.ok_or(DBError::NotFound("Recipe not found").into())
}

/// Newest first; `limit` of `None` returns everything.
pub async fn list_author_recipes(
    pool: &SqlitePool,
    author_id: UserId,
    limit: Option<i64>,
) -> AppResult<Vec<RecipeShort>> {
    let recipes = sqlx::query_as::<_, RecipeShort>(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY id DESC
        LIMIT $2
        ",
    )
    .bind(author_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(recipes)
}

pub async fn count_author_recipes(pool: &SqlitePool, author_id: UserId) -> AppResult<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(pool)
            .await?,
    )
}

async fn insert_ingredients(
    conn: &mut SqliteConnection,
    recipe_id: RecipeId,
    ingredients: &[IngredientAmount],
) -> AppResult<()> {
    for ingredient in ingredients {
        sqlx::query(
            "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) VALUES ($1, $2, $3)",
        )
        .bind(recipe_id)
        .bind(ingredient.id)
        .bind(ingredient.amount)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

pub async fn create_recipe(
    pool: &SqlitePool,
    author_id: UserId,
    recipe: NewRecipe,
) -> AppResult<RecipeId> {
    let mut tx = pool.begin().await?;

    let recipe_id: RecipeId = sqlx::query_scalar(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await?;

    insert_ingredients(&mut tx, recipe_id, &recipe.ingredients).await?;
    tx.commit().await?;

    tracing::info!(recipe_id, author_id, "recipe created");
    Ok(recipe_id)
}

pub async fn update_recipe(
    pool: &SqlitePool,
    recipe_id: RecipeId,
    changes: RecipeChanges,
) -> AppResult<()> {
    let mut tx = pool.begin().await?;

    let updated = sqlx::query(
        "
        UPDATE recipes
        SET name = COALESCE($1, name),
            image = COALESCE($2, image),
            text = COALESCE($3, text),
            cooking_time = COALESCE($4, cooking_time)
        WHERE id = $5
        ",
    )
    .bind(changes.name)
    .bind(changes.image)
    .bind(changes.text)
    .bind(changes.cooking_time)
    .bind(recipe_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if updated == 0 {
        return Err(DBError::NotFound("Recipe not found").into());
    }

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await?;
    insert_ingredients(&mut tx, recipe_id, &changes.ingredients).await?;

    tx.commit().await?;
    Ok(())
}

pub async fn delete_recipe(pool: &SqlitePool, recipe_id: RecipeId) -> AppResult<()> {
    let deleted = sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await?
        .rows_affected();

    match deleted {
        0 => Err(DBError::NotFound("Recipe not found").into()),
        _ => Ok(()),
    }
}

/// One row per (cart recipe, ingredient); recipes without ingredients yield a single
/// row with NULL ingredient columns.
pub async fn cart_lines(pool: &SqlitePool, user_id: UserId) -> AppResult<Vec<CartLine>> {
    let lines = sqlx::query_as::<_, CartLine>(
        "
        SELECT
            recipes.name AS recipe,
            users.username AS author,
            ingredients.name AS ingredient,
            ingredients.measurement_unit,
            recipe_ingredients.amount
        FROM carts
        INNER JOIN recipes ON recipes.id = carts.recipe_id
        INNER JOIN users ON users.id = recipes.author_id
        LEFT JOIN recipe_ingredients ON recipe_ingredients.recipe_id = recipes.id
        LEFT JOIN ingredients ON ingredients.id = recipe_ingredients.ingredient_id
        WHERE carts.user_id = $1
        ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(lines)
}
