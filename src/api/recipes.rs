use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::{absolute_url, not_blank, JsonBody},
    config::Config,
    db::{
        self, Collection, IngredientAmount, IngredientId, NewRecipe, Recipe, RecipeChanges,
        RecipeFilter, RecipeId, RecipeShort, UserId,
    },
    error::{AppError, AppResult},
    media,
    shopping_list::ShoppingList,
    utils::{
        auth::{self, TokenHeader},
        pagination::{Page, PageQuery},
    },
};

const MAX_AMOUNT: i64 = 32_000;

#[derive(Debug, Deserialize)]
pub struct IngredientAmountData {
    #[serde(default)]
    id: IngredientId,
    #[serde(default)]
    amount: i64,
}

/// Rejects an empty list, repeated ingredients, out-of-range amounts and unknown ids.
async fn checked_ingredients(
    pool: &SqlitePool,
    ingredients: &[IngredientAmountData],
) -> AppResult<Vec<IngredientAmount>> {
    if ingredients.is_empty() {
        return Err(AppError::Invalid(
            "ingredients",
            "At least one ingredient is required.".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for ingredient in ingredients {
        if !(1..=MAX_AMOUNT).contains(&ingredient.amount) {
            return Err(AppError::Invalid(
                "ingredients",
                format!("Amount must be between 1 and {MAX_AMOUNT}."),
            ));
        }
        if !seen.insert(ingredient.id) {
            return Err(AppError::Invalid(
                "ingredients",
                "Ingredients must not repeat.".to_string(),
            ));
        }
    }

    let ids = ingredients.iter().map(|i| i.id).collect::<Vec<IngredientId>>();
    if let Some(missing) = db::missing_ingredients(pool, &ids).await?.first() {
        return Err(AppError::Invalid(
            "ingredients",
            format!("Ingredient {missing} does not exist."),
        ));
    }

    Ok(ingredients
        .iter()
        .map(|i| IngredientAmount {
            id: i.id,
            amount: i.amount,
        })
        .collect())
}

async fn require_author(pool: &SqlitePool, recipe_id: RecipeId, user_id: UserId) -> AppResult<()> {
    if db::recipe_author(pool, recipe_id).await? != user_id {
        return Err(AppError::Forbidden("Only the author can change this recipe"));
    }
    Ok(())
}

// ================================================= LIST / CREATE ================================================= //

#[derive(Debug, Deserialize)]
pub struct ListRecipesQuery {
    #[serde(default)]
    author: Option<UserId>,
    #[serde(default)]
    is_favorited: Option<String>,
    #[serde(default)]
    is_in_shopping_cart: Option<String>,
}

fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some("1" | "true" | "True"))
}

// GET /api/recipes/
pub async fn list_recipes(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(params): Query<ListRecipesQuery>,
    token: TokenHeader,
) -> AppResult<Json<Page<Recipe>>> {
    let user_id = auth::optional_user(&pool, &key, token).await?;

    // collection filters mean nothing for anonymous callers and are ignored
    let filter = RecipeFilter {
        author: params.author,
        favorited_by: user_id.filter(|_| flag(&params.is_favorited)),
        in_cart_of: user_id.filter(|_| flag(&params.is_in_shopping_cart)),
    };

    let count = db::count_recipes(&pool, &filter, user_id).await?;
    let recipes = db::list_recipes(&pool, &filter, user_id, page.limit(), page.offset()).await?;

    Ok(Json(Page::new(recipes, count, &page, &absolute_url(&config, &uri))?))
}

#[derive(Deserialize, Validate)]
pub struct CreateRecipe {
    #[serde(default)]
    ingredients: Vec<IngredientAmountData>,
    #[serde(default)]
    #[validate(length(min = 1, message = "image can't be blank"))]
    image: String,
    #[serde(default)]
    #[validate(
        length(max = 256, message = "too long recipe name"),
        custom = "not_blank"
    )]
    name: String,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    text: String,
    #[serde(default)]
    #[validate(range(
        min = 1,
        max = 32000,
        message = "cooking time must be between 1 and 32000 minutes"
    ))]
    cooking_time: i64,
}

// POST /api/recipes/
pub async fn create_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    token: TokenHeader,
    body: JsonBody<CreateRecipe>,
) -> AppResult<impl IntoResponse> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    let Json(recipe) = body?;
    recipe.validate()?;
    let ingredients = checked_ingredients(&pool, &recipe.ingredients).await?;
    let image = media::save_image(&config, media::RECIPE_IMAGES, "image", &recipe.image).await?;

    let created = db::create_recipe(
        &pool,
        user_id,
        NewRecipe {
            name: recipe.name.trim().to_string(),
            image: image.clone(),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
            ingredients,
        },
    )
    .await;

    let recipe_id = match created {
        Ok(recipe_id) => recipe_id,
        Err(err) => {
            media::remove_image(&config, &image).await;
            return Err(err);
        }
    };

    let recipe = db::retrieve_recipe(&pool, recipe_id, Some(user_id)).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// ================================================= SINGLE RECIPE ================================================= //

// GET /api/recipes/:id/
pub async fn get_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<Json<Recipe>> {
    let user_id = auth::optional_user(&pool, &key, token).await?;

    Ok(Json(db::retrieve_recipe(&pool, id, user_id).await?))
}

#[derive(Deserialize, Validate)]
pub struct UpdateRecipe {
    #[serde(default)]
    ingredients: Option<Vec<IngredientAmountData>>,
    #[serde(default)]
    #[validate(length(min = 1, message = "image can't be blank"))]
    image: Option<String>,
    #[serde(default)]
    #[validate(
        length(max = 256, message = "too long recipe name"),
        custom = "not_blank"
    )]
    name: Option<String>,
    #[serde(default)]
    #[validate(custom = "not_blank")]
    text: Option<String>,
    #[serde(default)]
    #[validate(range(
        min = 1,
        max = 32000,
        message = "cooking time must be between 1 and 32000 minutes"
    ))]
    cooking_time: Option<i64>,
}

// PATCH /api/recipes/:id/
pub async fn update_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
    body: JsonBody<UpdateRecipe>,
) -> AppResult<Json<Recipe>> {
    let user_id = auth::require_user(&pool, &key, token).await?;
    require_author(&pool, id, user_id).await?;

    let Json(changes) = body?;
    changes.validate()?;
    let Some(ingredients) = changes.ingredients else {
        return Err(AppError::Invalid(
            "ingredients",
            "This field is required.".to_string(),
        ));
    };
    let ingredients = checked_ingredients(&pool, &ingredients).await?;

    let previous_image = db::get_recipe_short(&pool, id).await?.image;
    let image = match &changes.image {
        Some(data) => Some(media::save_image(&config, media::RECIPE_IMAGES, "image", data).await?),
        None => None,
    };

    let updated = db::update_recipe(
        &pool,
        id,
        RecipeChanges {
            name: changes.name.map(|name| name.trim().to_string()),
            image: image.clone(),
            text: changes.text,
            cooking_time: changes.cooking_time,
            ingredients,
        },
    )
    .await;

    match (updated, image) {
        (Err(err), Some(image)) => {
            media::remove_image(&config, &image).await;
            return Err(err);
        }
        (Err(err), None) => return Err(err),
        (Ok(()), Some(_)) => media::remove_image(&config, &previous_image).await,
        (Ok(()), None) => {}
    }

    Ok(Json(db::retrieve_recipe(&pool, id, Some(user_id)).await?))
}

// DELETE /api/recipes/:id/
pub async fn delete_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    let user_id = auth::require_user(&pool, &key, token).await?;
    require_author(&pool, id, user_id).await?;

    let image = db::get_recipe_short(&pool, id).await?.image;
    db::delete_recipe(&pool, id).await?;
    media::remove_image(&config, &image).await;

    tracing::info!(recipe_id = id, user_id, "recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/recipes/:id/get-link/
pub async fn get_link(
    State(pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    Path(id): Path<RecipeId>,
) -> AppResult<impl IntoResponse> {
    db::get_recipe_short(&pool, id).await?;

    Ok(Json(
        json!({ "short-link": format!("{}/s/{id}/", config.public_url()) }),
    ))
}

// ================================================= FAVORITES / CART ================================================= //

async fn add_to(
    pool: &SqlitePool,
    key: &DecodingKey,
    token: TokenHeader,
    recipe_id: RecipeId,
    collection: Collection,
) -> AppResult<(StatusCode, Json<RecipeShort>)> {
    let user_id = auth::require_user(pool, key, token).await?;
    let recipe = db::get_recipe_short(pool, recipe_id).await?;

    db::add_to_collection(pool, collection, user_id, recipe_id).await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn remove_from(
    pool: &SqlitePool,
    key: &DecodingKey,
    token: TokenHeader,
    recipe_id: RecipeId,
    collection: Collection,
) -> AppResult<StatusCode> {
    let user_id = auth::require_user(pool, key, token).await?;
    db::get_recipe_short(pool, recipe_id).await?;

    db::remove_from_collection(pool, collection, user_id, recipe_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// POST /api/recipes/:id/favorite/
pub async fn favorite_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<impl IntoResponse> {
    add_to(&pool, &key, token, id, Collection::Favorites).await
}

// DELETE /api/recipes/:id/favorite/
pub async fn unfavorite_recipe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    remove_from(&pool, &key, token, id, Collection::Favorites).await
}

// POST /api/recipes/:id/shopping_cart/
pub async fn add_to_shopping_cart(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<impl IntoResponse> {
    add_to(&pool, &key, token, id, Collection::ShoppingCart).await
}

// DELETE /api/recipes/:id/shopping_cart/
pub async fn remove_from_shopping_cart(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<RecipeId>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    remove_from(&pool, &key, token, id, Collection::ShoppingCart).await
}

// GET /api/recipes/download_shopping_cart/
pub async fn download_shopping_cart(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: TokenHeader,
) -> AppResult<impl IntoResponse> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    let list = ShoppingList::aggregate(db::cart_lines(&pool, user_id).await?);
    let body = list.to_csv(chrono::Utc::now())?;
    tracing::info!(user_id, items = list.items.len(), "shopping list generated");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"shopping_list.csv\"",
            ),
        ],
        body,
    ))
}
