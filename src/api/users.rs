use std::sync::Arc;

use axum::{
    extract::{OriginalUri, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use jsonwebtoken::DecodingKey;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::{absolute_url, JsonBody},
    config::Config,
    db::{self, RecipeShort, UserId, UserProfile},
    error::{AppError, AppResult},
    media,
    utils::{
        auth::{self, TokenHeader},
        hasher,
        pagination::{Page, PageQuery},
    },
};

#[derive(Debug, Serialize)]
pub struct UserWithRecipes {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub recipes: Vec<RecipeShort>,
    pub recipes_count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipesLimit {
    #[serde(default)]
    recipes_limit: Option<i64>,
}

async fn with_recipes(
    pool: &SqlitePool,
    profile: UserProfile,
    limit: &RecipesLimit,
) -> AppResult<UserWithRecipes> {
    let recipes =
        db::list_author_recipes(pool, profile.id, limit.recipes_limit.map(|l| l.max(0))).await?;
    let recipes_count = db::count_author_recipes(pool, profile.id).await?;

    Ok(UserWithRecipes {
        profile,
        recipes,
        recipes_count,
    })
}

// GET /api/users/
pub async fn list_users(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    token: TokenHeader,
) -> AppResult<Json<Page<UserProfile>>> {
    let user_id = auth::optional_user(&pool, &key, token).await?;

    let count = db::count_users(&pool).await?;
    let users = db::list_user_profiles(&pool, user_id, page.limit(), page.offset()).await?;

    Ok(Json(Page::new(users, count, &page, &absolute_url(&config, &uri))?))
}

// GET /api/users/:id/
pub async fn get_user(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<UserId>,
    token: TokenHeader,
) -> AppResult<Json<UserProfile>> {
    let user_id = auth::optional_user(&pool, &key, token).await?;

    Ok(Json(db::get_user_profile(&pool, id, user_id).await?))
}

// GET /api/users/me/
pub async fn me(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: TokenHeader,
) -> AppResult<Json<UserProfile>> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    Ok(Json(db::get_user_profile(&pool, user_id, Some(user_id)).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatar {
    #[serde(default)]
    avatar: Option<String>,
}

// PUT /api/users/me/avatar/
pub async fn update_avatar(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    token: TokenHeader,
    body: JsonBody<UpdateAvatar>,
) -> AppResult<impl IntoResponse> {
    let user_id = auth::require_user(&pool, &key, token).await?;
    let Json(UpdateAvatar { avatar }) = body?;

    let Some(data) = avatar.filter(|data| !data.trim().is_empty()) else {
        return Err(AppError::Invalid("avatar", "This field is required.".to_string()));
    };

    let url = media::save_image(&config, media::AVATARS, "avatar", &data).await?;
    if let Some(previous) = db::set_avatar(&pool, user_id, Some(&url)).await? {
        media::remove_image(&config, &previous).await;
    }

    Ok(Json(json!({ "avatar": url })))
}

// DELETE /api/users/me/avatar/
pub async fn delete_avatar(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    if let Some(previous) = db::set_avatar(&pool, user_id, None).await? {
        media::remove_image(&config, &previous).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize, Validate)]
pub struct SetPassword {
    #[serde(default)]
    #[validate(
        length(min = 8, message = "password must be at least 8 characters long"),
        length(max = 128, message = "too long password")
    )]
    new_password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "current password can't be blank"))]
    current_password: String,
}

// POST /api/users/set_password/
pub async fn set_password(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: TokenHeader,
    body: JsonBody<SetPassword>,
) -> AppResult<StatusCode> {
    let user_id = auth::require_user(&pool, &key, token).await?;
    let Json(passwords) = body?;
    passwords.validate()?;

    let user = db::get_user_auth(&pool, user_id).await?;
    if !hasher::verify_password(&user.hash, &passwords.current_password)? {
        return Err(AppError::Invalid(
            "current_password",
            "Wrong password.".to_string(),
        ));
    }

    let hash = hasher::hash_password(&passwords.new_password)?;
    db::set_password_hash(&pool, user_id, &hash).await?;

    tracing::info!(user_id, "password changed");
    Ok(StatusCode::NO_CONTENT)
}

// GET /api/users/subscriptions/
pub async fn subscriptions(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    State(config): State<Arc<Config>>,
    OriginalUri(uri): OriginalUri,
    Query(page): Query<PageQuery>,
    Query(limit): Query<RecipesLimit>,
    token: TokenHeader,
) -> AppResult<Json<Page<UserWithRecipes>>> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    let count = db::count_followed(&pool, user_id).await?;
    let profiles = db::list_followed_profiles(&pool, user_id, page.limit(), page.offset()).await?;

    let mut authors = Vec::with_capacity(profiles.len());
    for profile in profiles {
        authors.push(with_recipes(&pool, profile, &limit).await?);
    }

    Ok(Json(Page::new(authors, count, &page, &absolute_url(&config, &uri))?))
}

// POST /api/users/:id/subscribe/
pub async fn subscribe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<UserId>,
    Query(limit): Query<RecipesLimit>,
    token: TokenHeader,
) -> AppResult<impl IntoResponse> {
    let follower_id = auth::require_user(&pool, &key, token).await?;
    let mut followee = db::get_user_profile(&pool, id, Some(follower_id)).await?;

    if follower_id == followee.id {
        return Err(AppError::BadRequest("You can't subscribe to yourself"));
    }

    db::follow_user(&pool, follower_id, followee.id).await?;
    tracing::debug!(follower_id, followee_id = followee.id, "subscribed");

    followee.is_subscribed = true;
    Ok((StatusCode::CREATED, Json(with_recipes(&pool, followee, &limit).await?)))
}

// DELETE /api/users/:id/subscribe/
pub async fn unsubscribe(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    Path(id): Path<UserId>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    let follower_id = auth::require_user(&pool, &key, token).await?;
    let followee = db::get_user_profile(&pool, id, Some(follower_id)).await?;

    db::unfollow_user(&pool, follower_id, followee.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
