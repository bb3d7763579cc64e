use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::{DecodingKey, EncodingKey};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    api::{not_blank, valid_username, JsonBody},
    config::Config,
    db::{self, NewUser},
    error::{AppError, AppResult},
    utils::{
        auth::{self, TokenHeader},
        hasher, jwt,
    },
};

// ================================================= LOGIN ================================================= //

#[derive(Debug, Deserialize, Validate)]
pub struct Login {
    #[serde(default)]
    #[validate(
        email(message = "invalid email address"),
        length(min = 1, message = "email can't be blank")
    )]
    email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "password can't be blank"))]
    password: String,
}

// POST /api/auth/token/login/
pub async fn login(
    State(pool): State<SqlitePool>,
    State(key): State<EncodingKey>,
    State(config): State<Arc<Config>>,
    body: JsonBody<Login>,
) -> AppResult<impl IntoResponse> {
    let Json(user) = body?;
    user.validate()?;

    let Some(user_auth) = db::find_user_by_email(&pool, &user.email).await? else {
        return Err(AppError::BadRequest("Unable to log in with provided credentials"));
    };

    if !hasher::verify_password(&user_auth.hash, &user.password)? {
        tracing::info!(user_id = user_auth.id, "login with wrong password");
        return Err(AppError::BadRequest("Unable to log in with provided credentials"));
    }

    let token = jwt::generate_jwt(
        user_auth.id,
        user_auth.token_version,
        config.token_ttl_days,
        &key,
    )?;
    Ok(Json(json!({ "auth_token": token })))
}

// POST /api/auth/token/logout/
pub async fn logout(
    State(pool): State<SqlitePool>,
    State(key): State<DecodingKey>,
    token: TokenHeader,
) -> AppResult<StatusCode> {
    let user_id = auth::require_user(&pool, &key, token).await?;

    db::bump_token_version(&pool, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ================================================= REGISTRATION ================================================= //

#[derive(Deserialize, Validate)]
pub struct Registration {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "email can't be blank"),
        length(max = 254, message = "too long email address"),
        email(message = "invalid email address")
    )]
    email: String,

    #[serde(default)]
    #[validate(
        length(min = 1, message = "user name can't be blank"),
        length(max = 150, message = "too long user name"),
        custom = "valid_username"
    )]
    username: String,

    #[serde(default)]
    #[validate(
        length(max = 150, message = "too long first name"),
        custom = "not_blank"
    )]
    first_name: String,

    #[serde(default)]
    #[validate(
        length(max = 150, message = "too long last name"),
        custom = "not_blank"
    )]
    last_name: String,

    #[serde(default)]
    #[validate(
        length(min = 8, message = "password must be at least 8 characters long"),
        length(max = 128, message = "too long password")
    )]
    password: String,
}

// POST /api/users/
pub async fn registration(
    State(pool): State<SqlitePool>,
    body: JsonBody<Registration>,
) -> AppResult<impl IntoResponse> {
    let Json(user) = body?;
    user.validate()?;

    let hash = hasher::hash_password(&user.password)?;
    let created = db::create_user(
        &pool,
        NewUser {
            email: &user.email,
            username: &user.username,
            first_name: user.first_name.trim(),
            last_name: user.last_name.trim(),
            hash: &hash,
        },
    )
    .await?;

    tracing::info!(user_id = created.id, "user registered");
    Ok((StatusCode::CREATED, Json(created)))
}
