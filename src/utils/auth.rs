use axum_extra::{headers::Authorization, TypedHeader};
use jsonwebtoken::DecodingKey;
use sqlx::SqlitePool;

use crate::{
    db::{self, UserId},
    error::{AppError, AppResult},
    utils::jwt::{self, JWTToken},
};

pub type TokenHeader = Option<TypedHeader<Authorization<JWTToken>>>;

/// Resolves the caller, rejecting anonymous requests.
pub async fn require_user(
    pool: &SqlitePool,
    key: &DecodingKey,
    token: TokenHeader,
) -> AppResult<UserId> {
    let Some(TypedHeader(Authorization(token))) = token else {
        return Err(AppError::Unauthorized);
    };

    verify_token(pool, &token.0, key).await
}

/// Resolves the caller if a token was sent. A token that is sent but invalid is still an error.
pub async fn optional_user(
    pool: &SqlitePool,
    key: &DecodingKey,
    token: TokenHeader,
) -> AppResult<Option<UserId>> {
    match token {
        Some(TypedHeader(Authorization(token))) => Ok(Some(verify_token(pool, &token.0, key).await?)),
        None => Ok(None),
    }
}

async fn verify_token(pool: &SqlitePool, token: &str, key: &DecodingKey) -> AppResult<UserId> {
    let claims = jwt::verify_jwt(token, key)?;

    match db::token_version(pool, claims.user_id).await? {
        Some(version) if version == claims.ver => Ok(claims.user_id),
        _ => Err(AppError::Unauthorized),
    }
}
