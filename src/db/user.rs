use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::{is_unique_violation, AppError, AppResult, DBError};

pub type UserId = i64;

/// Columns shared by every profile query; `$1` is the viewing user (or NULL).
const PROFILE_COLUMNS: &str = "
    users.email,
    users.id,
    users.username,
    users.first_name,
    users.last_name,
    users.avatar,
    EXISTS (
        SELECT 1
        FROM follows
        WHERE follows.follower_id = $1
            AND follows.followee_id = users.id
    ) AS is_subscribed";

#[derive(Debug, FromRow)]
pub struct UserAuth {
    pub id: UserId,
    pub hash: String,
    pub token_version: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct UserProfile {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct CreatedUser {
    pub email: String,
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

pub struct NewUser<'a> {
    pub email: &'a str,
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub hash: &'a str,
}

pub async fn create_user(pool: &SqlitePool, user: NewUser<'_>) -> AppResult<CreatedUser> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 OR username = $2)",
    )
    .bind(user.email)
    .bind(user.username)
    .fetch_one(pool)
    .await?;

    if taken {
        return Err(DBError::AlreadyExists("A user with that email or username already exists").into());
    }

    sqlx::query_as::<_, CreatedUser>(
        r#"
        INSERT INTO users (email, username, first_name, last_name, hash)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING email, id, username, first_name, last_name
        "#,
    )
    .bind(user.email)
    .bind(user.username)
    .bind(user.first_name)
    .bind(user.last_name)
    .bind(user.hash)
    .fetch_one(pool)
    .await
    .map_err(|err| {
        if is_unique_violation(&err) {
            DBError::AlreadyExists("A user with that email or username already exists").into()
        } else {
            AppError::from(err)
        }
    })
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> AppResult<Option<UserAuth>> {
    let user = sqlx::query_as::<_, UserAuth>(
        "SELECT id, hash, token_version FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_auth(pool: &SqlitePool, user_id: UserId) -> AppResult<UserAuth> {
    let user = sqlx::query_as::<_, UserAuth>(
        "SELECT id, hash, token_version FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(DBError::NotFound("User not found").into())
}

pub async fn token_version(pool: &SqlitePool, user_id: UserId) -> AppResult<Option<i64>> {
    let version = sqlx::query_scalar("SELECT token_version FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(version)
}

/// Invalidates every token issued to the user so far.
pub async fn bump_token_version(pool: &SqlitePool, user_id: UserId) -> AppResult<()> {
    sqlx::query("UPDATE users SET token_version = token_version + 1 WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Also invalidates existing tokens.
pub async fn set_password_hash(pool: &SqlitePool, user_id: UserId, hash: &str) -> AppResult<()> {
    sqlx::query(
        "UPDATE users SET hash = $1, token_version = token_version + 1 WHERE id = $2",
    )
    .bind(hash)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns the previous avatar so the caller can discard the file.
pub async fn set_avatar(
    pool: &SqlitePool,
    user_id: UserId,
    avatar: Option<&str>,
) -> AppResult<Option<String>> {
    let previous = sqlx::query_scalar::<_, Option<String>>("SELECT avatar FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .flatten();

    sqlx::query("UPDATE users SET avatar = $1 WHERE id = $2")
        .bind(avatar)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(previous)
}

pub async fn get_user_profile(
    pool: &SqlitePool,
    user_id: UserId,
    req_user_id: Option<UserId>,
) -> AppResult<UserProfile> {
    let user = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users WHERE users.id = $2"
    ))
    .bind(req_user_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    user.ok_or(DBError::NotFound("User not found").into())
}

pub async fn list_user_profiles(
    pool: &SqlitePool,
    req_user_id: Option<UserId>,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<UserProfile>> {
    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM users ORDER BY users.id DESC LIMIT $2 OFFSET $3"
    ))
    .bind(req_user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(users)
}

pub async fn count_users(pool: &SqlitePool) -> AppResult<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?)
}

/// Users followed by `follower_id`, most recently registered first.
pub async fn list_followed_profiles(
    pool: &SqlitePool,
    follower_id: UserId,
    limit: i64,
    offset: i64,
) -> AppResult<Vec<UserProfile>> {
    let users = sqlx::query_as::<_, UserProfile>(&format!(
        "
        SELECT {PROFILE_COLUMNS}
        FROM users
        INNER JOIN follows ON follows.followee_id = users.id
        WHERE follows.follower_id = $1
        ORDER BY users.id DESC
        LIMIT $2 OFFSET $3
        "
    ))
    .bind(follower_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(users)
}
