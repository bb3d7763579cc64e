use sqlx::SqlitePool;

use crate::error::{AppResult, DBError};

use super::UserId;

pub async fn follow_user(pool: &SqlitePool, follower_id: UserId, followee_id: UserId) -> AppResult<()> {
    let inserted = sqlx::query(
        "
        INSERT INTO follows (follower_id, followee_id)
        VALUES ($1, $2)
        ON CONFLICT DO NOTHING
        ",
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(pool)
    .await?
    .rows_affected();

    match inserted {
        0 => Err(DBError::AlreadyExists("You are already subscribed to this user").into()),
        _ => Ok(()),
    }
}

pub async fn unfollow_user(pool: &SqlitePool, follower_id: UserId, followee_id: UserId) -> AppResult<()> {
    let deleted = sqlx::query(
        "
        DELETE FROM follows
        WHERE follower_id = $1 AND followee_id = $2
        ",
    )
    .bind(follower_id)
    .bind(followee_id)
    .execute(pool)
    .await?
    .rows_affected();

    match deleted {
        0 => Err(DBError::NotFound("You are not subscribed to this user").into()),
        _ => Ok(()),
    }
}

pub async fn count_followed(pool: &SqlitePool, follower_id: UserId) -> AppResult<i64> {
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(follower_id)
            .fetch_one(pool)
            .await?,
    )
}
