use axum_extra::headers::authorization::Credentials;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{db::UserId, error::AppResult};

const ALGORITHM: Algorithm = Algorithm::HS384;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: i64,
    pub user_id: UserId,
    /// Token version of the user at issue time; stale once the user logs out.
    pub ver: i64,
}

/// `Authorization: Token <jwt>`
#[derive(Debug)]
pub struct JWTToken(pub String);

impl Credentials for JWTToken {
    const SCHEME: &'static str = "Token";

    fn decode(value: &axum::http::HeaderValue) -> Option<Self> {
        let mut it = value.to_str().ok()?.split_whitespace();
        let scheme = it.next()?;
        let token = it.next()?;

        if !scheme.eq_ignore_ascii_case(Self::SCHEME) || it.next().is_some() {
            None?
        }

        Some(Self(token.to_string()))
    }

    fn encode(&self) -> axum::http::HeaderValue {
        unreachable!("tokens are only read from requests")
    }
}

pub fn generate_jwt(
    user_id: UserId,
    version: i64,
    ttl_days: i64,
    key: &EncodingKey,
) -> AppResult<String> {
    let exp = (chrono::Utc::now() + chrono::Duration::days(ttl_days)).timestamp();
    let claims = Claims {
        exp,
        user_id,
        ver: version,
    };
    let token = jsonwebtoken::encode(&Header::new(ALGORITHM), &claims, key)?;

    Ok(token)
}

pub fn verify_jwt(token: &str, key: &DecodingKey) -> AppResult<Claims> {
    let claims = jsonwebtoken::decode::<Claims>(token, key, &Validation::new(ALGORITHM))?.claims;
    Ok(claims)
}
