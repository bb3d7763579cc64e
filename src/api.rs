pub mod auth;
pub mod ingredients;
pub mod links;
pub mod recipes;
pub mod users;

use axum::{extract::rejection::JsonRejection, http::Uri, Json};
use validator::ValidationError;

use crate::config::Config;

/// A JSON body whose rejection is handled inside the handler, after authentication,
/// and reported as a `400`.
pub type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Absolute form of the request URL, for pagination links.
fn absolute_url(config: &Config, uri: &Uri) -> String {
    let path = uri
        .path_and_query()
        .map(|path| path.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{}{}", config.public_url(), path)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(invalid("blank", "This field may not be blank."));
    }
    Ok(())
}

/// Letters, digits and `. @ + - _` only.
pub(crate) fn valid_username(value: &str) -> Result<(), ValidationError> {
    let valid = value
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '.' | '@' | '+' | '-' | '_'));

    if !valid {
        return Err(invalid(
            "username",
            "Username may contain only letters, digits and ./@/+/-/_ characters.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_allow_word_characters_and_symbols() {
        assert!(valid_username("chef.anna+1@home_cook-2").is_ok());
        assert!(valid_username("шеф").is_ok());
        assert!(valid_username("chef anna").is_err());
        assert!(valid_username("chef/anna").is_err());
    }

    #[test]
    fn whitespace_is_blank() {
        assert!(not_blank("  \n").is_err());
        assert!(not_blank(" soup ").is_ok());
    }

    #[test]
    fn absolute_url_keeps_query() {
        let config = crate::config::Config {
            database_url: String::new(),
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            public_url: "https://food.example/".into(),
            secret_key: String::new(),
            media_root: "media".into(),
            rate_limit: 1,
            token_ttl_days: 1,
        };
        let uri: Uri = "/api/recipes/?page=2".parse().unwrap();

        assert_eq!(
            absolute_url(&config, &uri),
            "https://food.example/api/recipes/?page=2"
        );
    }
}
