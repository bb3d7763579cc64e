use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(thiserror::Error, Debug)]
pub enum DBError {
    #[error("{0}")]
    AlreadyExists(&'static str),

    #[error("{0}")]
    NotFound(&'static str),
}

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Any error: {0:?}")]
    Anyhow(#[from] anyhow::Error),

    #[error("DB Error: {0}")]
    DBError(#[from] DBError),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    /// A single field failed a check the validator derive can't express.
    #[error("Invalid {0}: {1}")]
    Invalid(&'static str, String),

    #[error("Forbidden request: {0}")]
    Forbidden(&'static str),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("SQL failed: {0:?}")]
    Sqlx(#[from] sqlx::Error),

    #[error("JWT error: {0:?}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid request: {0:?}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Malformed body: {0}")]
    MalformedJson(#[from] JsonRejection),

    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0:?}")]
    Csv(#[from] csv::Error),
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}

fn field_errors(errors: &validator::ValidationErrors) -> Value {
    let fields = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|err| match &err.message {
                    Some(message) => message.to_string(),
                    None => err.code.to_string(),
                })
                .collect::<Vec<String>>();
            (field.to_string(), Value::from(messages))
        })
        .collect::<Map<String, Value>>();

    Value::Object(fields)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, field_errors(errors)),
            AppError::Invalid(field, message) => {
                let mut body = Map::new();
                body.insert(field.to_string(), json!([message]));
                (StatusCode::BAD_REQUEST, Value::Object(body))
            }
            AppError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, json!({ "error": message }))
            }
            AppError::MalformedJson(rejection) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": rejection.body_text() }),
            ),
            AppError::Forbidden(message) => (StatusCode::FORBIDDEN, json!({ "error": message })),
            AppError::Unauthorized | AppError::JwtError(_) => (
                StatusCode::UNAUTHORIZED,
                json!({ "error": "Authentication credentials were not provided or are invalid" }),
            ),
            AppError::DBError(db_error) => {
                let message = db_error.to_string();

                match db_error {
                    DBError::NotFound(_) => (StatusCode::NOT_FOUND, json!({ "error": message })),
                    DBError::AlreadyExists(_) => {
                        (StatusCode::BAD_REQUEST, json!({ "error": message }))
                    }
                }
            }
            AppError::Anyhow(_)
            | AppError::Sqlx(_)
            | AppError::Io(_)
            | AppError::Csv(_) => {
                tracing::error!(error = ?self, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal Server Error" }),
                )
            }
        };

        if status.is_client_error() {
            tracing::debug!(%status, error = %self, "request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Payload {
        #[validate(length(min = 1, message = "name can't be blank"))]
        name: String,
    }

    #[test]
    fn maps_errors_to_status_codes() {
        let cases = [
            (AppError::Unauthorized, StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("nope"), StatusCode::FORBIDDEN),
            (AppError::BadRequest("bad"), StatusCode::BAD_REQUEST),
            (
                DBError::AlreadyExists("dup").into(),
                StatusCode::BAD_REQUEST,
            ),
            (DBError::NotFound("gone").into(), StatusCode::NOT_FOUND),
            (
                AppError::Anyhow(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn validation_errors_are_keyed_by_field() {
        let errors = Payload {
            name: String::new(),
        }
        .validate()
        .unwrap_err();

        assert_eq!(field_errors(&errors), json!({ "name": ["name can't be blank"] }));
    }
}
