use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::Error as SqlxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("Rent can only be generated in the first {cutoff_day} days")]
    GenerationWindowClosed { cutoff_day: u32 },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Dues not found: {}", format_ids(.0))]
    MissingDues(Vec<i64>),

    #[error("{0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Password error: {0}")]
    PasswordError(String),

    #[error("Session error: {0}")]
    SessionError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] SqlxError),
}

impl AppError {
    /// Maps constraint violations on insert: a unique violation becomes a 409
    /// with `conflict`, a dangling foreign key a 404 for `parent`. Anything
    /// else stays a 500.
    pub fn from_constraint(err: SqlxError, conflict: &str, parent: &'static str) -> Self {
        match &err {
            SqlxError::Database(db) if db.is_unique_violation() => {
                AppError::Conflict(conflict.to_owned())
            }
            SqlxError::Database(db) if db.is_foreign_key_violation() => AppError::NotFound(parent),
            _ => AppError::SqlxError(err),
        }
    }

    fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_owned()
        } else {
            self.to_string()
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::GenerationWindowClosed { .. } => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingDues(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::PasswordError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SessionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MigrateError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SqlxError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            log::error!("Request failed: {}", self);
        }
        HttpResponse::build(self.status_code()).json(json!({ "error": self.public_message() }))
    }
}

fn format_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<AppError> for std::io::Error {
    fn from(err: AppError) -> Self {
        std::io::Error::new(std::io::ErrorKind::Other, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Validation("Due ID is required".into()), StatusCode::BAD_REQUEST)]
    #[case(AppError::InvalidCredentials, StatusCode::UNAUTHORIZED)]
    #[case(AppError::GenerationWindowClosed { cutoff_day: 5 }, StatusCode::FORBIDDEN)]
    #[case(AppError::NotFound("Tenant"), StatusCode::NOT_FOUND)]
    #[case(AppError::MissingDues(vec![4, 9]), StatusCode::NOT_FOUND)]
    #[case(AppError::Conflict("Room 101 is already occupied".into()), StatusCode::CONFLICT)]
    #[case(AppError::SqlxError(SqlxError::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_error_kinds_to_status(#[case] err: AppError, #[case] expected: StatusCode) {
        assert_eq!(err.status_code(), expected);
    }

    #[actix_web::test]
    async fn client_errors_carry_their_message() {
        let resp = AppError::GenerationWindowClosed { cutoff_day: 5 }.error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            value["error"],
            "Rent can only be generated in the first 5 days"
        );
    }

    #[test]
    fn missing_dues_lists_ids() {
        assert_eq!(
            AppError::MissingDues(vec![4, 9]).to_string(),
            "Dues not found: 4, 9"
        );
    }

    #[actix_web::test]
    async fn server_errors_hide_details() {
        let resp = AppError::SqlxError(SqlxError::PoolTimedOut).error_response();
        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "Internal server error");
    }
}
