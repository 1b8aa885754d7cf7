use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::store::StoreError;

/// Caller-visible failure. Every variant maps to a stable `error` kind in the
/// JSON body so clients can branch on it without parsing the message.
#[derive(Debug, Display)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    ValidationFailed(String),
    #[display(fmt = "{} not found", _0)]
    NotFound(&'static str),
    #[display(fmt = "A user with this email address already exists")]
    DuplicateEmail,
    #[display(fmt = "Invalid password")]
    InvalidCredentials,
    #[display(fmt = "No user found with the provided email address")]
    UserNotFound,
    #[display(
        fmt = "Insufficient leave balance. Available: {}, Required: {}",
        available,
        requested
    )]
    InsufficientBalance { available: i32, requested: i32 },
    #[display(fmt = "Request has already been processed")]
    AlreadyProcessed,
    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),
    #[display(fmt = "Public registration disabled, please contact your manager for account creation")]
    RegistrationClosed,
    #[display(fmt = "{}", _0)]
    Unauthorized(&'static str),
    #[display(fmt = "Something went wrong, contact the system admin")]
    Internal,
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::ValidationFailed(_) => "VALIDATION_FAILED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateEmail => "DUPLICATE_EMAIL",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
            AppError::AlreadyProcessed => "ALREADY_PROCESSED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::RegistrationClosed => "REGISTRATION_CLOSED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateEmail | AppError::AlreadyProcessed => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::UserNotFound | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::InsufficientBalance { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Forbidden(_) | AppError::RegistrationClosed => StatusCode::FORBIDDEN,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": self.to_string(),
        }))
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate => AppError::DuplicateEmail,
            other => {
                tracing::error!(error = %other, "Storage failure");
                AppError::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn body_carries_kind_and_message() {
        let err = AppError::InsufficientBalance {
            available: 2,
            requested: 5,
        };
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "INSUFFICIENT_BALANCE");
        assert_eq!(
            value["message"],
            "Insufficient leave balance. Available: 2, Required: 5"
        );
    }

    #[test]
    fn storage_detail_is_not_leaked() {
        let err: AppError = StoreError::Corrupt("bad role 'ADMIN' in users.role".into()).into();
        assert!(matches!(err, AppError::Internal));
        assert!(!err.to_string().contains("users.role"));
    }
}
