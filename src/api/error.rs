//! HTTP error mapping

use crate::error::FrontdeskError;
use crate::notice::Notice;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::warn;

const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Frontdesk(#[from] FrontdeskError),

    /// Backend failure shown to the user as `message`
    #[error("{message}: {source}")]
    Failed {
        source: FrontdeskError,
        message: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl ApiError {
    /// Attach the notice text used when `err` carries nothing user-facing
    pub fn failed(source: FrontdeskError, message: &'static str) -> Self {
        ApiError::Failed { source, message }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Frontdesk(err) | ApiError::Failed { source: err, .. } => match err {
                FrontdeskError::Validation(_) | FrontdeskError::InvalidId(_) => {
                    StatusCode::BAD_REQUEST
                }
                FrontdeskError::NotFound(_) => StatusCode::NOT_FOUND,
                FrontdeskError::InvalidOperation(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// False when the backend, not the request, is at fault
    pub fn is_user_error(&self) -> bool {
        match self {
            ApiError::Frontdesk(err) | ApiError::Failed { source: err, .. } => err.is_user_error(),
            ApiError::NotFound(_) | ApiError::BadRequest(_) => true,
        }
    }

    pub fn notice(&self) -> Notice {
        match self {
            ApiError::Frontdesk(err) => Notice::from_error(err, GENERIC_FAILURE),
            ApiError::Failed { source, message } => Notice::from_error(source, message),
            ApiError::NotFound(msg) | ApiError::BadRequest(msg) => Notice::error(msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if !self.is_user_error() {
            warn!("Request failed: {}", self);
        }

        (status, Json(self.notice())).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = ApiError::from(FrontdeskError::Validation("Please provide an answer".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.notice().description, "Please provide an answer");

        let err = ApiError::from(FrontdeskError::InvalidOperation("already resolved".into()));
        assert_eq!(err.status(), StatusCode::CONFLICT);

        let err = ApiError::NotFound("call abc".into());
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.notice().is_error());
        assert!(err.is_user_error());
    }

    #[test]
    fn test_user_errors_follow_the_source() {
        let err = ApiError::failed(
            FrontdeskError::InvalidOperation("already resolved".into()),
            "Failed to submit answer",
        );
        assert!(err.is_user_error());

        let err = ApiError::from(FrontdeskError::Other("boom".into()));
        assert!(!err.is_user_error());
        assert!(!ApiError::from(FrontdeskError::Database("locked".into())).is_user_error());
    }

    #[test]
    fn test_backend_failure_uses_fallback_text() {
        let err = ApiError::failed(
            FrontdeskError::Database("disk I/O error".into()),
            "Failed to create help request",
        );
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_user_error());

        let notice = err.notice();
        assert_eq!(notice.title, "Error");
        assert_eq!(notice.description, "Failed to create help request");
    }
}
