use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::api::types::ApiResponse;
use crate::error::DispatchError;

/// Errors returned by HTTP handlers, rendered as an [`ApiResponse`] envelope.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("job not found")]
    NotFound,

    /// Well-formed body whose contents failed validation.
    #[error("validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<DispatchError> for ApiError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::JobNotFound(_) => ApiError::NotFound,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, result) = match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, None),
            ApiError::Validation(errors) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Some(errors.clone()))
            }
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, None),
        };

        let body = ApiResponse {
            code: status.as_u16(),
            message: self.to_string(),
            result,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::JobId;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError::from(DispatchError::JobNotFound(JobId::generate())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_422() {
        let response = ApiError::Validation(vec!["keyword must not be empty".into()]).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn bad_request_keeps_message() {
        let err = ApiError::BadRequest("missing field `deviceId`".into());
        assert_eq!(err.to_string(), "missing field `deviceId`");
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
