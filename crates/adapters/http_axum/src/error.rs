//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use lightkeeper_domain::error::{LightkeeperError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`LightkeeperError`] to an HTTP response with appropriate status code.
#[derive(Debug)]
pub struct ApiError(LightkeeperError);

impl From<LightkeeperError> for ApiError {
    fn from(err: LightkeeperError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            LightkeeperError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            LightkeeperError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            LightkeeperError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.0.to_string()),
            LightkeeperError::NotConfigured(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.0.to_string())
            }
            LightkeeperError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
            LightkeeperError::Notification(err) => {
                tracing::error!(error = %err, "notification error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lightkeeper_domain::error::NotFoundError;

    #[test]
    fn should_map_validation_to_bad_request() {
        let response = ApiError::from(ValidationError::ZeroTimeout).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn should_map_not_found_to_404() {
        let err = LightkeeperError::from(NotFoundError {
            entity: "Light",
            id: "main".to_string(),
        });
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn should_map_wrong_device_token_to_401() {
        let err = LightkeeperError::Unauthorized("invalid device token");
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn should_map_missing_configuration_to_503() {
        let err = LightkeeperError::NotConfigured("device registration token");
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn should_hide_storage_details_behind_500() {
        let err = LightkeeperError::Storage("disk full".into());
        assert_eq!(
            ApiError::from(err).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
