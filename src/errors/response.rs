use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use crate::errors::AppError;

// Converts AppError into a plain-text HTTP response. Internal details stay in the logs.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Anonymous callers are sent to the login page
            AppError::Unauthenticated => Redirect::to("/login").into_response(),

            // Rejected input is a bad request
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),

            AppError::InvalidField { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }

            AppError::DuplicateUsername => {
                (StatusCode::CONFLICT, self.to_string()).into_response()
            }

            AppError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Error: the prediction model is unavailable, please try again later",
            )
                .into_response(),

            // Everything else is an internal server error
            err => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error",
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_unavailable_maps_to_503() {
        let resp = AppError::ModelUnavailable.into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let resp = AppError::Unauthenticated.into_response();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()["location"], "/login");
    }

    #[test]
    fn invalid_field_maps_to_400() {
        let resp = AppError::InvalidField {
            field: "age",
            reason: "must be a number".into(),
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn storage_faults_are_internal_errors() {
        let err = AppError::Database(sqlx::Error::PoolTimedOut);
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
