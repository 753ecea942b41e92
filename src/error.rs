use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Request-level errors with the externally visible messages the API
/// promises to its clients.
#[derive(Error, Debug)]
pub enum AppError {
    /// Signup payload failed validation before any storage call
    #[error("Empty password or username")]
    InvalidSignup,

    /// User record could not be created (duplicate username or store failure)
    #[error("Failed to add a new user")]
    SignupFailed,

    /// Login credentials did not match a stored user
    #[error("Invalid password or username")]
    InvalidCredentials,

    /// Request is missing a valid session token
    #[error("Invalid or missing session token")]
    Unauthorized,

    /// Post submission did not carry an image part
    #[error("Image is not available")]
    ImageMissing,

    /// Upstream dependency failure (index store or blob store)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // The signup contract reports validation failures as 500,
            // matching the original service behavior.
            AppError::InvalidSignup => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SignupFailed => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InvalidCredentials => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::ImageMissing => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status_code(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidSignup.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::InvalidCredentials.status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::ImageMissing.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_client_messages() {
        assert_eq!(AppError::SignupFailed.to_string(), "Failed to add a new user");
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid password or username"
        );
        assert_eq!(AppError::ImageMissing.to_string(), "Image is not available");
    }
}
