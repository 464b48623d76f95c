use axum::{
    Json,
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use amity_db::FriendshipError;
use amity_types::api::StatusMessage;
use amity_types::models::ProfileError;

/// Every handler failure. Rendered as `{"message": ...}` with the status
/// below; internal errors are logged and hidden from the client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    InvalidTarget(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            // The frontend treats every rejected mutation as a 400.
            Self::Conflict(_)
            | Self::InvalidArgument(_)
            | Self::InvalidTarget(_)
            | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(StatusMessage::new(message))).into_response()
    }
}

impl From<FriendshipError> for ApiError {
    fn from(e: FriendshipError) -> Self {
        match e {
            FriendshipError::NotFound(_) => Self::NotFound(e.to_string()),
            FriendshipError::InvalidTarget => Self::InvalidTarget(e.to_string()),
            FriendshipError::Conflict(msg) => Self::Conflict(msg.to_string()),
            FriendshipError::Forbidden => Self::Forbidden(e.to_string()),
            FriendshipError::InvalidArgument(msg) => Self::InvalidArgument(msg),
            FriendshipError::Storage(e) => Self::Internal(e),
        }
    }
}

impl From<ProfileError> for ApiError {
    fn from(e: ProfileError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::InvalidArgument(e.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        Self::InvalidArgument(e.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        Self::Internal(e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_friendship_errors_map_to_documented_statuses() {
        let cases = [
            (FriendshipError::NotFound("User"), StatusCode::NOT_FOUND),
            (FriendshipError::InvalidTarget, StatusCode::BAD_REQUEST),
            (FriendshipError::Conflict("Already friends"), StatusCode::BAD_REQUEST),
            (FriendshipError::Forbidden, StatusCode::FORBIDDEN),
            (FriendshipError::InvalidArgument("Invalid action 'x'".into()), StatusCode::BAD_REQUEST),
            (FriendshipError::Storage(anyhow::anyhow!("disk")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_messages_survive_conversion() {
        let err = ApiError::from(FriendshipError::NotFound("Friend request"));
        assert_eq!(err.to_string(), "Friend request not found");

        let invalid = "block".parse::<amity_types::models::FriendAction>().unwrap_err();
        let err = ApiError::from(FriendshipError::from(invalid));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Invalid action 'block'");
    }
}
