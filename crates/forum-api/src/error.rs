use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use forum_core::ForumError;
use forum_types::api::ErrorBody;
use tracing::error;

/// Handler failures, mapped onto status codes at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Forum(#[from] ForumError),

    #[error("authentication required")]
    Unauthorized,

    #[error("identity provider unavailable: {0}")]
    IdentityProvider(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Forum(ForumError::Invalid(_)) => StatusCode::BAD_REQUEST,
            ApiError::Forum(ForumError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Forum(ForumError::Forbidden) => StatusCode::FORBIDDEN,
            ApiError::Forum(ForumError::RateLimited { .. }) => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Forum(ForumError::Store(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::IdentityProvider(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            // Store details stay in the log
            ApiError::Forum(ForumError::Store(e)) => {
                error!("Store failure: {:#}", e);
                ErrorBody {
                    error: "internal error".into(),
                    retry_after_secs: None,
                }
            }
            ApiError::Forum(ForumError::RateLimited { notice }) => ErrorBody {
                error: self.to_string(),
                retry_after_secs: Some(notice.as_secs_f64().ceil() as u64),
            },
            _ => ErrorBody {
                error: self.to_string(),
                retry_after_secs: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(ForumError::invalid("empty")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ForumError::NotFound("message")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::from(ForumError::Forbidden).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(ForumError::RateLimited {
                notice: Duration::from_millis(2500)
            })
            .status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            ApiError::from(ForumError::Store(anyhow::anyhow!("disk full"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
