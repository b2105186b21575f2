use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use quizforge_ai::GenerationError;
use quizforge_core::{QuizError, SecurityError};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Internal(String),

    #[error("{0}")]
    ServiceUnavailable(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Quiz(err) => quiz_status(err),
            ApiError::Generation(err) => match err {
                GenerationError::Validation(_)
                | GenerationError::Catalog(_)
                | GenerationError::Prompt(_) => StatusCode::BAD_REQUEST,
                GenerationError::Llm(_) => StatusCode::BAD_GATEWAY,
                GenerationError::NoValidQuestions
                | GenerationError::EmptyResponse
                | GenerationError::InvalidQuestion(_) => StatusCode::INTERNAL_SERVER_ERROR,
                GenerationError::Core(inner) => quiz_status(inner),
            },
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

fn quiz_status(err: &QuizError) -> StatusCode {
    match err {
        QuizError::NotFound(_) => StatusCode::NOT_FOUND,
        QuizError::Conflict(_) | QuizError::Validation(_) => StatusCode::BAD_REQUEST,
        QuizError::Unauthorized(_) | QuizError::Security(SecurityError::InvalidCredentials) => {
            StatusCode::UNAUTHORIZED
        }
        QuizError::Forbidden(_) | QuizError::Security(SecurityError::InvalidToken) => {
            StatusCode::FORBIDDEN
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        if status.is_server_error() {
            error!(status = status.as_u16(), error = %detail, "Request failed");
        }

        let body = Json(json!({
            "detail": detail,
            "status": status.as_u16()
        }));

        if status == StatusCode::UNAUTHORIZED {
            return (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response();
        }
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_map_to_bad_request() {
        let err = ApiError::from(QuizError::Conflict("taken".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "taken");
    }

    #[test]
    fn generation_errors_have_distinct_statuses() {
        assert_eq!(
            ApiError::from(GenerationError::Catalog("Topic with ID x not found".into())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(GenerationError::Llm(anyhow::anyhow!("timeout"))).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(GenerationError::Core(QuizError::not_found("Question not found")))
                .status(),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn unauthorized_carries_challenge_header() {
        let response = ApiError::Unauthorized("Incorrect email or password".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }
}
