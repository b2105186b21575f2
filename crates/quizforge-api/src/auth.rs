use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use quizforge_core::{AuthContext, SecurityEvent, SecurityLogger, UserRole};

use crate::{ApiError, AppState};

const INVALID_SCHEME: &str = "Invalid authentication scheme.";
const INVALID_TOKEN: &str = "Invalid token or expired token.";

/// Any caller holding a valid bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthContext);

/// Caller whose token carries the admin role.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthContext);

/// Caller whose token carries the teacher or admin role.
#[derive(Debug, Clone)]
pub struct RequireTeacher(pub AuthContext);

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let value = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Forbidden(INVALID_SCHEME.into()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme == "Bearer" && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(ApiError::Forbidden(INVALID_SCHEME.into())),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state.tokens.verify(token).map(AuthUser).map_err(|e| {
            SecurityLogger::log_event(SecurityEvent::InvalidToken {
                reason: e.to_string(),
            });
            ApiError::Forbidden(INVALID_TOKEN.into())
        })
    }
}

fn require_role(ctx: AuthContext, required: UserRole) -> Result<AuthContext, ApiError> {
    if ctx.role.satisfies(required) {
        return Ok(ctx);
    }
    SecurityLogger::log_event(SecurityEvent::PermissionDenied {
        user_id: ctx.user_id,
        role: ctx.role,
        required_role: required,
    });
    let label = match required {
        UserRole::Admin => "Admin",
        UserRole::Teacher => "Teacher",
        UserRole::Student => "Student",
    };
    Err(ApiError::Forbidden(format!(
        "You don't have permission to access this resource. {} role required.",
        label
    )))
}

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(ctx) = AuthUser::from_request_parts(parts, state).await?;
        require_role(ctx, UserRole::Admin).map(RequireAdmin)
    }
}

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(ctx) = AuthUser::from_request_parts(parts, state).await?;
        require_role(ctx, UserRole::Teacher).map(RequireTeacher)
    }
}
