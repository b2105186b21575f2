use axum::{extract::State, http::StatusCode, Json};
use quizforge_core::{NewUser, QuizError, SecurityEvent, SecurityLogger, User, UserProfile, UserRole};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{ApiError, ApiResult, AppState, AuthUser};

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[serde(alias = "username")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub user_id: Uuid,
    pub role: UserRole,
    pub full_name: String,
}

fn token_for(state: &AppState, user: &User) -> ApiResult<TokenResponse> {
    Ok(TokenResponse {
        access_token: state.tokens.issue(user).map_err(QuizError::from)?,
        token_type: "bearer".to_string(),
        user_id: user.id,
        role: user.role,
        full_name: user.full_name.clone(),
    })
}

#[utoipa::path(
    post,
    path = "/api/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 401, description = "Bad credentials or inactive account")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.users.authenticate(&req.email, &req.password).await?;
    Ok(Json(token_for(&state, &user)?))
}

/// Self-service sign-up; the account is always a student.
#[utoipa::path(
    post,
    path = "/api/student/register",
    tag = "auth",
    request_body = NewUser,
    responses(
        (status = 201, description = "Student created and logged in", body = TokenResponse),
        (status = 400, description = "Email already registered")
    )
)]
pub async fn student_register(
    State(state): State<AppState>,
    Json(mut input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<TokenResponse>)> {
    input.role = UserRole::Student;
    let user = state.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(token_for(&state, &user)?)))
}

#[utoipa::path(
    post,
    path = "/api/student/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Access token", body = TokenResponse),
        (status = 401, description = "Bad credentials or not a student")
    )
)]
pub async fn student_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let user = state.users.authenticate(&req.email, &req.password).await?;
    if user.role != UserRole::Student {
        SecurityLogger::log_event(SecurityEvent::AuthenticationFailure {
            email: user.email.clone(),
            reason: "non-student on student login".into(),
        });
        return Err(ApiError::Unauthorized(
            "This login is for students only".into(),
        ));
    }
    Ok(Json(token_for(&state, &user)?))
}

#[utoipa::path(
    get,
    path = "/api/me",
    tag = "auth",
    responses((status = 200, description = "Current user", body = UserProfile)),
    security(("bearer" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(ctx): AuthUser,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.get(ctx.user_id).await?.profile()))
}
