use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use quizforge_core::{NewUser, UserPatch, UserProfile, UserRole};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{ApiResult, AppState, RequireAdmin};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UserListQuery {
    pub role: Option<UserRole>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PasswordReset {
    pub new_password: String,
}

#[utoipa::path(
    post,
    path = "/api/users",
    tag = "users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = UserProfile),
        (status = 400, description = "Email already registered")
    ),
    security(("bearer" = []))
)]
pub async fn create_user(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Json(input): Json<NewUser>,
) -> ApiResult<(StatusCode, Json<UserProfile>)> {
    let user = state.users.register(input).await?;
    Ok((StatusCode::CREATED, Json(user.profile())))
}

#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    params(UserListQuery),
    responses((status = 200, description = "Users", body = [UserProfile])),
    security(("bearer" = []))
)]
pub async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Query(q): Query<UserListQuery>,
) -> ApiResult<Json<Vec<UserProfile>>> {
    let users = state.users.list(q.role, q.skip, q.limit).await?;
    Ok(Json(users.iter().map(|u| u.profile()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserProfile),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_user(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.get(id).await?.profile()))
}

#[utoipa::path(
    put,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UserPatch,
    responses(
        (status = 200, description = "Updated user", body = UserProfile),
        (status = 400, description = "Email already registered"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_user(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(patch): Json<UserPatch>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.users.update(id, patch).await?.profile()))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete your own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.users.delete(admin.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/reset-password",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = PasswordReset,
    responses(
        (status = 204, description = "Password replaced"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn reset_password(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(body): Json<PasswordReset>,
) -> ApiResult<StatusCode> {
    state
        .users
        .reset_password(admin.user_id, id, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/deactivate",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = UserProfile),
        (status = 400, description = "Cannot deactivate your own account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn deactivate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.users.set_active(admin.user_id, id, false).await?;
    Ok(Json(user.profile()))
}

#[utoipa::path(
    post,
    path = "/api/users/{id}/activate",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "User activated", body = UserProfile),
        (status = 404, description = "User not found")
    ),
    security(("bearer" = []))
)]
pub async fn activate_user(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    let user = state.users.set_active(admin.user_id, id, true).await?;
    Ok(Json(user.profile()))
}
