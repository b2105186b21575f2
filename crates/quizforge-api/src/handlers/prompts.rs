use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use quizforge_ai::prompt::{builtin_templates, subject_template, BuiltinTemplate};
use serde::Deserialize;
use utoipa::IntoParams;
use quizforge_core::{NewPromptTemplate, PromptTemplate, PromptTemplatePatch};
use uuid::Uuid;

use super::Paging;
use crate::{ApiResult, AppState, RequireAdmin, RequireTeacher};

#[utoipa::path(
    post,
    path = "/api/prompts",
    tag = "prompts",
    request_body = NewPromptTemplate,
    responses(
        (status = 201, description = "Template stored", body = PromptTemplate),
        (status = 400, description = "Name already taken")
    ),
    security(("bearer" = []))
)]
pub async fn create_prompt(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<NewPromptTemplate>,
) -> ApiResult<(StatusCode, Json<PromptTemplate>)> {
    let template = state.prompts.create(input, Some(admin.user_id)).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

#[utoipa::path(
    get,
    path = "/api/prompts",
    tag = "prompts",
    params(Paging),
    responses((status = 200, description = "Stored templates", body = [PromptTemplate])),
    security(("bearer" = []))
)]
pub async fn list_prompts(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Query(page): Query<Paging>,
) -> ApiResult<Json<Vec<PromptTemplate>>> {
    Ok(Json(state.prompts.list(page.skip, page.limit).await?))
}

/// The stored default template, 404 when none is flagged.
#[utoipa::path(
    get,
    path = "/api/prompts/default",
    tag = "prompts",
    responses(
        (status = 200, description = "Default template", body = PromptTemplate),
        (status = 404, description = "No default template")
    ),
    security(("bearer" = []))
)]
pub async fn default_prompt(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
) -> ApiResult<Json<PromptTemplate>> {
    Ok(Json(state.prompts.default_template().await?))
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BuiltinQuery {
    /// Subject name; narrows the list to the best matching built-in
    pub subject: Option<String>,
}

/// Built-in generation templates, or the one suited to `subject`.
#[utoipa::path(
    get,
    path = "/api/prompts/builtin",
    tag = "prompts",
    params(BuiltinQuery),
    responses((status = 200, description = "Built-in templates", body = [BuiltinTemplate])),
    security(("bearer" = []))
)]
pub async fn builtin_prompts(
    RequireTeacher(_auth): RequireTeacher,
    Query(q): Query<BuiltinQuery>,
) -> Json<Vec<BuiltinTemplate>> {
    match q.subject.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(subject) => Json(vec![subject_template(subject).clone()]),
        None => Json(builtin_templates()),
    }
}

#[utoipa::path(
    get,
    path = "/api/prompts/{id}",
    tag = "prompts",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template", body = PromptTemplate),
        (status = 404, description = "Template not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_prompt(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PromptTemplate>> {
    Ok(Json(state.prompts.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/prompts/{id}",
    tag = "prompts",
    params(("id" = Uuid, Path, description = "Template id")),
    request_body = PromptTemplatePatch,
    responses(
        (status = 200, description = "Updated template", body = PromptTemplate),
        (status = 400, description = "Name already taken"),
        (status = 404, description = "Template not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_prompt(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(id): Path<Uuid>,
    Json(patch): Json<PromptTemplatePatch>,
) -> ApiResult<Json<PromptTemplate>> {
    Ok(Json(state.prompts.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/prompts/{id}",
    tag = "prompts",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 204, description = "Template deleted"),
        (status = 400, description = "Cannot delete the default prompt template"),
        (status = 404, description = "Template not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_prompt(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.prompts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/prompts/{id}/set-default",
    tag = "prompts",
    params(("id" = Uuid, Path, description = "Template id")),
    responses(
        (status = 200, description = "Template is now the default", body = PromptTemplate),
        (status = 404, description = "Template not found")
    ),
    security(("bearer" = []))
)]
pub async fn set_default_prompt(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PromptTemplate>> {
    Ok(Json(state.prompts.set_default(id).await?))
}
