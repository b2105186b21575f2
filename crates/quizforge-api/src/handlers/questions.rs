use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use quizforge_ai::{GenerationReport, GenerationRequest, RegenerationRequest};
use quizforge_core::questions::{QuestionHit, QuestionSearch, QuestionSets, QuestionStats};
use quizforge_core::{
    Difficulty, NewQuestion, Question, QuestionFilter, QuestionPatch, QuestionType,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::{ApiResult, AppState, AuthUser, RequireTeacher};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionListQuery {
    pub topic_id: Option<Uuid>,
    pub difficulty: Option<Difficulty>,
    pub question_type: Option<QuestionType>,
    pub ai_generated: Option<bool>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TopicQuery {
    pub topic_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SetsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BatchDelete {
    pub question_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AiStatus {
    pub configured: bool,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub available: bool,
    pub detail: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/questions",
    tag = "questions",
    request_body = NewQuestion,
    responses(
        (status = 201, description = "Question created", body = Question),
        (status = 400, description = "Question breaks its type's rules"),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer" = []))
)]
pub async fn create_question(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
    Json(input): Json<NewQuestion>,
) -> ApiResult<(StatusCode, Json<Question>)> {
    let question = state.questions.create(input, Some(teacher.user_id)).await?;
    Ok((StatusCode::CREATED, Json(question)))
}

#[utoipa::path(
    get,
    path = "/api/questions",
    tag = "questions",
    params(QuestionListQuery),
    responses((status = 200, description = "Questions", body = [Question])),
    security(("bearer" = []))
)]
pub async fn list_questions(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Query(q): Query<QuestionListQuery>,
) -> ApiResult<Json<Vec<Question>>> {
    let filter = QuestionFilter {
        topic_id: q.topic_id,
        difficulty: q.difficulty,
        question_type: q.question_type,
        ai_generated: q.ai_generated,
    };
    Ok(Json(state.questions.list(&filter, q.skip, q.limit).await?))
}

#[utoipa::path(
    get,
    path = "/api/questions/{id}",
    tag = "questions",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 200, description = "Question", body = Question),
        (status = 404, description = "Question not found")
    ),
    security(("bearer" = []))
)]
pub async fn get_question(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Question>> {
    Ok(Json(state.questions.get(id).await?))
}

#[utoipa::path(
    put,
    path = "/api/questions/{id}",
    tag = "questions",
    params(("id" = Uuid, Path, description = "Question id")),
    request_body = QuestionPatch,
    responses(
        (status = 200, description = "Updated question", body = Question),
        (status = 400, description = "Merged question breaks its type's rules"),
        (status = 404, description = "Question or topic not found")
    ),
    security(("bearer" = []))
)]
pub async fn update_question(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Path(id): Path<Uuid>,
    Json(patch): Json<QuestionPatch>,
) -> ApiResult<Json<Question>> {
    Ok(Json(state.questions.update(id, patch).await?))
}

#[utoipa::path(
    delete,
    path = "/api/questions/{id}",
    tag = "questions",
    params(("id" = Uuid, Path, description = "Question id")),
    responses(
        (status = 204, description = "Question deleted"),
        (status = 404, description = "Question not found")
    ),
    security(("bearer" = []))
)]
pub async fn delete_question(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.questions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/questions/batch/delete",
    tag = "questions",
    request_body = BatchDelete,
    responses(
        (status = 204, description = "Questions deleted"),
        (status = 400, description = "No question IDs provided"),
        (status = 404, description = "None of the questions exist")
    ),
    security(("bearer" = []))
)]
pub async fn batch_delete(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Json(body): Json<BatchDelete>,
) -> ApiResult<StatusCode> {
    state.questions.batch_delete(&body.question_ids).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/questions/search",
    tag = "questions",
    params(QuestionSearch),
    responses((status = 200, description = "Matching questions with their topic", body = [QuestionHit])),
    security(("bearer" = []))
)]
pub async fn search_questions(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Query(search): Query<QuestionSearch>,
) -> ApiResult<Json<Vec<QuestionHit>>> {
    Ok(Json(state.questions.search(&search).await?))
}

#[utoipa::path(
    get,
    path = "/api/questions/stats",
    tag = "questions",
    params(TopicQuery),
    responses((status = 200, description = "Counts by type, difficulty and origin", body = QuestionStats)),
    security(("bearer" = []))
)]
pub async fn question_stats(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Query(q): Query<TopicQuery>,
) -> ApiResult<Json<QuestionStats>> {
    Ok(Json(state.questions.stats(q.topic_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/questions/topic/{topic_id}/sets",
    tag = "questions",
    params(("topic_id" = Uuid, Path, description = "Topic id"), SetsQuery),
    responses(
        (status = 200, description = "Questions grouped by type and difficulty", body = QuestionSets),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer" = []))
)]
pub async fn topic_sets(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
    Path(topic_id): Path<Uuid>,
    Query(q): Query<SetsQuery>,
) -> ApiResult<Json<QuestionSets>> {
    Ok(Json(state.questions.sets_by_topic(topic_id, q.limit).await?))
}

#[utoipa::path(
    post,
    path = "/api/questions/ai/generate",
    tag = "ai",
    request_body = GenerationRequest,
    responses(
        (status = 200, description = "Questions stored", body = GenerationReport),
        (status = 400, description = "Bad request or broken topic hierarchy"),
        (status = 502, description = "Language model call failed"),
        (status = 503, description = "No language model configured")
    ),
    security(("bearer" = []))
)]
pub async fn ai_generate(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
    Json(request): Json<GenerationRequest>,
) -> ApiResult<Json<GenerationReport>> {
    let generator = state.generator()?;
    let report = generator.generate(&request, Some(teacher.user_id)).await?;
    info!(
        teacher_id = %teacher.user_id,
        created = report.questions.len(),
        "AI generation finished"
    );
    Ok(Json(report))
}

#[utoipa::path(
    post,
    path = "/api/questions/ai/regenerate",
    tag = "ai",
    request_body = RegenerationRequest,
    responses(
        (status = 200, description = "Question replaced in place", body = Question),
        (status = 404, description = "Question not found"),
        (status = 502, description = "Language model call failed"),
        (status = 503, description = "No language model configured")
    ),
    security(("bearer" = []))
)]
pub async fn ai_regenerate(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
    Json(request): Json<RegenerationRequest>,
) -> ApiResult<Json<Question>> {
    let generator = state.generator()?;
    Ok(Json(
        generator.regenerate(&request, Some(teacher.user_id)).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/ai/status",
    tag = "ai",
    responses((status = 200, description = "Provider, model and reachability", body = AiStatus)),
    security(("bearer" = []))
)]
pub async fn ai_status(
    State(state): State<AppState>,
    RequireTeacher(_auth): RequireTeacher,
) -> Json<AiStatus> {
    let status = match state.generator() {
        Ok(generator) => {
            let provider = generator.provider();
            AiStatus {
                configured: true,
                provider: Some(provider.provider_name().to_string()),
                model: Some(provider.model_name().to_string()),
                available: provider.is_available().await,
                detail: None,
            }
        }
        Err(e) => AiStatus {
            configured: false,
            provider: None,
            model: None,
            available: false,
            detail: Some(e.to_string()),
        },
    };
    Json(status)
}
