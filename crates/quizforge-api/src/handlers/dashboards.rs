//! Teacher, student and admin home screens plus the practice quiz builder.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use quizforge_core::dashboard::{
    AdminDashboard, SetCurriculum, StudentDashboard, SystemStats, TeacherActivity,
    TeacherDashboard, TopicQuestions, RECENT_ACTIVITY_DAYS,
};
use quizforge_core::questions::{PracticeRequest, PracticeSet};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::{ApiResult, AppState, AuthUser, RequireAdmin, RequireTeacher};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    RECENT_ACTIVITY_DAYS
}

#[utoipa::path(
    get,
    path = "/api/teacher/dashboard",
    tag = "dashboards",
    responses((status = 200, description = "Caller's authoring summary", body = TeacherDashboard)),
    security(("bearer" = []))
)]
pub async fn teacher_dashboard(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
) -> ApiResult<Json<TeacherDashboard>> {
    Ok(Json(state.dashboard.teacher_dashboard(teacher.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/teacher/activity",
    tag = "dashboards",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Daily timeline and breakdowns", body = TeacherActivity),
        (status = 400, description = "days outside 1..=365")
    ),
    security(("bearer" = []))
)]
pub async fn teacher_activity(
    State(state): State<AppState>,
    RequireTeacher(teacher): RequireTeacher,
    Query(q): Query<ActivityQuery>,
) -> ApiResult<Json<TeacherActivity>> {
    Ok(Json(
        state
            .dashboard
            .teacher_activity(teacher.user_id, q.days)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/student/dashboard",
    tag = "dashboards",
    responses((status = 200, description = "Student home screen", body = StudentDashboard)),
    security(("bearer" = []))
)]
pub async fn student_dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> ApiResult<Json<StudentDashboard>> {
    Ok(Json(state.dashboard.student_dashboard(user.user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/student/question-sets",
    tag = "dashboards",
    responses((status = 200, description = "Catalog tree of topics that have questions", body = [SetCurriculum])),
    security(("bearer" = []))
)]
pub async fn student_question_sets(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
) -> ApiResult<Json<Vec<SetCurriculum>>> {
    Ok(Json(state.dashboard.student_question_sets().await?))
}

#[utoipa::path(
    get,
    path = "/api/student/topic/{topic_id}/questions",
    tag = "dashboards",
    params(("topic_id" = Uuid, Path, description = "Topic id")),
    responses(
        (status = 200, description = "Questions grouped by type and difficulty", body = TopicQuestions),
        (status = 404, description = "Topic not found")
    ),
    security(("bearer" = []))
)]
pub async fn student_topic_questions(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(topic_id): Path<Uuid>,
) -> ApiResult<Json<TopicQuestions>> {
    Ok(Json(
        state.dashboard.student_topic_questions(topic_id).await?,
    ))
}

/// Random practice quiz; answers stay hidden.
#[utoipa::path(
    post,
    path = "/api/student/practice-quiz",
    tag = "dashboards",
    request_body = PracticeRequest,
    responses(
        (status = 200, description = "Practice quiz", body = PracticeSet),
        (status = 400, description = "No topics or bad count"),
        (status = 404, description = "No questions match")
    ),
    security(("bearer" = []))
)]
pub async fn practice_quiz(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Json(request): Json<PracticeRequest>,
) -> ApiResult<Json<PracticeSet>> {
    Ok(Json(state.questions.practice_set(&request).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    tag = "dashboards",
    responses((status = 200, description = "Totals and recent activity", body = AdminDashboard)),
    security(("bearer" = []))
)]
pub async fn admin_dashboard(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
) -> ApiResult<Json<AdminDashboard>> {
    Ok(Json(state.dashboard.admin_dashboard().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    tag = "dashboards",
    responses((status = 200, description = "Collection counts and growth", body = SystemStats)),
    security(("bearer" = []))
)]
pub async fn system_stats(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
) -> ApiResult<Json<SystemStats>> {
    Ok(Json(state.dashboard.system_stats().await?))
}
