//! Catalog endpoints. The five levels share generic handlers; `level_handlers!`
//! gives each level concrete, documented entry points for the router.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use quizforge_core::catalog::{CatalogSearchResults, CatalogStats};
use quizforge_core::{
    CatalogInput, CatalogPatch, CatalogRecord, Course, CourseTree, Curriculum, CurriculumTree,
    Level, Subject, SubjectTree, Topic, TopicPath, Unit,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{ApiError, ApiResult, AppState, AuthUser, RequireAdmin};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogListQuery {
    /// Parent id or slug, also accepted as `curriculum_id`, `subject_id`, `course_id` or `unit_id`
    #[serde(
        default,
        alias = "curriculum_id",
        alias = "subject_id",
        alias = "course_id",
        alias = "unit_id"
    )]
    pub parent: Option<String>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    quizforge_core::catalog::DEFAULT_PAGE_SIZE
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogSearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    pub curriculum: Option<String>,
}

fn default_search_limit() -> usize {
    20
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CatalogStatsQuery {
    pub curriculum: Option<String>,
}

async fn create_entry<R: CatalogRecord>(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(input): Json<CatalogInput>,
) -> ApiResult<(StatusCode, Json<R>)> {
    let record: R = state.catalog.create(input, Some(admin.user_id)).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_entries<R: CatalogRecord>(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Query(q): Query<CatalogListQuery>,
) -> ApiResult<Json<Vec<R>>> {
    Ok(Json(
        state
            .catalog
            .list(q.parent.as_deref(), q.skip, q.limit)
            .await?,
    ))
}

async fn get_entry<R: CatalogRecord>(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<R>> {
    Ok(Json(state.catalog.require(&key).await?))
}

async fn update_entry<R: CatalogRecord>(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(key): Path<String>,
    Json(patch): Json<CatalogPatch>,
) -> ApiResult<Json<R>> {
    Ok(Json(state.catalog.update(&key, patch).await?))
}

async fn delete_entry<R: CatalogRecord>(
    State(state): State<AppState>,
    RequireAdmin(_auth): RequireAdmin,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    state.catalog.delete::<R>(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}

macro_rules! level_handlers {
    ($module:ident, $record:ident, $collection:tt, $item:tt) => {
        pub mod $module {
            use super::*;

            #[utoipa::path(
                post,
                path = $collection,
                tag = "catalog",
                request_body = CatalogInput,
                responses(
                    (status = 201, description = "Entry created", body = $record),
                    (status = 400, description = "Duplicate name or slug"),
                    (status = 404, description = "Parent not found")
                ),
                security(("bearer" = []))
            )]
            pub async fn create(
                state: State<AppState>,
                admin: RequireAdmin,
                input: Json<CatalogInput>,
            ) -> ApiResult<(StatusCode, Json<$record>)> {
                create_entry::<$record>(state, admin, input).await
            }

            #[utoipa::path(
                get,
                path = $collection,
                tag = "catalog",
                params(CatalogListQuery),
                responses((status = 200, description = "Entries in creation order", body = [$record])),
                security(("bearer" = []))
            )]
            pub async fn list(
                state: State<AppState>,
                user: AuthUser,
                query: Query<CatalogListQuery>,
            ) -> ApiResult<Json<Vec<$record>>> {
                list_entries::<$record>(state, user, query).await
            }

            #[utoipa::path(
                get,
                path = $item,
                tag = "catalog",
                params(("id" = String, Path, description = "Id or slug")),
                responses(
                    (status = 200, description = "Entry", body = $record),
                    (status = 404, description = "Not found")
                ),
                security(("bearer" = []))
            )]
            pub async fn get(
                state: State<AppState>,
                user: AuthUser,
                key: Path<String>,
            ) -> ApiResult<Json<$record>> {
                get_entry::<$record>(state, user, key).await
            }

            #[utoipa::path(
                put,
                path = $item,
                tag = "catalog",
                params(("id" = String, Path, description = "Id or slug")),
                request_body = CatalogPatch,
                responses(
                    (status = 200, description = "Updated entry", body = $record),
                    (status = 400, description = "Duplicate name or slug"),
                    (status = 404, description = "Entry or new parent not found")
                ),
                security(("bearer" = []))
            )]
            pub async fn update(
                state: State<AppState>,
                admin: RequireAdmin,
                key: Path<String>,
                patch: Json<CatalogPatch>,
            ) -> ApiResult<Json<$record>> {
                update_entry::<$record>(state, admin, key, patch).await
            }

            #[utoipa::path(
                delete,
                path = $item,
                tag = "catalog",
                params(("id" = String, Path, description = "Id or slug")),
                responses(
                    (status = 204, description = "Entry and its descendants deleted"),
                    (status = 404, description = "Not found")
                ),
                security(("bearer" = []))
            )]
            pub async fn delete(
                state: State<AppState>,
                admin: RequireAdmin,
                key: Path<String>,
            ) -> ApiResult<StatusCode> {
                delete_entry::<$record>(state, admin, key).await
            }
        }
    };
}

level_handlers!(curricula, Curriculum, "/api/curriculum", "/api/curriculum/{id}");
level_handlers!(subjects, Subject, "/api/subjects", "/api/subjects/{id}");
level_handlers!(courses, Course, "/api/courses", "/api/courses/{id}");
level_handlers!(units, Unit, "/api/units", "/api/units/{id}");
level_handlers!(topics, Topic, "/api/topics", "/api/topics/{id}");

#[utoipa::path(
    get,
    path = "/api/curriculum/{id_or_slug}/full",
    tag = "catalog",
    params(("id_or_slug" = String, Path, description = "Curriculum id or slug")),
    responses(
        (status = 200, description = "Curriculum with every descendant", body = CurriculumTree),
        (status = 404, description = "No such curriculum")
    ),
    security(("bearer" = []))
)]
pub async fn curriculum_full(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<CurriculumTree>> {
    Ok(Json(state.catalog.curriculum_tree(&key).await?))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{id_or_slug}/full",
    tag = "catalog",
    params(("id_or_slug" = String, Path, description = "Subject id or slug")),
    responses(
        (status = 200, description = "Subject with its courses, units and topics", body = SubjectTree),
        (status = 404, description = "No such subject")
    ),
    security(("bearer" = []))
)]
pub async fn subject_full(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<SubjectTree>> {
    Ok(Json(state.catalog.subject_tree(&key).await?))
}

#[utoipa::path(
    get,
    path = "/api/courses/{id_or_slug}/full",
    tag = "catalog",
    params(("id_or_slug" = String, Path, description = "Course id or slug")),
    responses(
        (status = 200, description = "Course with its units and topics", body = CourseTree),
        (status = 404, description = "No such course")
    ),
    security(("bearer" = []))
)]
pub async fn course_full(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<CourseTree>> {
    Ok(Json(state.catalog.course_tree(&key).await?))
}

#[utoipa::path(
    get,
    path = "/api/units/{id_or_slug}/topics",
    tag = "catalog",
    params(("id_or_slug" = String, Path, description = "Unit id or slug")),
    responses(
        (status = 200, description = "Topics of the unit", body = [Topic]),
        (status = 404, description = "No such unit")
    ),
    security(("bearer" = []))
)]
pub async fn unit_topics(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<Vec<Topic>>> {
    Ok(Json(state.catalog.unit_topics(&key).await?))
}

#[utoipa::path(
    get,
    path = "/api/topics/{id_or_slug}/path",
    tag = "catalog",
    params(("id_or_slug" = String, Path, description = "Topic id or slug")),
    responses((status = 200, description = "Topic with its ancestors", body = TopicPath)),
    security(("bearer" = []))
)]
pub async fn topic_path(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Path(key): Path<String>,
) -> ApiResult<Json<TopicPath>> {
    let id = state
        .catalog
        .resolve_id(Level::Topic, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Topic with ID or slug {} not found", key)))?;
    Ok(Json(state.catalog.topic_path(id).await?))
}

#[utoipa::path(
    get,
    path = "/api/catalog/search",
    tag = "catalog",
    params(CatalogSearchQuery),
    responses((status = 200, description = "Matches per level", body = CatalogSearchResults)),
    security(("bearer" = []))
)]
pub async fn search(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Query(q): Query<CatalogSearchQuery>,
) -> ApiResult<Json<CatalogSearchResults>> {
    Ok(Json(
        state
            .catalog
            .search(&q.q, q.limit, q.curriculum.as_deref())
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/catalog/stats",
    tag = "catalog",
    params(CatalogStatsQuery),
    responses((status = 200, description = "Counts per level and question breakdown", body = CatalogStats)),
    security(("bearer" = []))
)]
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(_auth): AuthUser,
    Query(q): Query<CatalogStatsQuery>,
) -> ApiResult<Json<CatalogStats>> {
    Ok(Json(state.catalog.stats(q.curriculum.as_deref()).await?))
}
