use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use quizforge_core::{Course, Curriculum, Subject, Topic, Unit};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{self, catalog, dashboards, prompts, questions, session, users};
use crate::AppState;

const LOCAL_FRONTEND: &str = "http://127.0.0.1:3000";

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health,
        session::login,
        session::student_register,
        session::student_login,
        session::me,
        users::create_user,
        users::list_users,
        users::get_user,
        users::update_user,
        users::delete_user,
        users::reset_password,
        users::deactivate_user,
        users::activate_user,
        catalog::curricula::create,
        catalog::curricula::list,
        catalog::curricula::get,
        catalog::curricula::update,
        catalog::curricula::delete,
        catalog::subjects::create,
        catalog::subjects::list,
        catalog::subjects::get,
        catalog::subjects::update,
        catalog::subjects::delete,
        catalog::courses::create,
        catalog::courses::list,
        catalog::courses::get,
        catalog::courses::update,
        catalog::courses::delete,
        catalog::units::create,
        catalog::units::list,
        catalog::units::get,
        catalog::units::update,
        catalog::units::delete,
        catalog::topics::create,
        catalog::topics::list,
        catalog::topics::get,
        catalog::topics::update,
        catalog::topics::delete,
        catalog::curriculum_full,
        catalog::subject_full,
        catalog::course_full,
        catalog::unit_topics,
        catalog::topic_path,
        catalog::search,
        catalog::stats,
        questions::create_question,
        questions::list_questions,
        questions::get_question,
        questions::update_question,
        questions::delete_question,
        questions::batch_delete,
        questions::search_questions,
        questions::question_stats,
        questions::topic_sets,
        questions::ai_generate,
        questions::ai_regenerate,
        questions::ai_status,
        prompts::create_prompt,
        prompts::list_prompts,
        prompts::default_prompt,
        prompts::builtin_prompts,
        prompts::get_prompt,
        prompts::update_prompt,
        prompts::delete_prompt,
        prompts::set_default_prompt,
        dashboards::teacher_dashboard,
        dashboards::teacher_activity,
        dashboards::student_dashboard,
        dashboards::student_question_sets,
        dashboards::student_topic_questions,
        dashboards::practice_quiz,
        dashboards::admin_dashboard,
        dashboards::system_stats,
    ),
    components(schemas(
        Curriculum,
        Subject,
        Course,
        Unit,
        Topic,
        questions::AiStatus,
        questions::BatchDelete,
        users::PasswordReset,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "system", description = "Liveness"),
        (name = "auth", description = "Login, sign-up and the current user"),
        (name = "users", description = "Account administration"),
        (name = "catalog", description = "Curriculum, subjects, courses, units and topics"),
        (name = "questions", description = "Question bank"),
        (name = "ai", description = "LLM question generation"),
        (name = "prompts", description = "Prompt templates"),
        (name = "dashboards", description = "Teacher, student and admin views")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/openapi.json", get(openapi_json))
        // Session
        .route("/login", post(session::login))
        .route("/student/register", post(session::student_register))
        .route("/student/login", post(session::student_login))
        .route("/me", get(session::me))
        // Users
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/reset-password", post(users::reset_password))
        .route("/users/{id}/deactivate", post(users::deactivate_user))
        .route("/users/{id}/activate", post(users::activate_user))
        // Catalog
        .route(
            "/curriculum",
            get(catalog::curricula::list).post(catalog::curricula::create),
        )
        .route(
            "/curriculum/{id}",
            get(catalog::curricula::get)
                .put(catalog::curricula::update)
                .delete(catalog::curricula::delete),
        )
        .route("/curriculum/{id}/full", get(catalog::curriculum_full))
        .route(
            "/subjects",
            get(catalog::subjects::list).post(catalog::subjects::create),
        )
        .route(
            "/subjects/{id}",
            get(catalog::subjects::get)
                .put(catalog::subjects::update)
                .delete(catalog::subjects::delete),
        )
        .route("/subjects/{id}/full", get(catalog::subject_full))
        .route(
            "/courses",
            get(catalog::courses::list).post(catalog::courses::create),
        )
        .route(
            "/courses/{id}",
            get(catalog::courses::get)
                .put(catalog::courses::update)
                .delete(catalog::courses::delete),
        )
        .route("/courses/{id}/full", get(catalog::course_full))
        .route(
            "/units",
            get(catalog::units::list).post(catalog::units::create),
        )
        .route(
            "/units/{id}",
            get(catalog::units::get)
                .put(catalog::units::update)
                .delete(catalog::units::delete),
        )
        .route("/units/{id}/topics", get(catalog::unit_topics))
        .route(
            "/topics",
            get(catalog::topics::list).post(catalog::topics::create),
        )
        .route(
            "/topics/{id}",
            get(catalog::topics::get)
                .put(catalog::topics::update)
                .delete(catalog::topics::delete),
        )
        .route("/topics/{id}/path", get(catalog::topic_path))
        .route("/catalog/search", get(catalog::search))
        .route("/catalog/stats", get(catalog::stats))
        // Questions; static segments win over `{id}` in axum's router
        .route(
            "/questions",
            get(questions::list_questions).post(questions::create_question),
        )
        .route("/questions/search", get(questions::search_questions))
        .route("/questions/stats", get(questions::question_stats))
        .route("/questions/batch/delete", post(questions::batch_delete))
        .route("/questions/ai/generate", post(questions::ai_generate))
        .route("/questions/ai/regenerate", post(questions::ai_regenerate))
        .route(
            "/questions/topic/{topic_id}/sets",
            get(questions::topic_sets),
        )
        .route(
            "/questions/{id}",
            get(questions::get_question)
                .put(questions::update_question)
                .delete(questions::delete_question),
        )
        .route("/ai/status", get(questions::ai_status))
        // Prompt templates
        .route(
            "/prompts",
            get(prompts::list_prompts).post(prompts::create_prompt),
        )
        .route("/prompts/default", get(prompts::default_prompt))
        .route("/prompts/builtin", get(prompts::builtin_prompts))
        .route(
            "/prompts/{id}",
            get(prompts::get_prompt)
                .put(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route("/prompts/{id}/set-default", post(prompts::set_default_prompt))
        // Dashboards
        .route("/teacher/dashboard", get(dashboards::teacher_dashboard))
        .route("/teacher/activity", get(dashboards::teacher_activity))
        .route("/student/dashboard", get(dashboards::student_dashboard))
        .route(
            "/student/question-sets",
            get(dashboards::student_question_sets),
        )
        .route(
            "/student/topic/{topic_id}/questions",
            get(dashboards::student_topic_questions),
        )
        .route("/student/practice-quiz", post(dashboards::practice_quiz))
        .route("/admin/dashboard", get(dashboards::admin_dashboard))
        .route("/admin/stats", get(dashboards::system_stats))
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let server = &state.config.config().server;
    let mut origins = Vec::new();
    for origin in [server.frontend_url.as_str(), LOCAL_FRONTEND] {
        match origin.parse::<HeaderValue>() {
            Ok(value) if !origins.contains(&value) => origins.push(value),
            Ok(_) => {}
            Err(_) => warn!(origin, "Ignoring unparsable CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
            Method::PATCH,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
        .max_age(Duration::from_secs(server.cors_max_age_secs))
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state);
    Router::new()
        .route("/", get(handlers::root))
        .nest("/api", api_routes())
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
