pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::AppConfig;
use crate::services::audit::AuditService;
use crate::services::content_service::ContentService;
use crate::services::notifier::Notifier;
use crate::services::program_service::ProgramService;
use crate::services::progress_service::ProgressService;
use crate::services::storage::StorageService;
use axum::{
    Router,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::programs::list_programs,
        api::handlers::programs::create_program,
        api::handlers::programs::get_program,
        api::handlers::programs::update_program,
        api::handlers::programs::delete_program,
        api::handlers::programs::enroll,
        api::handlers::programs::list_students,
        api::handlers::programs::get_outline,
        api::handlers::learning_content::get_learning_content,
        api::handlers::modules::list_modules,
        api::handlers::modules::create_module,
        api::handlers::modules::update_module,
        api::handlers::modules::delete_module,
        api::handlers::modules::reorder_modules,
        api::handlers::lessons::list_lessons,
        api::handlers::lessons::create_lesson,
        api::handlers::lessons::get_lesson,
        api::handlers::lessons::update_lesson,
        api::handlers::lessons::delete_lesson,
        api::handlers::lessons::reorder_lessons,
        api::handlers::lessons::upload_video,
        api::handlers::resources::list_resources,
        api::handlers::resources::create_resource,
        api::handlers::resources::update_resource,
        api::handlers::resources::delete_resource,
        api::handlers::resources::reorder_resources,
        api::handlers::progress::complete_lesson,
        api::handlers::progress::incomplete_lesson,
        api::handlers::progress::update_watch_time,
        api::handlers::progress::get_lesson_progress,
        api::handlers::progress::is_lesson_completed,
        api::handlers::progress::get_program_progress,
        api::handlers::progress::list_program_progress,
        api::handlers::progress::initialize_program_progress,
        api::handlers::progress::get_stats,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::progress::LessonCompletedResponse,
            models::Role,
            services::program_service::CreateProgramRequest,
            services::program_service::UpdateProgramRequest,
            services::program_service::ProgramView,
            services::program_service::EnrollmentView,
            services::program_service::StudentView,
            services::content_service::types::CreateModuleRequest,
            services::content_service::types::UpdateModuleRequest,
            services::content_service::types::CreateLessonRequest,
            services::content_service::types::UpdateLessonRequest,
            services::content_service::types::ModuleView,
            services::content_service::types::LessonView,
            services::content_service::types::ResourceView,
            services::content_service::types::ProgramSummary,
            services::content_service::types::LessonContent,
            services::content_service::types::ModuleContent,
            services::content_service::types::LearningContentView,
            services::content_service::types::OutlineLesson,
            services::content_service::types::OutlineModule,
            services::content_service::types::ProgramOutlineView,
            services::progress_service::types::CompleteLessonRequest,
            services::progress_service::types::LessonProgressView,
            services::progress_service::types::ProgramProgressView,
            services::progress_service::types::LessonProgressEntry,
            services::progress_service::types::ProgramProgressDetail,
            services::progress_service::types::UserProgressStats,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "system", description = "Service health"),
        (name = "programs", description = "Programs and enrollment"),
        (name = "content", description = "Modules, lessons and resources"),
        (name = "progress", description = "Lesson completion and program rollups")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub storage: Arc<dyn StorageService>,
    pub program_service: Arc<ProgramService>,
    pub content_service: Arc<ContentService>,
    pub progress_service: Arc<ProgressService>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        let audit = AuditService::new(db.clone());
        let program_service = Arc::new(ProgramService::new(
            db.clone(),
            storage.clone(),
            audit.clone(),
        ));
        let content_service = Arc::new(ContentService::new(
            db.clone(),
            storage.clone(),
            audit,
            notifier.clone(),
            config.clone(),
        ));
        let progress_service = Arc::new(ProgressService::new(db.clone(), notifier));

        Self {
            db,
            config,
            storage,
            program_service,
            content_service,
            progress_service,
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    use api::handlers::{learning_content, lessons, modules, programs, progress, resources};

    let protected = Router::new()
        .route(
            "/api/programs",
            get(programs::list_programs).post(programs::create_program),
        )
        .route(
            "/api/programs/:id",
            get(programs::get_program)
                .put(programs::update_program)
                .delete(programs::delete_program),
        )
        .route("/api/programs/:id/enroll", post(programs::enroll))
        .route("/api/programs/:id/students", get(programs::list_students))
        .route("/api/programs/:id/outline", get(programs::get_outline))
        .route(
            "/api/programs/:id/learning-content",
            get(learning_content::get_learning_content),
        )
        .route(
            "/api/programs/:id/modules",
            get(modules::list_modules).post(modules::create_module),
        )
        .route(
            "/api/programs/:id/modules/reorder",
            put(modules::reorder_modules),
        )
        .route(
            "/api/programs/modules/:id",
            put(modules::update_module).delete(modules::delete_module),
        )
        .route(
            "/api/programs/modules/:id/lessons",
            get(lessons::list_lessons).post(lessons::create_lesson),
        )
        .route(
            "/api/programs/modules/:id/lessons/reorder",
            put(lessons::reorder_lessons),
        )
        .route(
            "/api/programs/lessons/:id",
            get(lessons::get_lesson)
                .put(lessons::update_lesson)
                .delete(lessons::delete_lesson),
        )
        .route("/api/programs/lessons/:id/video", post(lessons::upload_video))
        .route(
            "/api/programs/lessons/:id/resources",
            get(resources::list_resources).post(resources::create_resource),
        )
        .route(
            "/api/programs/lessons/:id/resources/reorder",
            put(resources::reorder_resources),
        )
        .route(
            "/api/programs/resources/:id",
            put(resources::update_resource).delete(resources::delete_resource),
        )
        .route("/api/progress/lessons/complete", post(progress::complete_lesson))
        .route(
            "/api/progress/lessons/:id",
            get(progress::get_lesson_progress),
        )
        .route(
            "/api/progress/lessons/:id/incomplete",
            post(progress::incomplete_lesson),
        )
        .route(
            "/api/progress/lessons/:id/watch-time",
            put(progress::update_watch_time),
        )
        .route(
            "/api/progress/lessons/:id/completed",
            get(progress::is_lesson_completed),
        )
        .route("/api/progress/programs", get(progress::list_program_progress))
        .route(
            "/api/progress/programs/:id",
            get(progress::get_program_progress),
        )
        .route(
            "/api/progress/programs/:id/initialize",
            post(progress::initialize_program_progress),
        )
        .route("/api/progress/stats", get(progress::get_stats))
        .route_layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .merge(protected)
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_upload_size + 10 * 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}
