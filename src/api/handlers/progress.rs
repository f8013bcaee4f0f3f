use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::progress_service::types::{
    CompleteLessonRequest, LessonProgressView, ProgramProgressDetail, ProgramProgressView,
    UserProgressStats, WatchTimeQuery,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonCompletedResponse {
    pub lesson_id: String,
    pub completed: bool,
}

#[utoipa::path(
    post,
    path = "/api/progress/lessons/complete",
    request_body = CompleteLessonRequest,
    responses(
        (status = 200, description = "Lesson marked complete", body = LessonProgressView),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn complete_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CompleteLessonRequest>,
) -> Result<Json<LessonProgressView>, AppError> {
    req.validate()?;
    Ok(Json(
        state
            .progress_service
            .mark_lesson_complete(&caller, &req.lesson_id, req.watch_time_seconds)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/progress/lessons/{id}/incomplete",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson marked incomplete", body = LessonProgressView),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn incomplete_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<LessonProgressView>, AppError> {
    Ok(Json(
        state
            .progress_service
            .mark_lesson_incomplete(&caller, &id)
            .await?,
    ))
}

#[utoipa::path(
    put,
    path = "/api/progress/lessons/{id}/watch-time",
    params(("id" = String, Path, description = "Lesson ID"), WatchTimeQuery),
    responses(
        (status = 200, description = "Watch time added", body = LessonProgressView),
        (status = 400, description = "Negative watch time"),
        (status = 403, description = "Not enrolled")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn update_watch_time(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Query(query): Query<WatchTimeQuery>,
) -> Result<Json<LessonProgressView>, AppError> {
    query.validate()?;
    Ok(Json(
        state
            .progress_service
            .update_watch_time(&caller, &id, query.watch_time_seconds)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/progress/lessons/{id}",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Caller's progress on the lesson", body = LessonProgressView),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn get_lesson_progress(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<LessonProgressView>, AppError> {
    Ok(Json(
        state
            .progress_service
            .get_lesson_progress(&caller, &id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/progress/lessons/{id}/completed",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Whether the caller completed the lesson", body = LessonCompletedResponse),
        (status = 403, description = "Not enrolled")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn is_lesson_completed(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<LessonCompletedResponse>, AppError> {
    let completed = state
        .progress_service
        .is_lesson_completed(&caller, &id)
        .await?;
    Ok(Json(LessonCompletedResponse {
        lesson_id: id,
        completed,
    }))
}

#[utoipa::path(
    get,
    path = "/api/progress/programs/{id}",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Per-lesson breakdown and totals", body = ProgramProgressDetail),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn get_program_progress(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ProgramProgressDetail>, AppError> {
    Ok(Json(
        state
            .progress_service
            .get_program_progress(&caller, &id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/progress/programs",
    responses(
        (status = 200, description = "Caller's rollups across programs", body = [ProgramProgressView])
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn list_program_progress(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<ProgramProgressView>>, AppError> {
    Ok(Json(
        state.progress_service.get_all_user_progress(&caller).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/progress/programs/{id}/initialize",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Existing or newly created rollup", body = ProgramProgressView),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn initialize_program_progress(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ProgramProgressView>, AppError> {
    Ok(Json(
        state
            .progress_service
            .initialize_program_progress(&caller, &id)
            .await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/progress/stats",
    responses(
        (status = 200, description = "Dashboard numbers for the caller", body = UserProgressStats)
    ),
    security(("jwt" = [])),
    tag = "progress"
)]
pub async fn get_stats(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<UserProgressStats>, AppError> {
    Ok(Json(
        state
            .progress_service
            .get_user_progress_stats(&caller)
            .await?,
    ))
}
