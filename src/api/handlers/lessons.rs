use super::uploads::{multipart_error, read_file};
use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::content_service::types::{CreateLessonRequest, LessonView, UpdateLessonRequest};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/api/programs/modules/{id}/lessons",
    params(("id" = String, Path, description = "Module ID")),
    responses(
        (status = 200, description = "Lessons in display order", body = [LessonView]),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Module not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn list_lessons(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Vec<LessonView>>, AppError> {
    Ok(Json(state.content_service.list_lessons(&caller, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/programs/modules/{id}/lessons",
    params(("id" = String, Path, description = "Module ID")),
    request_body = CreateLessonRequest,
    responses(
        (status = 201, description = "Lesson created", body = LessonView),
        (status = 400, description = "Invalid lesson"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Module not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn create_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<CreateLessonRequest>,
) -> Result<(StatusCode, Json<LessonView>), AppError> {
    let lesson = state.content_service.create_lesson(&caller, &id, req).await?;
    Ok((StatusCode::CREATED, Json(lesson)))
}

#[utoipa::path(
    get,
    path = "/api/programs/lessons/{id}",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Lesson", body = LessonView),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn get_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<LessonView>, AppError> {
    Ok(Json(state.content_service.get_lesson(&caller, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/programs/lessons/{id}",
    params(("id" = String, Path, description = "Lesson ID")),
    request_body = UpdateLessonRequest,
    responses(
        (status = 200, description = "Lesson updated", body = LessonView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn update_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateLessonRequest>,
) -> Result<Json<LessonView>, AppError> {
    Ok(Json(
        state.content_service.update_lesson(&caller, &id, req).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/programs/lessons/{id}",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 204, description = "Lesson, its resources and progress deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn delete_lesson(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.content_service.delete_lesson(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/programs/modules/{id}/lessons/reorder",
    params(("id" = String, Path, description = "Module ID")),
    request_body = [String],
    responses(
        (status = 200, description = "Lessons in their new order", body = [LessonView]),
        (status = 400, description = "Ids are not a permutation of the module's lessons"),
        (status = 403, description = "Not the owner")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn reorder_lessons(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(ordered_ids): Json<Vec<String>>,
) -> Result<Json<Vec<LessonView>>, AppError> {
    Ok(Json(
        state
            .content_service
            .reorder_lessons(&caller, &id, ordered_ids)
            .await?,
    ))
}

#[utoipa::path(
    post,
    path = "/api/programs/lessons/{id}/video",
    params(("id" = String, Path, description = "Lesson ID")),
    request_body(content = Object, description = "Video file in a `file` part", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Video stored and attached", body = LessonView),
        (status = 400, description = "No file in request"),
        (status = 403, description = "Not the owner"),
        (status = 413, description = "File too large")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn upload_video(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<LessonView>, AppError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("file") {
            let file = read_file(field).await?;
            return Ok(Json(
                state
                    .content_service
                    .upload_lesson_video(&caller, &id, file)
                    .await?,
            ));
        }
    }

    Err(AppError::Validation("No file found in request".to_string()))
}
