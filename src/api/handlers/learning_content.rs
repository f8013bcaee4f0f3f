use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::content_service::types::LearningContentView;
use axum::{
    Extension, Json,
    extract::{Path, State},
};

#[utoipa::path(
    get,
    path = "/api/programs/{id}/learning-content",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Module, lesson and resource hierarchy", body = LearningContentView),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn get_learning_content(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<LearningContentView>, AppError> {
    Ok(Json(
        state
            .content_service
            .get_program_learning_content(&caller, &id)
            .await?,
    ))
}
