use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::content_service::types::ProgramOutlineView;
use crate::services::program_service::{
    CreateProgramRequest, EnrollmentView, ListProgramsQuery, ProgramView, StudentView,
    UpdateProgramRequest,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/api/programs",
    params(ListProgramsQuery),
    responses(
        (status = 200, description = "Active programs, or the caller's own with mine=true", body = [ProgramView]),
        (status = 401, description = "Unauthorized")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn list_programs(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListProgramsQuery>,
) -> Result<Json<Vec<ProgramView>>, AppError> {
    Ok(Json(state.program_service.list_programs(&caller, query).await?))
}

#[utoipa::path(
    post,
    path = "/api/programs",
    request_body = CreateProgramRequest,
    responses(
        (status = 201, description = "Program created", body = ProgramView),
        (status = 400, description = "Invalid program"),
        (status = 403, description = "Learners cannot create programs"),
        (status = 409, description = "Duplicate program name")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn create_program(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Json(req): Json<CreateProgramRequest>,
) -> Result<(StatusCode, Json<ProgramView>), AppError> {
    let program = state.program_service.create_program(&caller, req).await?;
    Ok((StatusCode::CREATED, Json(program)))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Program", body = ProgramView),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn get_program(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ProgramView>, AppError> {
    Ok(Json(state.program_service.get_program(&caller, &id).await?))
}

#[utoipa::path(
    put,
    path = "/api/programs/{id}",
    params(("id" = String, Path, description = "Program ID")),
    request_body = UpdateProgramRequest,
    responses(
        (status = 200, description = "Program updated", body = ProgramView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn update_program(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProgramRequest>,
) -> Result<Json<ProgramView>, AppError> {
    Ok(Json(
        state.program_service.update_program(&caller, &id, req).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/programs/{id}",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 204, description = "Program and its content deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn delete_program(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.program_service.delete_program(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/programs/{id}/enroll",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 201, description = "Enrolled", body = EnrollmentView),
        (status = 403, description = "Only learners can enroll"),
        (status = 409, description = "Already enrolled or program inactive")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn enroll(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<EnrollmentView>), AppError> {
    let enrollment = state.program_service.enroll(&caller, &id).await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}/students",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Enrolled students with their progress", body = [StudentView]),
        (status = 403, description = "Not the owner")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn list_students(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Vec<StudentView>>, AppError> {
    Ok(Json(state.program_service.list_students(&caller, &id).await?))
}

#[utoipa::path(
    get,
    path = "/api/programs/{id}/outline",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Published outline with preview lessons", body = ProgramOutlineView),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "programs"
)]
pub async fn get_outline(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<ProgramOutlineView>, AppError> {
    Ok(Json(
        state
            .content_service
            .get_program_outline(&caller, &id)
            .await?,
    ))
}
