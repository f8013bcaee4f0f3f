use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::content_service::types::{CreateModuleRequest, ModuleView, UpdateModuleRequest};
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

#[utoipa::path(
    get,
    path = "/api/programs/{id}/modules",
    params(("id" = String, Path, description = "Program ID")),
    responses(
        (status = 200, description = "Modules in display order", body = [ModuleView]),
        (status = 403, description = "Not enrolled")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn list_modules(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ModuleView>>, AppError> {
    Ok(Json(state.content_service.list_modules(&caller, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/programs/{id}/modules",
    params(("id" = String, Path, description = "Program ID")),
    request_body = CreateModuleRequest,
    responses(
        (status = 201, description = "Module created", body = ModuleView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Program not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn create_module(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<CreateModuleRequest>,
) -> Result<(StatusCode, Json<ModuleView>), AppError> {
    let module = state.content_service.create_module(&caller, &id, req).await?;
    Ok((StatusCode::CREATED, Json(module)))
}

#[utoipa::path(
    put,
    path = "/api/programs/modules/{id}",
    params(("id" = String, Path, description = "Module ID")),
    request_body = UpdateModuleRequest,
    responses(
        (status = 200, description = "Module updated", body = ModuleView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Module not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn update_module(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(req): Json<UpdateModuleRequest>,
) -> Result<Json<ModuleView>, AppError> {
    Ok(Json(
        state.content_service.update_module(&caller, &id, req).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/programs/modules/{id}",
    params(("id" = String, Path, description = "Module ID")),
    responses(
        (status = 204, description = "Module and its lessons deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Module not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn delete_module(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.content_service.delete_module(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/programs/{id}/modules/reorder",
    params(("id" = String, Path, description = "Program ID")),
    request_body = [String],
    responses(
        (status = 200, description = "Modules in their new order", body = [ModuleView]),
        (status = 400, description = "Ids are not a permutation of the program's modules"),
        (status = 403, description = "Not the owner")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn reorder_modules(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(ordered_ids): Json<Vec<String>>,
) -> Result<Json<Vec<ModuleView>>, AppError> {
    Ok(Json(
        state
            .content_service
            .reorder_modules(&caller, &id, ordered_ids)
            .await?,
    ))
}
