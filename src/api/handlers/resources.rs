use super::uploads::{multipart_error, read_file, read_text};
use crate::api::error::AppError;
use crate::models::Caller;
use crate::services::content_service::types::{ResourceForm, ResourceView};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use std::str::FromStr;

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<Option<T>, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{} must be a number", name)))
}

/// Collects the text fields and the optional `file` part of a resource form.
/// Unknown parts are skipped.
async fn read_resource_form(mut multipart: Multipart) -> Result<ResourceForm, AppError> {
    let mut form = ResourceForm::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file = read_file(field).await?;
                if !file.data.is_empty() {
                    form.file = Some(file);
                }
            }
            "title" => form.title = Some(read_text(field).await?),
            "description" => form.description = Some(read_text(field).await?),
            "fileUrl" => form.file_url = Some(read_text(field).await?).filter(|v| !v.is_empty()),
            "fileType" => form.file_type = Some(read_text(field).await?).filter(|v| !v.is_empty()),
            "fileSizeBytes" => {
                form.file_size_bytes = parse_number(&name, &read_text(field).await?)?
            }
            "orderIndex" => form.order_index = parse_number(&name, &read_text(field).await?)?,
            _ => {}
        }
    }

    Ok(form)
}

#[utoipa::path(
    get,
    path = "/api/programs/lessons/{id}/resources",
    params(("id" = String, Path, description = "Lesson ID")),
    responses(
        (status = 200, description = "Resources in display order", body = [ResourceView]),
        (status = 403, description = "Not enrolled"),
        (status = 404, description = "Lesson not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn list_resources(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<Json<Vec<ResourceView>>, AppError> {
    Ok(Json(state.content_service.list_resources(&caller, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/programs/lessons/{id}/resources",
    params(("id" = String, Path, description = "Lesson ID")),
    request_body(content = Object, description = "Fields title, description, fileUrl, fileType, fileSizeBytes, orderIndex and an optional `file` part", content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Resource created", body = ResourceView),
        (status = 400, description = "Invalid resource"),
        (status = 403, description = "Not the owner"),
        (status = 413, description = "File too large")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn create_resource(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ResourceView>), AppError> {
    let form = read_resource_form(multipart).await?;
    let resource = state
        .content_service
        .create_resource(&caller, &id, form)
        .await?;
    Ok((StatusCode::CREATED, Json(resource)))
}

#[utoipa::path(
    put,
    path = "/api/programs/resources/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    request_body(content = Object, description = "Any subset of the resource fields, optionally a replacement `file` part", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Resource updated", body = ResourceView),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Resource not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn update_resource(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Json<ResourceView>, AppError> {
    let form = read_resource_form(multipart).await?;
    Ok(Json(
        state
            .content_service
            .update_resource(&caller, &id, form)
            .await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/api/programs/resources/{id}",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 204, description = "Resource deleted"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Resource not found")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn delete_resource(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.content_service.delete_resource(&caller, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    put,
    path = "/api/programs/lessons/{id}/resources/reorder",
    params(("id" = String, Path, description = "Lesson ID")),
    request_body = [String],
    responses(
        (status = 200, description = "Resources in their new order", body = [ResourceView]),
        (status = 400, description = "Ids are not a permutation of the lesson's resources"),
        (status = 403, description = "Not the owner")
    ),
    security(("jwt" = [])),
    tag = "content"
)]
pub async fn reorder_resources(
    State(state): State<crate::AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<String>,
    Json(ordered_ids): Json<Vec<String>>,
) -> Result<Json<Vec<ResourceView>>, AppError> {
    Ok(Json(
        state
            .content_service
            .reorder_resources(&caller, &id, ordered_ids)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number::<i32>("orderIndex", " 2 ").unwrap(), Some(2));
        assert_eq!(parse_number::<i64>("fileSizeBytes", "").unwrap(), None);
        assert!(parse_number::<i32>("orderIndex", "two").is_err());
    }
}
