use super::ordering::{assign_order, next_order_index, place, validate_permutation};
use super::types::{ResourceForm, ResourceView};
use super::{ContentService, find_lesson, find_resource};
use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::Caller;
use crate::services::access::{require_manage, require_view};
use crate::services::audit::AuditAction;
use crate::services::storage::{StoredFile, discard_stored, store_upload};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

async fn sibling_resources(
    conn: &impl ConnectionTrait,
    lesson_id: &str,
) -> Result<Vec<lesson_resources::Model>, DbErr> {
    LessonResources::find()
        .filter(lesson_resources::Column::LessonId.eq(lesson_id))
        .order_by_asc(lesson_resources::Column::OrderIndex)
        .order_by_asc(lesson_resources::Column::CreatedAt)
        .all(conn)
        .await
}

async fn renumber_resources(
    conn: &impl ConnectionTrait,
    ordered_ids: &[String],
) -> Result<(), DbErr> {
    assign_order::<LessonResources, _>(
        conn,
        lesson_resources::Column::Id,
        lesson_resources::Column::OrderIndex,
        ordered_ids,
    )
    .await
}

fn validate_form(form: &ResourceForm, creating: bool) -> Result<(), AppError> {
    match form.title.as_deref().map(str::trim) {
        Some("") => return Err(AppError::Validation("Title must not be empty".to_string())),
        None if creating => return Err(AppError::Validation("Title is required".to_string())),
        _ => {}
    }
    if form.file_size_bytes.is_some_and(|size| size < 0) {
        return Err(AppError::Validation(
            "File size cannot be negative".to_string(),
        ));
    }
    if creating && form.file.is_none() && form.file_url.as_deref().is_none_or(str::is_empty) {
        return Err(AppError::Validation(
            "Either a file or a file URL is required".to_string(),
        ));
    }
    Ok(())
}

impl ContentService {
    async fn store_resource_file(
        &self,
        lesson_id: &str,
        form: &mut ResourceForm,
    ) -> Result<Option<StoredFile>, AppError> {
        match form.file.take() {
            Some(file) => Ok(Some(
                store_upload(
                    self.storage.as_ref(),
                    &format!("resources/{}", lesson_id),
                    file,
                    self.config.max_upload_size,
                )
                .await?,
            )),
            None => Ok(None),
        }
    }

    pub async fn list_resources(
        &self,
        caller: &Caller,
        lesson_id: &str,
    ) -> Result<Vec<ResourceView>, AppError> {
        let (lesson, module, program) = find_lesson(&self.db, lesson_id).await?;
        let access = require_view(&self.db, caller, &program).await?;
        if !access.sees_unpublished() && !(lesson.is_published && module.is_published) {
            return Err(AppError::NotFound(format!("Lesson {} not found", lesson_id)));
        }

        Ok(sibling_resources(&self.db, lesson_id)
            .await?
            .into_iter()
            .map(ResourceView::from)
            .collect())
    }

    pub async fn create_resource(
        &self,
        caller: &Caller,
        lesson_id: &str,
        mut form: ResourceForm,
    ) -> Result<ResourceView, AppError> {
        validate_form(&form, true)?;
        let (lesson, _module, program) = find_lesson(&self.db, lesson_id).await?;
        require_manage(caller, &program)?;

        let stored = self.store_resource_file(&lesson.id, &mut form).await?;

        let result = self.insert_resource(&lesson.id, form, stored.as_ref()).await;
        if result.is_err()
            && let Some(stored) = &stored
        {
            discard_stored(self.storage.as_ref(), &stored.key).await;
        }
        let created = result?;

        info!(
            "📎 Resource '{}' attached to lesson {} at position {}",
            created.title, lesson.id, created.order_index
        );
        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ResourceCreate,
            Some(&created.id),
        );

        Ok(created.into())
    }

    async fn insert_resource(
        &self,
        lesson_id: &str,
        form: ResourceForm,
        stored: Option<&StoredFile>,
    ) -> Result<lesson_resources::Model, AppError> {
        let txn = self.db.begin().await?;
        let siblings = sibling_resources(&txn, lesson_id).await?;
        let indices: Vec<i32> = siblings.iter().map(|r| r.order_index).collect();

        let (file_url, file_type, file_size_bytes, storage_key) = match stored {
            Some(s) => (
                Some(s.url.clone()),
                Some(s.file_type.clone()),
                Some(s.size_bytes),
                Some(s.key.clone()),
            ),
            None => (form.file_url, form.file_type, form.file_size_bytes, None),
        };

        let id = Uuid::new_v4().to_string();
        lesson_resources::ActiveModel {
            id: Set(id.clone()),
            lesson_id: Set(lesson_id.to_string()),
            title: Set(form.title.unwrap_or_default().trim().to_string()),
            description: Set(form.description),
            file_url: Set(file_url),
            file_type: Set(file_type),
            file_size_bytes: Set(file_size_bytes),
            storage_key: Set(storage_key),
            order_index: Set(next_order_index(&indices)),
            created_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await?;

        if let Some(target) = form.order_index {
            let sibling_ids: Vec<String> = siblings.into_iter().map(|r| r.id).collect();
            renumber_resources(&txn, &place(&sibling_ids, &id, target)).await?;
        }

        let created = LessonResources::find_by_id(&id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Resource vanished after insert".to_string()))?;
        txn.commit().await?;
        Ok(created)
    }

    pub async fn update_resource(
        &self,
        caller: &Caller,
        resource_id: &str,
        mut form: ResourceForm,
    ) -> Result<ResourceView, AppError> {
        validate_form(&form, false)?;
        let (resource, lesson, program) = find_resource(&self.db, resource_id).await?;
        require_manage(caller, &program)?;

        let stored = self.store_resource_file(&lesson.id, &mut form).await?;
        let previous_key = resource.storage_key.clone();
        let replaces_file = stored.is_some() || form.file_url.is_some();

        let result = self
            .apply_resource_update(resource, &lesson.id, form, stored.as_ref())
            .await;
        match (&result, &stored) {
            (Err(_), Some(stored)) => discard_stored(self.storage.as_ref(), &stored.key).await,
            (Ok(_), _) if replaces_file => {
                if let Some(key) = previous_key {
                    discard_stored(self.storage.as_ref(), &key).await;
                }
            }
            _ => {}
        }
        let updated = result?;

        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ResourceUpdate,
            Some(resource_id),
        );

        Ok(updated.into())
    }

    async fn apply_resource_update(
        &self,
        resource: lesson_resources::Model,
        lesson_id: &str,
        form: ResourceForm,
        stored: Option<&StoredFile>,
    ) -> Result<lesson_resources::Model, AppError> {
        let resource_id = resource.id.clone();
        let txn = self.db.begin().await?;
        let mut active: lesson_resources::ActiveModel = resource.into();

        if let Some(title) = form.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = form.description {
            active.description = Set(Some(description));
        }
        match stored {
            Some(s) => {
                active.file_url = Set(Some(s.url.clone()));
                active.file_type = Set(Some(s.file_type.clone()));
                active.file_size_bytes = Set(Some(s.size_bytes));
                active.storage_key = Set(Some(s.key.clone()));
            }
            None => {
                if let Some(url) = form.file_url {
                    active.file_url = Set(Some(url));
                    active.storage_key = Set(None);
                }
                if let Some(file_type) = form.file_type {
                    active.file_type = Set(Some(file_type));
                }
                if let Some(size) = form.file_size_bytes {
                    active.file_size_bytes = Set(Some(size));
                }
            }
        }
        active.update(&txn).await?;

        if let Some(target) = form.order_index {
            let sibling_ids: Vec<String> = sibling_resources(&txn, lesson_id)
                .await?
                .into_iter()
                .map(|r| r.id)
                .collect();
            renumber_resources(&txn, &place(&sibling_ids, &resource_id, target)).await?;
        }

        let updated = LessonResources::find_by_id(&resource_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Resource vanished after update".to_string()))?;
        txn.commit().await?;
        Ok(updated)
    }

    pub async fn delete_resource(&self, caller: &Caller, resource_id: &str) -> Result<(), AppError> {
        let (resource, lesson, program) = find_resource(&self.db, resource_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        LessonResources::delete_by_id(&resource.id).exec(&txn).await?;
        let remaining: Vec<String> = sibling_resources(&txn, &lesson.id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        renumber_resources(&txn, &remaining).await?;
        txn.commit().await?;

        if let Some(key) = resource.storage_key {
            discard_stored(self.storage.as_ref(), &key).await;
        }

        info!("🗑️ Resource '{}' removed from lesson {}", resource.title, lesson.id);
        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ResourceDelete,
            Some(resource_id),
        );

        Ok(())
    }

    pub async fn reorder_resources(
        &self,
        caller: &Caller,
        lesson_id: &str,
        ordered_ids: Vec<String>,
    ) -> Result<Vec<ResourceView>, AppError> {
        let (_lesson, _module, program) = find_lesson(&self.db, lesson_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let current: Vec<String> = sibling_resources(&txn, lesson_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        validate_permutation(&current, &ordered_ids).map_err(AppError::Validation)?;

        renumber_resources(&txn, &ordered_ids).await?;
        let reordered = sibling_resources(&txn, lesson_id).await?;
        txn.commit().await?;

        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ResourceReorder,
            Some(lesson_id),
        );

        Ok(reordered.into_iter().map(ResourceView::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_title_and_source() {
        let form = ResourceForm {
            file_url: Some("https://cdn.example.com/plan.pdf".to_string()),
            ..Default::default()
        };
        assert!(validate_form(&form, true).is_err());

        let form = ResourceForm {
            title: Some("Meal plan".to_string()),
            ..Default::default()
        };
        assert!(validate_form(&form, true).is_err());

        let form = ResourceForm {
            title: Some("Meal plan".to_string()),
            file_url: Some("https://cdn.example.com/plan.pdf".to_string()),
            ..Default::default()
        };
        assert!(validate_form(&form, true).is_ok());
    }

    #[test]
    fn test_update_allows_partial_form() {
        assert!(validate_form(&ResourceForm::default(), false).is_ok());

        let form = ResourceForm {
            title: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(validate_form(&form, false).is_err());

        let form = ResourceForm {
            file_size_bytes: Some(-1),
            ..Default::default()
        };
        assert!(validate_form(&form, false).is_err());
    }
}
