use super::ordering::{assign_order, next_order_index, place, validate_permutation};
use super::types::{CreateLessonRequest, LessonView, UpdateLessonRequest};
use super::{ContentService, delete_lessons_cascade, find_lesson, find_module};
use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::Caller;
use crate::services::access::{require_manage, require_view};
use crate::services::audit::AuditAction;
use crate::services::storage::{UploadedFile, discard_stored, store_upload};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

async fn sibling_lessons(
    conn: &impl ConnectionTrait,
    module_id: &str,
) -> Result<Vec<lessons::Model>, DbErr> {
    Lessons::find()
        .filter(lessons::Column::ModuleId.eq(module_id))
        .order_by_asc(lessons::Column::OrderIndex)
        .order_by_asc(lessons::Column::CreatedAt)
        .all(conn)
        .await
}

async fn renumber_lessons(conn: &impl ConnectionTrait, ordered_ids: &[String]) -> Result<(), DbErr> {
    assign_order::<Lessons, _>(
        conn,
        lessons::Column::Id,
        lessons::Column::OrderIndex,
        ordered_ids,
    )
    .await
}

impl ContentService {
    pub async fn list_lessons(
        &self,
        caller: &Caller,
        module_id: &str,
    ) -> Result<Vec<LessonView>, AppError> {
        let (module, program) = find_module(&self.db, module_id).await?;
        let access = require_view(&self.db, caller, &program).await?;
        if !access.sees_unpublished() && !module.is_published {
            return Err(AppError::NotFound(format!("Module {} not found", module_id)));
        }

        Ok(sibling_lessons(&self.db, module_id)
            .await?
            .into_iter()
            .filter(|l| access.sees_unpublished() || l.is_published)
            .map(LessonView::from)
            .collect())
    }

    pub async fn get_lesson(&self, caller: &Caller, lesson_id: &str) -> Result<LessonView, AppError> {
        let (lesson, module, program) = find_lesson(&self.db, lesson_id).await?;
        let access = require_view(&self.db, caller, &program).await?;
        if !access.sees_unpublished() && !(lesson.is_published && module.is_published) {
            return Err(AppError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        Ok(lesson.into())
    }

    pub async fn create_lesson(
        &self,
        caller: &Caller,
        module_id: &str,
        req: CreateLessonRequest,
    ) -> Result<LessonView, AppError> {
        req.validate()?;
        let (module, program) = find_module(&self.db, module_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let siblings = sibling_lessons(&txn, module_id).await?;
        let indices: Vec<i32> = siblings.iter().map(|l| l.order_index).collect();
        let published = req.is_published.unwrap_or(false);

        let id = Uuid::new_v4().to_string();
        lessons::ActiveModel {
            id: Set(id.clone()),
            module_id: Set(module.id.clone()),
            title: Set(req.title.trim().to_string()),
            description: Set(req.description),
            content: Set(req.content),
            video_url: Set(req.video_url),
            video_storage_key: Set(None),
            duration_minutes: Set(req.duration_minutes),
            order_index: Set(next_order_index(&indices)),
            is_published: Set(published),
            is_preview: Set(req.is_preview.unwrap_or(false)),
            created_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await?;

        if let Some(target) = req.order_index {
            let sibling_ids: Vec<String> = siblings.into_iter().map(|l| l.id).collect();
            renumber_lessons(&txn, &place(&sibling_ids, &id, target)).await?;
        }

        let completed = if published && module.is_published {
            self.refresh_rollups(&txn, &program.id).await?
        } else {
            Vec::new()
        };

        let created = Lessons::find_by_id(&id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Lesson vanished after insert".to_string()))?;
        txn.commit().await?;
        self.notify_completions(completed);

        info!(
            "🎬 Lesson '{}' created in module {} at position {}",
            created.title, module.id, created.order_index
        );
        self.audit
            .record(Some(&caller.user_id), AuditAction::LessonCreate, Some(&id));

        Ok(created.into())
    }

    pub async fn update_lesson(
        &self,
        caller: &Caller,
        lesson_id: &str,
        req: UpdateLessonRequest,
    ) -> Result<LessonView, AppError> {
        req.validate()?;
        let (lesson, module, program) = find_lesson(&self.db, lesson_id).await?;
        require_manage(caller, &program)?;

        let publish_changed = req
            .is_published
            .is_some_and(|published| published != lesson.is_published);

        let txn = self.db.begin().await?;
        let mut active: lessons::ActiveModel = lesson.into();
        if let Some(title) = req.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(Some(description));
        }
        if let Some(content) = req.content {
            active.content = Set(Some(content));
        }
        if let Some(video_url) = req.video_url {
            active.video_url = Set(Some(video_url));
        }
        if let Some(duration) = req.duration_minutes {
            active.duration_minutes = Set(Some(duration));
        }
        if let Some(published) = req.is_published {
            active.is_published = Set(published);
        }
        if let Some(preview) = req.is_preview {
            active.is_preview = Set(preview);
        }
        active.update(&txn).await?;

        if let Some(target) = req.order_index {
            let sibling_ids: Vec<String> = sibling_lessons(&txn, &module.id)
                .await?
                .into_iter()
                .map(|l| l.id)
                .collect();
            renumber_lessons(&txn, &place(&sibling_ids, lesson_id, target)).await?;
        }

        let completed = if publish_changed && module.is_published {
            self.refresh_rollups(&txn, &program.id).await?
        } else {
            Vec::new()
        };

        let updated = Lessons::find_by_id(lesson_id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Lesson vanished after update".to_string()))?;
        txn.commit().await?;
        self.notify_completions(completed);

        self.audit
            .record(Some(&caller.user_id), AuditAction::LessonUpdate, Some(lesson_id));

        Ok(updated.into())
    }

    pub async fn delete_lesson(&self, caller: &Caller, lesson_id: &str) -> Result<(), AppError> {
        let (lesson, module, program) = find_lesson(&self.db, lesson_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let storage_keys = delete_lessons_cascade(&txn, std::slice::from_ref(&lesson.id)).await?;

        let remaining: Vec<String> = sibling_lessons(&txn, &module.id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        renumber_lessons(&txn, &remaining).await?;

        let completed = self.refresh_rollups(&txn, &program.id).await?;
        txn.commit().await?;
        self.notify_completions(completed);

        info!("🗑️ Lesson '{}' deleted from module {}", lesson.title, module.id);
        self.audit
            .record(Some(&caller.user_id), AuditAction::LessonDelete, Some(lesson_id));
        self.discard_all(storage_keys).await;

        Ok(())
    }

    pub async fn reorder_lessons(
        &self,
        caller: &Caller,
        module_id: &str,
        ordered_ids: Vec<String>,
    ) -> Result<Vec<LessonView>, AppError> {
        let (_module, program) = find_module(&self.db, module_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let current: Vec<String> = sibling_lessons(&txn, module_id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .collect();
        validate_permutation(&current, &ordered_ids).map_err(AppError::Validation)?;

        renumber_lessons(&txn, &ordered_ids).await?;
        let reordered = sibling_lessons(&txn, module_id).await?;
        txn.commit().await?;

        self.audit
            .record(Some(&caller.user_id), AuditAction::LessonReorder, Some(module_id));

        Ok(reordered.into_iter().map(LessonView::from).collect())
    }

    /// Stores an uploaded video and points the lesson at it, replacing any
    /// previously uploaded one.
    pub async fn upload_lesson_video(
        &self,
        caller: &Caller,
        lesson_id: &str,
        file: UploadedFile,
    ) -> Result<LessonView, AppError> {
        let (lesson, _module, program) = find_lesson(&self.db, lesson_id).await?;
        require_manage(caller, &program)?;

        let stored = store_upload(
            self.storage.as_ref(),
            &format!("lessons/{}", lesson_id),
            file,
            self.config.max_upload_size,
        )
        .await?;

        let previous_key = lesson.video_storage_key.clone();
        let mut active: lessons::ActiveModel = lesson.into();
        active.video_url = Set(Some(stored.url.clone()));
        active.video_storage_key = Set(Some(stored.key.clone()));

        let updated = match active.update(&self.db).await {
            Ok(updated) => updated,
            Err(e) => {
                discard_stored(self.storage.as_ref(), &stored.key).await;
                return Err(e.into());
            }
        };

        if let Some(key) = previous_key {
            discard_stored(self.storage.as_ref(), &key).await;
        }

        self.audit.record(
            Some(&caller.user_id),
            AuditAction::LessonVideoUpload,
            Some(lesson_id),
        );

        Ok(updated.into())
    }
}
