use crate::api::error::AppError;
use crate::config::AppConfig;
use crate::entities::{prelude::*, *};
use crate::entities::lessons as lesson_entity;
use crate::services::audit::AuditService;
use crate::services::notifier::{Notifier, notify_program_completed};
use crate::services::progress_service::rollup::{self, RollupOutcome};
use crate::services::storage::{StorageService, discard_stored};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};
use std::sync::Arc;

pub mod learning_content;
pub mod lessons;
pub mod modules;
pub mod ordering;
pub mod resources;
pub mod types;

/// Module, lesson and resource management beneath a program, plus the
/// learner-facing hierarchy views.
pub struct ContentService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    audit: AuditService,
    notifier: Arc<dyn Notifier>,
    config: AppConfig,
}

impl ContentService {
    pub fn new(
        db: DatabaseConnection,
        storage: Arc<dyn StorageService>,
        audit: AuditService,
        notifier: Arc<dyn Notifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            storage,
            audit,
            notifier,
            config,
        }
    }

    /// Recomputes every learner's rollup for the program after its published
    /// structure changed. Returns the rollups that became complete; announce
    /// them with `notify_completions` once the transaction has committed.
    async fn refresh_rollups(
        &self,
        conn: &impl ConnectionTrait,
        program_id: &str,
    ) -> Result<Vec<RollupOutcome>, AppError> {
        let outcomes = rollup::refresh_program(conn, program_id).await?;
        tracing::info!(
            "🔄 Refreshed {} progress rollups for program {}",
            outcomes.len(),
            program_id
        );
        Ok(outcomes.into_iter().filter(|o| o.newly_completed).collect())
    }

    fn notify_completions(&self, completed: Vec<RollupOutcome>) {
        for outcome in completed {
            notify_program_completed(
                self.notifier.clone(),
                outcome.progress.user_id,
                outcome.progress.program_id,
            );
        }
    }

    async fn discard_all(&self, keys: Vec<String>) {
        for key in keys {
            discard_stored(self.storage.as_ref(), &key).await;
        }
    }
}

pub async fn find_program(
    db: &impl ConnectionTrait,
    program_id: &str,
) -> Result<programs::Model, AppError> {
    Programs::find_by_id(program_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Program {} not found", program_id)))
}

pub async fn find_module(
    db: &impl ConnectionTrait,
    module_id: &str,
) -> Result<(program_modules::Model, programs::Model), AppError> {
    let module = ProgramModules::find_by_id(module_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Module {} not found", module_id)))?;
    let program = find_program(db, &module.program_id).await?;
    Ok((module, program))
}

pub async fn find_lesson(
    db: &impl ConnectionTrait,
    lesson_id: &str,
) -> Result<(lesson_entity::Model, program_modules::Model, programs::Model), AppError> {
    let lesson = Lessons::find_by_id(lesson_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Lesson {} not found", lesson_id)))?;
    let (module, program) = find_module(db, &lesson.module_id).await?;
    Ok((lesson, module, program))
}

pub async fn find_resource(
    db: &impl ConnectionTrait,
    resource_id: &str,
) -> Result<(lesson_resources::Model, lesson_entity::Model, programs::Model), AppError> {
    let resource = LessonResources::find_by_id(resource_id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resource {} not found", resource_id)))?;
    let (lesson, _module, program) = find_lesson(db, &resource.lesson_id).await?;
    Ok((resource, lesson, program))
}

/// Deletes lessons with their resources and learner progress rows.
/// Returns the storage keys of files that belonged to them.
pub(crate) async fn delete_lessons_cascade(
    conn: &impl ConnectionTrait,
    lesson_ids: &[String],
) -> Result<Vec<String>, DbErr> {
    if lesson_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut storage_keys: Vec<String> = LessonResources::find()
        .filter(lesson_resources::Column::LessonId.is_in(lesson_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .filter_map(|r| r.storage_key)
        .collect();

    storage_keys.extend(
        Lessons::find()
            .filter(lesson_entity::Column::Id.is_in(lesson_ids.to_vec()))
            .all(conn)
            .await?
            .into_iter()
            .filter_map(|l| l.video_storage_key),
    );

    LessonResources::delete_many()
        .filter(lesson_resources::Column::LessonId.is_in(lesson_ids.to_vec()))
        .exec(conn)
        .await?;
    LessonProgress::delete_many()
        .filter(lesson_progress::Column::LessonId.is_in(lesson_ids.to_vec()))
        .exec(conn)
        .await?;
    Lessons::delete_many()
        .filter(lesson_entity::Column::Id.is_in(lesson_ids.to_vec()))
        .exec(conn)
        .await?;

    Ok(storage_keys)
}

/// Deletes modules and everything beneath them.
pub(crate) async fn delete_modules_cascade(
    conn: &impl ConnectionTrait,
    module_ids: &[String],
) -> Result<Vec<String>, DbErr> {
    if module_ids.is_empty() {
        return Ok(Vec::new());
    }

    let lesson_ids: Vec<String> = Lessons::find()
        .filter(lesson_entity::Column::ModuleId.is_in(module_ids.to_vec()))
        .all(conn)
        .await?
        .into_iter()
        .map(|l| l.id)
        .collect();

    let storage_keys = delete_lessons_cascade(conn, &lesson_ids).await?;

    ProgramModules::delete_many()
        .filter(program_modules::Column::Id.is_in(module_ids.to_vec()))
        .exec(conn)
        .await?;

    Ok(storage_keys)
}
