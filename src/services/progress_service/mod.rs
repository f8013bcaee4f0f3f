use crate::api::error::AppError;
use crate::entities::{lessons, programs};
use crate::models::Caller;
use crate::services::access::require_view;
use crate::services::content_service::find_lesson;
use crate::services::notifier::Notifier;
use crate::utils::keyed_mutex::KeyedMutex;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub mod ledger;
pub mod reports;
pub mod rollup;
pub mod types;

/// Per-learner lesson records and the program rollups derived from them.
pub struct ProgressService {
    db: DatabaseConnection,
    locks: KeyedMutex,
    notifier: Arc<dyn Notifier>,
}

impl ProgressService {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            locks: KeyedMutex::new(),
            notifier,
        }
    }

    /// Learner/program locks currently tracked; idle ones are pruned after
    /// every write.
    pub fn lock_count(&self) -> usize {
        self.locks.len()
    }

    /// Loads a lesson the caller is allowed to track progress on. Unpublished
    /// lessons only exist for managers.
    async fn visible_lesson(
        &self,
        caller: &Caller,
        lesson_id: &str,
    ) -> Result<(lessons::Model, programs::Model), AppError> {
        let (lesson, module, program) = find_lesson(&self.db, lesson_id).await?;
        let access = require_view(&self.db, caller, &program).await?;
        if !access.sees_unpublished() && !(lesson.is_published && module.is_published) {
            return Err(AppError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        Ok((lesson, program))
    }
}
