use super::ProgressService;
use super::rollup;
use super::types::LessonProgressView;
use crate::api::error::AppError;
use crate::entities::{lesson_progress, prelude::*};
use crate::models::Caller;
use crate::services::notifier::notify_program_completed;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

async fn find_row(
    conn: &impl ConnectionTrait,
    user_id: &str,
    lesson_id: &str,
) -> Result<Option<lesson_progress::Model>, DbErr> {
    LessonProgress::find()
        .filter(lesson_progress::Column::UserId.eq(user_id))
        .filter(lesson_progress::Column::LessonId.eq(lesson_id))
        .one(conn)
        .await
}

fn fresh_row(user_id: &str, lesson_id: &str) -> lesson_progress::Model {
    lesson_progress::Model {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_string(),
        lesson_id: lesson_id.to_string(),
        is_completed: false,
        completed_at: None,
        watch_time_seconds: 0,
        last_watched_at: None,
    }
}

async fn save_row(
    conn: &impl ConnectionTrait,
    row: lesson_progress::Model,
    is_new: bool,
) -> Result<lesson_progress::Model, DbErr> {
    let active = lesson_progress::ActiveModel::from(row).reset_all();
    if is_new {
        active.insert(conn).await
    } else {
        active.update(conn).await
    }
}

fn accumulate(current: i64, seconds: i64) -> Result<i64, AppError> {
    current.checked_add(seconds).ok_or_else(|| {
        AppError::Validation("Watch time total is out of range".to_string())
    })
}

fn complete(
    row: &mut lesson_progress::Model,
    watch_time_seconds: Option<i64>,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if let Some(seconds) = watch_time_seconds.filter(|s| *s > 0) {
        row.watch_time_seconds = accumulate(row.watch_time_seconds, seconds)?;
    }
    if !row.is_completed {
        row.is_completed = true;
        row.completed_at = Some(now);
    }
    row.last_watched_at = Some(now);
    Ok(())
}

fn reopen(row: &mut lesson_progress::Model, now: DateTime<Utc>) {
    row.is_completed = false;
    row.completed_at = None;
    row.last_watched_at = Some(now);
}

fn add_watch_time(
    row: &mut lesson_progress::Model,
    seconds: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    row.watch_time_seconds = accumulate(row.watch_time_seconds, seconds)?;
    row.last_watched_at = Some(now);
    Ok(())
}

fn non_negative(seconds: i64) -> Result<i64, AppError> {
    if seconds < 0 {
        return Err(AppError::Validation(
            "Watch time cannot be negative".to_string(),
        ));
    }
    Ok(seconds)
}

impl ProgressService {
    /// Upserts the caller's row for the lesson, applies `apply`, then
    /// recomputes the program rollup, all in one transaction under the
    /// learner/program lock. With `create_if_missing == false` an untouched
    /// lesson is reported as such and nothing is written.
    async fn mutate_lesson<F>(
        &self,
        caller: &Caller,
        lesson_id: &str,
        create_if_missing: bool,
        apply: F,
    ) -> Result<LessonProgressView, AppError>
    where
        F: FnOnce(&mut lesson_progress::Model, DateTime<Utc>) -> Result<(), AppError>,
    {
        let (lesson, program) = self.visible_lesson(caller, lesson_id).await?;

        let guard = self
            .locks
            .lock_progress(&caller.user_id, &program.id)
            .await;
        let result = self
            .write_lesson_row(&caller.user_id, &lesson.id, &program.id, create_if_missing, apply)
            .await;
        drop(guard);
        self.locks.cleanup();

        let (view, newly_completed) = result?;
        if newly_completed {
            notify_program_completed(
                self.notifier.clone(),
                caller.user_id.clone(),
                program.id.clone(),
            );
        }
        Ok(view)
    }

    /// Returns the saved row and whether the rollup just became complete.
    async fn write_lesson_row<F>(
        &self,
        user_id: &str,
        lesson_id: &str,
        program_id: &str,
        create_if_missing: bool,
        apply: F,
    ) -> Result<(LessonProgressView, bool), AppError>
    where
        F: FnOnce(&mut lesson_progress::Model, DateTime<Utc>) -> Result<(), AppError>,
    {
        let txn = self.db.begin().await?;
        let (mut row, is_new) = match find_row(&txn, user_id, lesson_id).await? {
            Some(existing) => (existing, false),
            None if create_if_missing => (fresh_row(user_id, lesson_id), true),
            None => {
                txn.rollback().await?;
                return Ok((LessonProgressView::untouched(lesson_id), false));
            }
        };

        apply(&mut row, Utc::now())?;
        let saved = save_row(&txn, row, is_new).await?;
        let outcome = rollup::recompute(&txn, user_id, program_id).await?;
        txn.commit().await?;

        Ok((saved.into(), outcome.newly_completed))
    }

    pub async fn mark_lesson_complete(
        &self,
        caller: &Caller,
        lesson_id: &str,
        watch_time_seconds: Option<i64>,
    ) -> Result<LessonProgressView, AppError> {
        let watch_time_seconds = watch_time_seconds.map(non_negative).transpose()?;
        let view = self
            .mutate_lesson(caller, lesson_id, true, |row, now| {
                complete(row, watch_time_seconds, now)
            })
            .await?;
        info!("✅ User {} completed lesson {}", caller.user_id, lesson_id);
        Ok(view)
    }

    pub async fn mark_lesson_incomplete(
        &self,
        caller: &Caller,
        lesson_id: &str,
    ) -> Result<LessonProgressView, AppError> {
        let view = self
            .mutate_lesson(caller, lesson_id, false, |row, now| {
                reopen(row, now);
                Ok(())
            })
            .await?;
        info!("↩️ User {} reopened lesson {}", caller.user_id, lesson_id);
        Ok(view)
    }

    /// Adds `seconds` to the learner's running watch time for the lesson.
    pub async fn update_watch_time(
        &self,
        caller: &Caller,
        lesson_id: &str,
        seconds: i64,
    ) -> Result<LessonProgressView, AppError> {
        let seconds = non_negative(seconds)?;
        self.mutate_lesson(caller, lesson_id, true, |row, now| {
            add_watch_time(row, seconds, now)
        })
        .await
    }

    pub async fn get_lesson_progress(
        &self,
        caller: &Caller,
        lesson_id: &str,
    ) -> Result<LessonProgressView, AppError> {
        let (lesson, _program) = self.visible_lesson(caller, lesson_id).await?;
        Ok(find_row(&self.db, &caller.user_id, &lesson.id)
            .await?
            .map(LessonProgressView::from)
            .unwrap_or_else(|| LessonProgressView::untouched(&lesson.id)))
    }

    pub async fn is_lesson_completed(
        &self,
        caller: &Caller,
        lesson_id: &str,
    ) -> Result<bool, AppError> {
        Ok(self.get_lesson_progress(caller, lesson_id).await?.is_completed)
    }
}
