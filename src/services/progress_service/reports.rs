use super::ProgressService;
use super::rollup::{self, RollupTally};
use super::types::{
    LessonProgressEntry, ProgramProgressDetail, ProgramProgressView, UserProgressStats,
};
use crate::api::error::AppError;
use crate::entities::{enrollments, prelude::*, program_progress};
use crate::models::Caller;
use crate::services::access::require_view;
use crate::services::content_service::find_program;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

/// Folds a learner's rollup rows into dashboard numbers.
pub fn summarize(enrolled: i64, rollups: &[program_progress::Model]) -> UserProgressStats {
    let completed = rollups.iter().filter(|p| p.is_completed).count() as i64;
    let in_progress = rollups
        .iter()
        .filter(|p| !p.is_completed && p.completed_lessons > 0)
        .count() as i64;
    let average = if rollups.is_empty() {
        0.0
    } else {
        rollups.iter().map(|p| p.progress_percentage).sum::<f64>() / rollups.len() as f64
    };
    let lessons_completed = rollups.iter().map(|p| p.completed_lessons as i64).sum();
    let watch_seconds = rollups
        .iter()
        .fold(0i64, |acc, p| acc.saturating_add(p.total_watch_time_seconds));

    UserProgressStats {
        total_programs_enrolled: enrolled,
        completed_programs: completed,
        in_progress_programs: in_progress,
        average_progress_percentage: average,
        total_lessons_completed: lessons_completed,
        total_watch_time_hours: watch_seconds / 3600,
    }
}

impl ProgressService {
    /// Live breakdown of every published lesson in the program against the
    /// caller's lesson rows.
    pub async fn get_program_progress(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<ProgramProgressDetail, AppError> {
        let program = find_program(&self.db, program_id).await?;
        require_view(&self.db, caller, &program).await?;

        let published = rollup::published_lessons(&self.db, &program.id).await?;
        let lesson_ids: Vec<String> = published.iter().map(|p| p.lesson.id.clone()).collect();
        let rows = rollup::lesson_rows(&self.db, &caller.user_id, &lesson_ids).await?;
        let tally = RollupTally::from_rows(&lesson_ids, &rows);
        let stored = rollup::find_rollup(&self.db, &caller.user_id, &program.id).await?;

        let by_lesson: HashMap<&str, _> = rows.iter().map(|r| (r.lesson_id.as_str(), r)).collect();
        let lessons = published
            .iter()
            .map(|p| {
                let row = by_lesson.get(p.lesson.id.as_str());
                LessonProgressEntry {
                    lesson_id: p.lesson.id.clone(),
                    title: p.lesson.title.clone(),
                    module_id: p.module_id.clone(),
                    module_title: p.module_title.clone(),
                    is_completed: row.is_some_and(|r| r.is_completed),
                    completed_at: row.and_then(|r| r.completed_at),
                    watch_time_seconds: row.map_or(0, |r| r.watch_time_seconds),
                    duration_minutes: p.lesson.duration_minutes,
                    is_preview: p.lesson.is_preview,
                }
            })
            .collect();

        Ok(ProgramProgressDetail {
            program_id: program.id,
            program_name: program.name,
            total_lessons: tally.total_lessons,
            completed_lessons: tally.completed_lessons,
            progress_percentage: tally.percentage(),
            total_watch_time_seconds: tally.total_watch_time_seconds,
            is_completed: tally.is_complete(),
            started_at: stored.as_ref().map(|s| s.started_at),
            last_accessed_at: stored.as_ref().map(|s| s.last_accessed_at),
            lessons,
        })
    }

    /// The caller's rollups, most recently touched first.
    pub async fn get_all_user_progress(
        &self,
        caller: &Caller,
    ) -> Result<Vec<ProgramProgressView>, AppError> {
        let rows = ProgramProgress::find()
            .filter(program_progress::Column::UserId.eq(&caller.user_id))
            .order_by_desc(program_progress::Column::LastAccessedAt)
            .find_also_related(Programs)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(progress, program)| {
                ProgramProgressView::from_model(progress, program.map(|p| p.name))
            })
            .collect())
    }

    pub async fn get_user_progress_stats(
        &self,
        caller: &Caller,
    ) -> Result<UserProgressStats, AppError> {
        let rollups = ProgramProgress::find()
            .filter(program_progress::Column::UserId.eq(&caller.user_id))
            .all(&self.db)
            .await?;
        let enrolled = Enrollments::find()
            .filter(enrollments::Column::UserId.eq(&caller.user_id))
            .count(&self.db)
            .await?;

        Ok(summarize(enrolled as i64, &rollups))
    }

    async fn ensure_rollup(
        &self,
        user_id: &str,
        program_id: &str,
    ) -> Result<program_progress::Model, AppError> {
        let txn = self.db.begin().await?;
        let progress = rollup::ensure_initialized(&txn, user_id, program_id).await?;
        txn.commit().await?;
        Ok(progress)
    }

    /// Creates the caller's rollup row for the program if it does not exist.
    pub async fn initialize_program_progress(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<ProgramProgressView, AppError> {
        let program = find_program(&self.db, program_id).await?;
        require_view(&self.db, caller, &program).await?;

        let guard = self
            .locks
            .lock_progress(&caller.user_id, &program.id)
            .await;
        let result = self.ensure_rollup(&caller.user_id, &program.id).await;
        drop(guard);
        self.locks.cleanup();
        let progress = result?;

        info!(
            "🚀 Progress initialized for user {} in program {} ({} lessons)",
            caller.user_id, program.id, progress.total_lessons
        );
        Ok(ProgramProgressView::from_model(progress, Some(program.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rollup_row(completed: i32, total: i32, watch: i64) -> program_progress::Model {
        program_progress::Model {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: "u1".to_string(),
            program_id: uuid::Uuid::new_v4().to_string(),
            total_lessons: total,
            completed_lessons: completed,
            progress_percentage: rollup::progress_percentage(completed, total),
            total_watch_time_seconds: watch,
            is_completed: total > 0 && completed == total,
            started_at: Utc::now(),
            last_accessed_at: Utc::now(),
            completed_at: None,
        }
    }

    #[test]
    fn test_summarize_empty() {
        let stats = summarize(0, &[]);
        assert_eq!(stats.total_programs_enrolled, 0);
        assert_eq!(stats.average_progress_percentage, 0.0);
        assert_eq!(stats.total_watch_time_hours, 0);
    }

    #[test]
    fn test_summarize_mixed_programs() {
        let rows = vec![
            rollup_row(4, 4, 5400),
            rollup_row(1, 4, 1800),
            rollup_row(0, 2, 0),
        ];
        let stats = summarize(3, &rows);
        assert_eq!(stats.total_programs_enrolled, 3);
        assert_eq!(stats.completed_programs, 1);
        assert_eq!(stats.in_progress_programs, 1);
        assert_eq!(stats.total_lessons_completed, 5);
        assert!((stats.average_progress_percentage - 41.666).abs() < 0.01);
        // 7200 seconds
        assert_eq!(stats.total_watch_time_hours, 2);
    }

    #[test]
    fn test_watch_hours_floor() {
        let stats = summarize(1, &[rollup_row(0, 1, 3599)]);
        assert_eq!(stats.total_watch_time_hours, 0);
    }
}
