//! Program-level rollup of a learner's lesson records.
//!
//! The rollup row is derived data: every recompute re-reads the currently
//! published lessons of the program and the learner's lesson rows for them,
//! then overwrites the counts. Nothing is applied incrementally.

use crate::entities::{prelude::*, *};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set,
};
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// A published lesson together with the module it sits in, in display order.
#[derive(Debug, Clone)]
pub struct PublishedLesson {
    pub lesson: lessons::Model,
    pub module_id: String,
    pub module_title: String,
}

/// Counts behind a rollup row.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RollupTally {
    pub total_lessons: i32,
    pub completed_lessons: i32,
    pub total_watch_time_seconds: i64,
}

impl RollupTally {
    /// Tallies the learner's rows against the published lesson ids. Rows for
    /// lessons outside that set are ignored.
    pub fn from_rows(published_lesson_ids: &[String], rows: &[lesson_progress::Model]) -> Self {
        let by_lesson: HashMap<&str, &lesson_progress::Model> =
            rows.iter().map(|r| (r.lesson_id.as_str(), r)).collect();

        let mut tally = RollupTally {
            total_lessons: published_lesson_ids.len() as i32,
            ..Default::default()
        };
        for id in published_lesson_ids {
            if let Some(row) = by_lesson.get(id.as_str()) {
                if row.is_completed {
                    tally.completed_lessons += 1;
                }
                tally.total_watch_time_seconds = tally
                    .total_watch_time_seconds
                    .saturating_add(row.watch_time_seconds);
            }
        }
        tally
    }

    pub fn percentage(&self) -> f64 {
        progress_percentage(self.completed_lessons, self.total_lessons)
    }

    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}

/// `completed / total * 100`, or 0 for an empty program.
pub fn progress_percentage(completed: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    completed as f64 / total as f64 * 100.0
}

#[derive(Debug, Clone)]
pub struct RollupOutcome {
    pub progress: program_progress::Model,
    /// True when this recompute moved the row from in-progress to completed.
    pub newly_completed: bool,
}

/// Published lessons of published modules, ordered by module then lesson index.
pub async fn published_lessons(
    conn: &impl ConnectionTrait,
    program_id: &str,
) -> Result<Vec<PublishedLesson>, DbErr> {
    let modules = ProgramModules::find()
        .filter(program_modules::Column::ProgramId.eq(program_id))
        .filter(program_modules::Column::IsPublished.eq(true))
        .order_by_asc(program_modules::Column::OrderIndex)
        .all(conn)
        .await?;

    if modules.is_empty() {
        return Ok(Vec::new());
    }

    let module_ids: Vec<String> = modules.iter().map(|m| m.id.clone()).collect();
    let mut by_module: HashMap<String, Vec<lessons::Model>> = HashMap::new();
    for lesson in Lessons::find()
        .filter(lessons::Column::ModuleId.is_in(module_ids))
        .filter(lessons::Column::IsPublished.eq(true))
        .order_by_asc(lessons::Column::OrderIndex)
        .all(conn)
        .await?
    {
        by_module
            .entry(lesson.module_id.clone())
            .or_default()
            .push(lesson);
    }

    let mut ordered = Vec::new();
    for module in modules {
        for lesson in by_module.remove(&module.id).unwrap_or_default() {
            ordered.push(PublishedLesson {
                lesson,
                module_id: module.id.clone(),
                module_title: module.title.clone(),
            });
        }
    }
    Ok(ordered)
}

/// The learner's lesson rows for the given lessons.
pub async fn lesson_rows(
    conn: &impl ConnectionTrait,
    user_id: &str,
    lesson_ids: &[String],
) -> Result<Vec<lesson_progress::Model>, DbErr> {
    if lesson_ids.is_empty() {
        return Ok(Vec::new());
    }
    LessonProgress::find()
        .filter(lesson_progress::Column::UserId.eq(user_id))
        .filter(lesson_progress::Column::LessonId.is_in(lesson_ids.to_vec()))
        .all(conn)
        .await
}

pub async fn find_rollup(
    conn: &impl ConnectionTrait,
    user_id: &str,
    program_id: &str,
) -> Result<Option<program_progress::Model>, DbErr> {
    ProgramProgress::find()
        .filter(program_progress::Column::UserId.eq(user_id))
        .filter(program_progress::Column::ProgramId.eq(program_id))
        .one(conn)
        .await
}

/// Full re-scan of the learner's standing in the program; updates or lazily
/// creates the rollup row.
pub async fn recompute(
    conn: &impl ConnectionTrait,
    user_id: &str,
    program_id: &str,
) -> Result<RollupOutcome, DbErr> {
    let lessons = published_lessons(conn, program_id).await?;
    let lesson_ids: Vec<String> = lessons.iter().map(|l| l.lesson.id.clone()).collect();
    let rows = lesson_rows(conn, user_id, &lesson_ids).await?;
    let tally = RollupTally::from_rows(&lesson_ids, &rows);

    let now = Utc::now();
    let complete = tally.is_complete();

    let (progress, newly_completed) = match find_rollup(conn, user_id, program_id).await? {
        Some(existing) => {
            let was_complete = existing.is_completed;
            let completed_at = match (complete, existing.completed_at) {
                (true, Some(at)) if was_complete => Some(at),
                (true, _) => Some(now),
                (false, _) => None,
            };

            let mut active: program_progress::ActiveModel = existing.into();
            active.total_lessons = Set(tally.total_lessons);
            active.completed_lessons = Set(tally.completed_lessons);
            active.progress_percentage = Set(tally.percentage());
            active.total_watch_time_seconds = Set(tally.total_watch_time_seconds);
            active.is_completed = Set(complete);
            active.completed_at = Set(completed_at);
            active.last_accessed_at = Set(now);
            (active.update(conn).await?, complete && !was_complete)
        }
        None => {
            let created = program_progress::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                user_id: Set(user_id.to_string()),
                program_id: Set(program_id.to_string()),
                total_lessons: Set(tally.total_lessons),
                completed_lessons: Set(tally.completed_lessons),
                progress_percentage: Set(tally.percentage()),
                total_watch_time_seconds: Set(tally.total_watch_time_seconds),
                is_completed: Set(complete),
                started_at: Set(now),
                last_accessed_at: Set(now),
                completed_at: Set(complete.then_some(now)),
            }
            .insert(conn)
            .await?;
            (created, complete)
        }
    };

    debug!(
        "📈 Rollup user={} program={}: {}/{} ({:.1}%)",
        user_id,
        program_id,
        progress.completed_lessons,
        progress.total_lessons,
        progress.progress_percentage
    );
    if newly_completed {
        info!("🏁 User {} completed program {}", user_id, program_id);
    }

    Ok(RollupOutcome {
        progress,
        newly_completed,
    })
}

/// Returns the existing rollup row, or creates it from the current structure.
pub async fn ensure_initialized(
    conn: &impl ConnectionTrait,
    user_id: &str,
    program_id: &str,
) -> Result<program_progress::Model, DbErr> {
    match find_rollup(conn, user_id, program_id).await? {
        Some(existing) => Ok(existing),
        None => Ok(recompute(conn, user_id, program_id).await?.progress),
    }
}

/// Recomputes the rollup of every learner who has one for this program.
pub async fn refresh_program(
    conn: &impl ConnectionTrait,
    program_id: &str,
) -> Result<Vec<RollupOutcome>, DbErr> {
    let user_ids: Vec<String> = ProgramProgress::find()
        .filter(program_progress::Column::ProgramId.eq(program_id))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| p.user_id)
        .collect();

    let mut outcomes = Vec::with_capacity(user_ids.len());
    for user_id in user_ids {
        outcomes.push(recompute(conn, &user_id, program_id).await?);
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(lesson_id: &str, completed: bool, watch: i64) -> lesson_progress::Model {
        lesson_progress::Model {
            id: format!("lp-{}", lesson_id),
            user_id: "u1".to_string(),
            lesson_id: lesson_id.to_string(),
            is_completed: completed,
            completed_at: completed.then(Utc::now),
            watch_time_seconds: watch,
            last_watched_at: Some(Utc::now()),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_percentage_empty_program_is_zero() {
        assert_eq!(progress_percentage(0, 0), 0.0);
        assert_eq!(progress_percentage(3, 0), 0.0);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(progress_percentage(1, 4), 25.0);
        assert_eq!(progress_percentage(4, 4), 100.0);
        assert!((progress_percentage(1, 3) - 33.333).abs() < 0.01);
    }

    #[test]
    fn test_tally_counts_published_only() {
        let published = ids(&["l1", "l2", "l3"]);
        let rows = vec![
            row("l1", true, 30),
            row("l2", false, 45),
            row("unpublished", true, 600),
        ];
        let tally = RollupTally::from_rows(&published, &rows);
        assert_eq!(tally.total_lessons, 3);
        assert_eq!(tally.completed_lessons, 1);
        assert_eq!(tally.total_watch_time_seconds, 75);
        assert!(!tally.is_complete());
    }

    #[test]
    fn test_tally_complete_requires_lessons() {
        let empty = RollupTally::from_rows(&[], &[]);
        assert!(!empty.is_complete());
        assert_eq!(empty.percentage(), 0.0);

        let published = ids(&["l1", "l2"]);
        let rows = vec![row("l1", true, 0), row("l2", true, 0)];
        let tally = RollupTally::from_rows(&published, &rows);
        assert!(tally.is_complete());
        assert_eq!(tally.percentage(), 100.0);
    }

    #[test]
    fn test_tally_watch_time_saturates() {
        let published = ids(&["l1", "l2"]);
        let rows = vec![row("l1", false, i64::MAX), row("l2", false, 60)];
        let tally = RollupTally::from_rows(&published, &rows);
        assert_eq!(tally.total_watch_time_seconds, i64::MAX);
    }
}
