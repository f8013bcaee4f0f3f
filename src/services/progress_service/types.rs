use crate::entities::{lesson_progress, program_progress};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompleteLessonRequest {
    #[validate(length(min = 1, message = "lessonId is required"))]
    pub lesson_id: String,
    #[validate(range(min = 0, message = "Watch time cannot be negative"))]
    pub watch_time_seconds: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, IntoParams, Validate)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct WatchTimeQuery {
    #[validate(range(min = 0, message = "Watch time cannot be negative"))]
    pub watch_time_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressView {
    pub lesson_id: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watch_time_seconds: i64,
    pub last_watched_at: Option<DateTime<Utc>>,
}

impl LessonProgressView {
    /// What a lesson looks like before the learner has touched it.
    pub fn untouched(lesson_id: &str) -> Self {
        Self {
            lesson_id: lesson_id.to_string(),
            is_completed: false,
            completed_at: None,
            watch_time_seconds: 0,
            last_watched_at: None,
        }
    }
}

impl From<lesson_progress::Model> for LessonProgressView {
    fn from(p: lesson_progress::Model) -> Self {
        Self {
            lesson_id: p.lesson_id,
            is_completed: p.is_completed,
            completed_at: p.completed_at,
            watch_time_seconds: p.watch_time_seconds,
            last_watched_at: p.last_watched_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramProgressView {
    pub program_id: String,
    pub program_name: Option<String>,
    pub total_lessons: i32,
    pub completed_lessons: i32,
    pub progress_percentage: f64,
    pub total_watch_time_seconds: i64,
    pub is_completed: bool,
    pub started_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProgramProgressView {
    pub fn from_model(p: program_progress::Model, program_name: Option<String>) -> Self {
        Self {
            program_id: p.program_id,
            program_name,
            total_lessons: p.total_lessons,
            completed_lessons: p.completed_lessons,
            progress_percentage: p.progress_percentage,
            total_watch_time_seconds: p.total_watch_time_seconds,
            is_completed: p.is_completed,
            started_at: p.started_at,
            last_accessed_at: p.last_accessed_at,
            completed_at: p.completed_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressEntry {
    pub lesson_id: String,
    pub title: String,
    pub module_id: String,
    pub module_title: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub watch_time_seconds: i64,
    pub duration_minutes: Option<i32>,
    pub is_preview: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramProgressDetail {
    pub program_id: String,
    pub program_name: String,
    pub total_lessons: i32,
    pub completed_lessons: i32,
    pub progress_percentage: f64,
    pub total_watch_time_seconds: i64,
    pub is_completed: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub lessons: Vec<LessonProgressEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProgressStats {
    pub total_programs_enrolled: i64,
    pub completed_programs: i64,
    pub in_progress_programs: i64,
    pub average_progress_percentage: f64,
    pub total_lessons_completed: i64,
    pub total_watch_time_hours: i64,
}
