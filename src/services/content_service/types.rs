use crate::entities::{lesson_resources, lessons, program_modules};
use crate::services::progress_service::types::ProgramProgressView;
use crate::services::storage::UploadedFile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

// ── Requests ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateModuleRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    /// Appended after the last module when omitted.
    pub order_index: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModuleRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub order_index: Option<i32>,
    pub is_published: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    #[validate(url(message = "Invalid video URL"))]
    pub video_url: Option<String>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,
    pub order_index: Option<i32>,
    pub is_published: Option<bool>,
    pub is_preview: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLessonRequest {
    #[validate(length(min = 1, max = 200, message = "Title must not be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    #[validate(url(message = "Invalid video URL"))]
    pub video_url: Option<String>,
    #[validate(range(min = 0, message = "Duration cannot be negative"))]
    pub duration_minutes: Option<i32>,
    pub order_index: Option<i32>,
    pub is_published: Option<bool>,
    pub is_preview: Option<bool>,
}

/// Resource fields as submitted in a multipart form. A `file` part, when
/// present, overrides `file_url`, `file_type` and `file_size_bytes`.
#[derive(Debug, Clone, Default)]
pub struct ResourceForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub order_index: Option<i32>,
    pub file: Option<UploadedFile>,
}

// ── Views ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleView {
    pub id: String,
    pub program_id: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub is_published: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<program_modules::Model> for ModuleView {
    fn from(m: program_modules::Model) -> Self {
        Self {
            id: m.id,
            program_id: m.program_id,
            title: m.title,
            description: m.description,
            order_index: m.order_index,
            is_published: m.is_published,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
    pub is_published: bool,
    pub is_preview: bool,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<lessons::Model> for LessonView {
    fn from(l: lessons::Model) -> Self {
        Self {
            id: l.id,
            module_id: l.module_id,
            title: l.title,
            description: l.description,
            content: l.content,
            video_url: l.video_url,
            duration_minutes: l.duration_minutes,
            order_index: l.order_index,
            is_published: l.is_published,
            is_preview: l.is_preview,
            created_at: l.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceView {
    pub id: String,
    pub lesson_id: String,
    pub title: String,
    pub description: Option<String>,
    pub file_url: Option<String>,
    pub file_type: Option<String>,
    pub file_size_bytes: Option<i64>,
    pub order_index: i32,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<lesson_resources::Model> for ResourceView {
    fn from(r: lesson_resources::Model) -> Self {
        Self {
            id: r.id,
            lesson_id: r.lesson_id,
            title: r.title,
            description: r.description,
            file_url: r.file_url,
            file_type: r.file_type,
            file_size_bytes: r.file_size_bytes,
            order_index: r.order_index,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramSummary {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub instructor_id: String,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub duration_weeks: i32,
    pub is_active: bool,
}

impl From<&crate::entities::programs::Model> for ProgramSummary {
    fn from(p: &crate::entities::programs::Model) -> Self {
        Self {
            id: p.id.clone(),
            name: p.name.clone(),
            description: p.description.clone(),
            instructor_id: p.instructor_id.clone(),
            difficulty: p.difficulty.clone(),
            category: p.category.clone(),
            duration_weeks: p.duration_weeks,
            is_active: p.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonContent {
    #[serde(flatten)]
    pub lesson: LessonView,
    pub resources: Vec<ResourceView>,
    /// The caller's own completion flag; absent for managers.
    pub is_completed: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ModuleContent {
    #[serde(flatten)]
    pub module: ModuleView,
    pub lessons: Vec<LessonContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LearningContentView {
    pub program: ProgramSummary,
    pub can_manage: bool,
    pub modules: Vec<ModuleContent>,
    /// Rollup numbers, present when the caller is an enrolled learner.
    pub progress: Option<ProgramProgressView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutlineLesson {
    pub id: String,
    pub title: String,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
    pub is_preview: bool,
    /// Full lesson body and resources, only for preview lessons.
    pub preview: Option<LessonContent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutlineModule {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub order_index: i32,
    pub lessons: Vec<OutlineLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramOutlineView {
    pub program: ProgramSummary,
    pub total_lessons: usize,
    pub total_duration_minutes: i64,
    pub modules: Vec<OutlineModule>,
}
