use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::{Caller, Role};
use crate::services::access::{can_manage, require_manage};
use crate::services::audit::{AuditAction, AuditService};
use crate::services::content_service::{delete_modules_cascade, find_program};
use crate::services::progress_service::rollup;
use crate::services::storage::{StorageService, discard_stored};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

const ALREADY_ENROLLED: &str = "Already enrolled in this program";

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProgramRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: f64,
    #[validate(range(min = 1, message = "Duration must be at least one week"))]
    pub duration_weeks: i32,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProgramRequest {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[validate(range(min = 1, message = "Duration must be at least one week"))]
    pub duration_weeks: Option<i32>,
    pub difficulty: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProgramsQuery {
    /// Only programs the caller manages, including inactive ones.
    pub mine: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgramView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub price: f64,
    pub duration_weeks: i32,
    pub difficulty: Option<String>,
    pub instructor_id: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<programs::Model> for ProgramView {
    fn from(p: programs::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            duration_weeks: p.duration_weeks,
            difficulty: p.difficulty,
            instructor_id: p.instructor_id,
            category: p.category,
            location: p.location,
            is_active: p.is_active,
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentView {
    pub id: String,
    pub user_id: String,
    pub program_id: String,
    pub enrolled_at: DateTime<Utc>,
}

impl From<enrollments::Model> for EnrollmentView {
    fn from(e: enrollments::Model) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            program_id: e.program_id,
            enrolled_at: e.enrolled_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StudentView {
    pub user_id: String,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub enrolled_at: DateTime<Utc>,
    pub total_lessons: i32,
    pub completed_lessons: i32,
    pub progress_percentage: f64,
    pub is_completed: bool,
}

pub struct ProgramService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
    audit: AuditService,
}

impl ProgramService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, audit: AuditService) -> Self {
        Self { db, storage, audit }
    }

    async fn ensure_unique_name(
        &self,
        instructor_id: &str,
        name: &str,
        except_id: Option<&str>,
    ) -> Result<(), AppError> {
        let mut query = Programs::find()
            .filter(programs::Column::InstructorId.eq(instructor_id))
            .filter(programs::Column::Name.eq(name));
        if let Some(id) = except_id {
            query = query.filter(programs::Column::Id.ne(id));
        }
        if query.count(&self.db).await? > 0 {
            return Err(AppError::AlreadyExists(format!(
                "A program named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    pub async fn create_program(
        &self,
        caller: &Caller,
        req: CreateProgramRequest,
    ) -> Result<ProgramView, AppError> {
        req.validate()?;
        if caller.role == Role::Learner {
            return Err(AppError::Forbidden(
                "Only instructors and admins can create programs".to_string(),
            ));
        }

        let name = req.name.trim().to_string();
        self.ensure_unique_name(&caller.user_id, &name, None).await?;

        let created = programs::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name),
            description: Set(req.description),
            price: Set(req.price),
            duration_weeks: Set(req.duration_weeks),
            difficulty: Set(req.difficulty),
            instructor_id: Set(caller.user_id.clone()),
            category: Set(req.category),
            location: Set(req.location),
            is_active: Set(true),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await?;

        info!("🏋️ Program '{}' created by {}", created.name, caller.user_id);
        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ProgramCreate,
            Some(&created.id),
        );

        Ok(created.into())
    }

    /// Inactive programs are only visible to those who manage them.
    pub async fn get_program(&self, caller: &Caller, program_id: &str) -> Result<ProgramView, AppError> {
        let program = find_program(&self.db, program_id).await?;
        if !program.is_active && !can_manage(caller, &program.instructor_id) {
            return Err(AppError::NotFound(format!("Program {} not found", program_id)));
        }
        Ok(program.into())
    }

    pub async fn list_programs(
        &self,
        caller: &Caller,
        query: ListProgramsQuery,
    ) -> Result<Vec<ProgramView>, AppError> {
        let mut select = Programs::find();
        if query.mine.unwrap_or(false) {
            if !caller.is_admin() {
                select = select.filter(programs::Column::InstructorId.eq(&caller.user_id));
            }
        } else {
            select = select.filter(programs::Column::IsActive.eq(true));
        }

        Ok(select
            .order_by_desc(programs::Column::CreatedAt)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ProgramView::from)
            .collect())
    }

    pub async fn update_program(
        &self,
        caller: &Caller,
        program_id: &str,
        req: UpdateProgramRequest,
    ) -> Result<ProgramView, AppError> {
        req.validate()?;
        let program = find_program(&self.db, program_id).await?;
        require_manage(caller, &program)?;

        if let Some(name) = &req.name {
            self.ensure_unique_name(&program.instructor_id, name.trim(), Some(program_id))
                .await?;
        }

        let mut active: programs::ActiveModel = program.into();
        if let Some(name) = req.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(Some(description));
        }
        if let Some(price) = req.price {
            active.price = Set(price);
        }
        if let Some(weeks) = req.duration_weeks {
            active.duration_weeks = Set(weeks);
        }
        if let Some(difficulty) = req.difficulty {
            active.difficulty = Set(Some(difficulty));
        }
        if let Some(category) = req.category {
            active.category = Set(Some(category));
        }
        if let Some(location) = req.location {
            active.location = Set(Some(location));
        }
        if let Some(is_active) = req.is_active {
            active.is_active = Set(is_active);
        }
        let updated = active.update(&self.db).await?;

        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ProgramUpdate,
            Some(program_id),
        );

        Ok(updated.into())
    }

    /// Removes the program with its modules, lessons, resources, enrollments
    /// and progress rows.
    pub async fn delete_program(&self, caller: &Caller, program_id: &str) -> Result<(), AppError> {
        let program = find_program(&self.db, program_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let module_ids: Vec<String> = ProgramModules::find()
            .filter(program_modules::Column::ProgramId.eq(program_id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        let storage_keys = delete_modules_cascade(&txn, &module_ids).await?;

        ProgramProgress::delete_many()
            .filter(program_progress::Column::ProgramId.eq(program_id))
            .exec(&txn)
            .await?;
        Enrollments::delete_many()
            .filter(enrollments::Column::ProgramId.eq(program_id))
            .exec(&txn)
            .await?;
        Programs::delete_by_id(program_id).exec(&txn).await?;
        txn.commit().await?;

        for key in storage_keys {
            discard_stored(self.storage.as_ref(), &key).await;
        }

        info!("🗑️ Program '{}' deleted by {}", program.name, caller.user_id);
        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ProgramDelete,
            Some(program_id),
        );

        Ok(())
    }

    /// Records the enrollment and starts the learner's rollup in one
    /// transaction. Payment happens elsewhere.
    pub async fn enroll(&self, caller: &Caller, program_id: &str) -> Result<EnrollmentView, AppError> {
        if caller.role != Role::Learner {
            return Err(AppError::Forbidden(
                "Only learners can enroll in programs".to_string(),
            ));
        }
        let program = find_program(&self.db, program_id).await?;
        if !program.is_active {
            return Err(AppError::Conflict(
                "Program is not accepting enrollments".to_string(),
            ));
        }

        let txn = self.db.begin().await?;
        let existing = Enrollments::find()
            .filter(enrollments::Column::UserId.eq(&caller.user_id))
            .filter(enrollments::Column::ProgramId.eq(program_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            txn.rollback().await?;
            return Err(AppError::Conflict(ALREADY_ENROLLED.to_string()));
        }

        let enrollment = enrollments::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            user_id: Set(caller.user_id.clone()),
            program_id: Set(program_id.to_string()),
            enrolled_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await
        .map_err(|e| AppError::conflict_on_duplicate(e, ALREADY_ENROLLED))?;
        rollup::ensure_initialized(&txn, &caller.user_id, program_id).await?;
        txn.commit().await?;

        info!("🎟️ User {} enrolled in program {}", caller.user_id, program_id);
        self.audit.record(
            Some(&caller.user_id),
            AuditAction::ProgramEnroll,
            Some(program_id),
        );

        Ok(enrollment.into())
    }

    pub async fn list_students(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<Vec<StudentView>, AppError> {
        let program = find_program(&self.db, program_id).await?;
        require_manage(caller, &program)?;

        let mut rollups: HashMap<String, program_progress::Model> = ProgramProgress::find()
            .filter(program_progress::Column::ProgramId.eq(program_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| (p.user_id.clone(), p))
            .collect();

        let rows = Enrollments::find()
            .filter(enrollments::Column::ProgramId.eq(program_id))
            .order_by_asc(enrollments::Column::EnrolledAt)
            .find_also_related(Users)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(enrollment, user)| {
                let user = user?;
                let progress = rollups.remove(&user.id);
                Some(StudentView {
                    user_id: user.id,
                    username: user.username,
                    name: user.name,
                    email: user.email,
                    enrolled_at: enrollment.enrolled_at,
                    total_lessons: progress.as_ref().map_or(0, |p| p.total_lessons),
                    completed_lessons: progress.as_ref().map_or(0, |p| p.completed_lessons),
                    progress_percentage: progress.as_ref().map_or(0.0, |p| p.progress_percentage),
                    is_completed: progress.is_some_and(|p| p.is_completed),
                })
            })
            .collect())
    }
}
