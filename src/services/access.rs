use crate::api::error::AppError;
use crate::entities::{enrollments, prelude::*, programs};
use crate::models::{Caller, Role};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter};
use tracing::{error, warn};

/// How a caller may see a program's hierarchy and progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentAccess {
    /// Admin or owning instructor: sees everything, published or not.
    Manage,
    /// Enrolled learner: sees published modules and lessons only.
    Enrolled,
    Denied,
}

impl ContentAccess {
    pub fn is_allowed(self) -> bool {
        !matches!(self, ContentAccess::Denied)
    }

    pub fn sees_unpublished(self) -> bool {
        matches!(self, ContentAccess::Manage)
    }
}

/// Admin, or the instructor who owns the resource.
pub fn can_manage(caller: &Caller, resource_owner_id: &str) -> bool {
    match caller.role {
        Role::Admin => true,
        Role::Instructor => caller.user_id == resource_owner_id,
        Role::Learner => false,
    }
}

pub fn require_manage(caller: &Caller, program: &programs::Model) -> Result<(), AppError> {
    if can_manage(caller, &program.instructor_id) {
        Ok(())
    } else {
        warn!(
            "🚫 User {} ({}) may not manage program {}",
            caller.user_id, caller.role, program.id
        );
        Err(AppError::Forbidden(
            "You do not have permission to manage this program".to_string(),
        ))
    }
}

pub async fn is_enrolled(
    db: &impl ConnectionTrait,
    user_id: &str,
    program_id: &str,
) -> Result<bool, DbErr> {
    let count = Enrollments::find()
        .filter(enrollments::Column::UserId.eq(user_id))
        .filter(enrollments::Column::ProgramId.eq(program_id))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Evaluated in order: admin, owning instructor, enrolled learner, else denied.
/// A failing enrollment lookup denies access.
pub async fn program_access(
    db: &impl ConnectionTrait,
    caller: &Caller,
    program: &programs::Model,
) -> ContentAccess {
    if can_manage(caller, &program.instructor_id) {
        return ContentAccess::Manage;
    }

    if caller.role != Role::Learner {
        return ContentAccess::Denied;
    }

    match is_enrolled(db, &caller.user_id, &program.id).await {
        Ok(true) => ContentAccess::Enrolled,
        Ok(false) => ContentAccess::Denied,
        Err(e) => {
            error!(
                "Enrollment check failed for user {} program {}, denying: {}",
                caller.user_id, program.id, e
            );
            ContentAccess::Denied
        }
    }
}

pub async fn require_view(
    db: &impl ConnectionTrait,
    caller: &Caller,
    program: &programs::Model,
) -> Result<ContentAccess, AppError> {
    let access = program_access(db, caller, program).await;
    if access.is_allowed() {
        Ok(access)
    } else {
        Err(AppError::Forbidden(
            "You must be enrolled in this program to access its content".to_string(),
        ))
    }
}
