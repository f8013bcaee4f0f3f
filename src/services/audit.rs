use crate::entities::audit_logs;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::fmt;
use tracing::{error, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ProgramCreate,
    ProgramUpdate,
    ProgramDelete,
    ProgramEnroll,
    ModuleCreate,
    ModuleUpdate,
    ModuleDelete,
    ModuleReorder,
    LessonCreate,
    LessonUpdate,
    LessonDelete,
    LessonReorder,
    LessonVideoUpload,
    ResourceCreate,
    ResourceUpdate,
    ResourceDelete,
    ResourceReorder,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Append-only audit sink. Each entry is traced immediately and persisted from
/// a background task; persistence failures are logged and dropped.
#[derive(Clone)]
pub struct AuditService {
    db: DatabaseConnection,
}

impl AuditService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn record(&self, actor: Option<&str>, action: AuditAction, resource_id: Option<&str>) {
        let action = action.to_string();
        let user_id = actor.map(str::to_string);
        let resource_id = resource_id.map(str::to_string);

        info!(
            target: "audit",
            action = %action,
            user_id = ?user_id,
            resource_id = ?resource_id,
            "Audit Event Occurred"
        );

        let db = self.db.clone();
        tokio::spawn(async move {
            let log = audit_logs::ActiveModel {
                id: Set(Uuid::new_v4().to_string()),
                timestamp: Set(chrono::Utc::now()),
                user_id: Set(user_id),
                action: Set(action),
                resource_id: Set(resource_id),
            };

            if let Err(e) = log.insert(&db).await {
                error!("Failed to persist audit log: {}", e);
            }
        });
    }
}
