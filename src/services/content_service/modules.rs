use super::ordering::{assign_order, next_order_index, place, validate_permutation};
use super::types::{CreateModuleRequest, ModuleView, UpdateModuleRequest};
use super::{ContentService, delete_modules_cascade, find_module, find_program};
use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::Caller;
use crate::services::access::{require_manage, require_view};
use crate::services::audit::AuditAction;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

async fn sibling_modules(
    conn: &impl ConnectionTrait,
    program_id: &str,
) -> Result<Vec<program_modules::Model>, DbErr> {
    ProgramModules::find()
        .filter(program_modules::Column::ProgramId.eq(program_id))
        .order_by_asc(program_modules::Column::OrderIndex)
        .order_by_asc(program_modules::Column::CreatedAt)
        .all(conn)
        .await
}

async fn renumber_modules(conn: &impl ConnectionTrait, ordered_ids: &[String]) -> Result<(), DbErr> {
    assign_order::<ProgramModules, _>(
        conn,
        program_modules::Column::Id,
        program_modules::Column::OrderIndex,
        ordered_ids,
    )
    .await
}

impl ContentService {
    pub async fn list_modules(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<Vec<ModuleView>, AppError> {
        let program = find_program(&self.db, program_id).await?;
        let access = require_view(&self.db, caller, &program).await?;

        Ok(sibling_modules(&self.db, program_id)
            .await?
            .into_iter()
            .filter(|m| access.sees_unpublished() || m.is_published)
            .map(ModuleView::from)
            .collect())
    }

    pub async fn create_module(
        &self,
        caller: &Caller,
        program_id: &str,
        req: CreateModuleRequest,
    ) -> Result<ModuleView, AppError> {
        req.validate()?;
        let program = find_program(&self.db, program_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let siblings = sibling_modules(&txn, program_id).await?;
        let indices: Vec<i32> = siblings.iter().map(|m| m.order_index).collect();

        let id = Uuid::new_v4().to_string();
        program_modules::ActiveModel {
            id: Set(id.clone()),
            program_id: Set(program_id.to_string()),
            title: Set(req.title.trim().to_string()),
            description: Set(req.description),
            order_index: Set(next_order_index(&indices)),
            is_published: Set(req.is_published.unwrap_or(false)),
            created_at: Set(Some(Utc::now())),
        }
        .insert(&txn)
        .await?;

        if let Some(target) = req.order_index {
            let sibling_ids: Vec<String> = siblings.into_iter().map(|m| m.id).collect();
            renumber_modules(&txn, &place(&sibling_ids, &id, target)).await?;
        }

        let completed = if req.is_published.unwrap_or(false) {
            self.refresh_rollups(&txn, program_id).await?
        } else {
            Vec::new()
        };

        let created = ProgramModules::find_by_id(&id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Module vanished after insert".to_string()))?;
        txn.commit().await?;
        self.notify_completions(completed);

        info!(
            "📚 Module '{}' created in program {} at position {}",
            created.title, program_id, created.order_index
        );
        self.audit
            .record(Some(&caller.user_id), AuditAction::ModuleCreate, Some(&id));

        Ok(created.into())
    }

    pub async fn update_module(
        &self,
        caller: &Caller,
        module_id: &str,
        req: UpdateModuleRequest,
    ) -> Result<ModuleView, AppError> {
        req.validate()?;
        let (module, program) = find_module(&self.db, module_id).await?;
        require_manage(caller, &program)?;

        let publish_changed = req
            .is_published
            .is_some_and(|published| published != module.is_published);

        let txn = self.db.begin().await?;
        let mut active: program_modules::ActiveModel = module.into();
        if let Some(title) = req.title {
            active.title = Set(title.trim().to_string());
        }
        if let Some(description) = req.description {
            active.description = Set(Some(description));
        }
        if let Some(published) = req.is_published {
            active.is_published = Set(published);
        }
        let updated = active.update(&txn).await?;

        if let Some(target) = req.order_index {
            let sibling_ids: Vec<String> = sibling_modules(&txn, &program.id)
                .await?
                .into_iter()
                .map(|m| m.id)
                .collect();
            renumber_modules(&txn, &place(&sibling_ids, module_id, target)).await?;
        }

        let completed = if publish_changed {
            self.refresh_rollups(&txn, &program.id).await?
        } else {
            Vec::new()
        };

        let updated = ProgramModules::find_by_id(&updated.id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::Internal("Module vanished after update".to_string()))?;
        txn.commit().await?;
        self.notify_completions(completed);

        self.audit
            .record(Some(&caller.user_id), AuditAction::ModuleUpdate, Some(module_id));

        Ok(updated.into())
    }

    pub async fn delete_module(&self, caller: &Caller, module_id: &str) -> Result<(), AppError> {
        let (module, program) = find_module(&self.db, module_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let storage_keys = delete_modules_cascade(&txn, std::slice::from_ref(&module.id)).await?;

        let remaining: Vec<String> = sibling_modules(&txn, &program.id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        renumber_modules(&txn, &remaining).await?;

        let completed = self.refresh_rollups(&txn, &program.id).await?;
        txn.commit().await?;
        self.notify_completions(completed);

        info!("🗑️ Module '{}' deleted from program {}", module.title, program.id);
        self.audit
            .record(Some(&caller.user_id), AuditAction::ModuleDelete, Some(module_id));
        self.discard_all(storage_keys).await;

        Ok(())
    }

    pub async fn reorder_modules(
        &self,
        caller: &Caller,
        program_id: &str,
        ordered_ids: Vec<String>,
    ) -> Result<Vec<ModuleView>, AppError> {
        let program = find_program(&self.db, program_id).await?;
        require_manage(caller, &program)?;

        let txn = self.db.begin().await?;
        let current: Vec<String> = sibling_modules(&txn, program_id)
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();
        validate_permutation(&current, &ordered_ids).map_err(AppError::Validation)?;

        renumber_modules(&txn, &ordered_ids).await?;
        let reordered = sibling_modules(&txn, program_id).await?;
        txn.commit().await?;

        self.audit
            .record(Some(&caller.user_id), AuditAction::ModuleReorder, Some(program_id));

        Ok(reordered.into_iter().map(ModuleView::from).collect())
    }
}
