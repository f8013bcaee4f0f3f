use crate::entities::{prelude::*, users};
use crate::models::Role;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set};
use tracing::info;
use uuid::Uuid;

/// Finds a user by username or creates one with the given role. An existing
/// user keeps whatever role it already has.
pub async fn ensure_user(
    db: &DatabaseConnection,
    username: &str,
    role: Role,
) -> Result<users::Model, DbErr> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await?
    {
        return Ok(existing);
    }

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        username: Set(username.to_string()),
        email: Set(None),
        name: Set(None),
        role: Set(role.as_str().to_string()),
        created_at: Set(Some(Utc::now())),
    }
    .insert(db)
    .await?;

    info!("👤 Created {} user '{}'", role, username);
    Ok(user)
}

pub async fn seed_admin(db: &DatabaseConnection, username: Option<&str>) -> Result<(), DbErr> {
    if let Some(username) = username {
        ensure_user(db, username, Role::Admin).await?;
    }
    Ok(())
}
