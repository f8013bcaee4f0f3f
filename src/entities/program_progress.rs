use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "program_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub user_id: String,
    pub program_id: String,
    pub total_lessons: i32,
    pub completed_lessons: i32,
    pub progress_percentage: f64,
    pub total_watch_time_seconds: i64,
    pub is_completed: bool,
    pub started_at: DateTimeUtc,
    pub last_accessed_at: DateTimeUtc,
    pub completed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::programs::Entity",
        from = "Column::ProgramId",
        to = "super::programs::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Programs,
}

impl Related<super::programs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Programs.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
