use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    #[sea_orm(indexed)]
    pub module_id: String,
    pub title: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,
    pub video_url: Option<String>,
    pub video_storage_key: Option<String>,
    pub duration_minutes: Option<i32>,
    pub order_index: i32,
    pub is_published: bool,
    pub is_preview: bool,
    pub created_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::program_modules::Entity",
        from = "Column::ModuleId",
        to = "super::program_modules::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    ProgramModules,
    #[sea_orm(has_many = "super::lesson_resources::Entity")]
    LessonResources,
    #[sea_orm(has_many = "super::lesson_progress::Entity")]
    LessonProgress,
}

impl Related<super::program_modules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ProgramModules.def()
    }
}

impl Related<super::lesson_resources::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LessonResources.def()
    }
}

impl Related<super::lesson_progress::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LessonProgress.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
