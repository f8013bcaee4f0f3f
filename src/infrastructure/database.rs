use crate::entities::{
    audit_logs, enrollments, lesson_progress, lesson_resources, lessons, program_modules,
    program_progress, programs, users,
};
use anyhow::Context;
use sea_orm::sea_query::{Index, IndexCreateStatement, TableCreateStatement};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    Ok(db)
}

fn unique_index(name: &str, stmt: &mut IndexCreateStatement) -> IndexCreateStatement {
    stmt.name(name).unique().if_not_exists().to_owned()
}

/// Creates missing tables from the entities, parents before children, then
/// the natural-key unique indexes the progress upserts rely on.
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    info!("🔄 Running auto-migrations...");

    let tables: Vec<(&str, TableCreateStatement)> = vec![
        ("users", schema.create_table_from_entity(users::Entity)),
        ("programs", schema.create_table_from_entity(programs::Entity)),
        (
            "program_modules",
            schema.create_table_from_entity(program_modules::Entity),
        ),
        ("lessons", schema.create_table_from_entity(lessons::Entity)),
        (
            "lesson_resources",
            schema.create_table_from_entity(lesson_resources::Entity),
        ),
        ("enrollments", schema.create_table_from_entity(enrollments::Entity)),
        (
            "lesson_progress",
            schema.create_table_from_entity(lesson_progress::Entity),
        ),
        (
            "program_progress",
            schema.create_table_from_entity(program_progress::Entity),
        ),
        ("audit_logs", schema.create_table_from_entity(audit_logs::Entity)),
    ];

    for (name, mut stmt) in tables {
        stmt.if_not_exists();
        db.execute(builder.build(&stmt))
            .await
            .with_context(|| format!("creating table '{}'", name))?;
        info!("   - Table '{}' checked/created", name);
    }

    let indexes = vec![
        unique_index(
            "idx_lesson_progress_user_lesson",
            Index::create()
                .table(lesson_progress::Entity)
                .col(lesson_progress::Column::UserId)
                .col(lesson_progress::Column::LessonId),
        ),
        unique_index(
            "idx_program_progress_user_program",
            Index::create()
                .table(program_progress::Entity)
                .col(program_progress::Column::UserId)
                .col(program_progress::Column::ProgramId),
        ),
        unique_index(
            "idx_enrollments_user_program",
            Index::create()
                .table(enrollments::Entity)
                .col(enrollments::Column::UserId)
                .col(enrollments::Column::ProgramId),
        ),
    ];

    for stmt in indexes {
        db.execute(builder.build(&stmt)).await?;
    }
    info!("   - Unique progress and enrollment indexes checked/created");

    Ok(())
}
