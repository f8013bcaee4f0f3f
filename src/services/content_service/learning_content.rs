use super::types::{
    LearningContentView, LessonContent, LessonView, ModuleContent, ModuleView, OutlineLesson,
    OutlineModule, ProgramOutlineView, ProgramSummary, ResourceView,
};
use super::{ContentService, find_program};
use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::models::Caller;
use crate::services::access::{ContentAccess, can_manage, require_view};
use crate::services::progress_service::rollup;
use crate::services::progress_service::types::ProgramProgressView;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use std::collections::{HashMap, HashSet};

/// Modules with their lessons, and the resources of those lessons fetched in a
/// second query keyed by lesson id. Joining both one-to-many edges in a single
/// query would multiply rows.
struct Hierarchy {
    modules: Vec<(program_modules::Model, Vec<lessons::Model>)>,
    resources: HashMap<String, Vec<lesson_resources::Model>>,
}

async fn load_hierarchy(
    conn: &impl ConnectionTrait,
    program_id: &str,
    include_unpublished: bool,
) -> Result<Hierarchy, DbErr> {
    let mut query = ProgramModules::find().filter(program_modules::Column::ProgramId.eq(program_id));
    if !include_unpublished {
        query = query.filter(program_modules::Column::IsPublished.eq(true));
    }

    let mut modules: Vec<(program_modules::Model, Vec<lessons::Model>)> = query
        .order_by_asc(program_modules::Column::OrderIndex)
        .find_with_related(Lessons)
        .all(conn)
        .await?
        .into_iter()
        .map(|(module, mut lessons)| {
            lessons.retain(|l| include_unpublished || l.is_published);
            lessons.sort_by_key(|l| l.order_index);
            (module, lessons)
        })
        .collect();
    modules.sort_by_key(|(m, _)| m.order_index);

    let lesson_ids: Vec<String> = modules
        .iter()
        .flat_map(|(_, lessons)| lessons.iter().map(|l| l.id.clone()))
        .collect();

    let mut resources: HashMap<String, Vec<lesson_resources::Model>> = HashMap::new();
    if !lesson_ids.is_empty() {
        for resource in LessonResources::find()
            .filter(lesson_resources::Column::LessonId.is_in(lesson_ids))
            .order_by_asc(lesson_resources::Column::OrderIndex)
            .all(conn)
            .await?
        {
            resources
                .entry(resource.lesson_id.clone())
                .or_default()
                .push(resource);
        }
    }

    Ok(Hierarchy { modules, resources })
}

fn lesson_content(
    lesson: lessons::Model,
    resources: &mut HashMap<String, Vec<lesson_resources::Model>>,
    is_completed: Option<bool>,
) -> LessonContent {
    let attached = resources
        .remove(&lesson.id)
        .unwrap_or_default()
        .into_iter()
        .map(ResourceView::from)
        .collect();
    LessonContent {
        lesson: LessonView::from(lesson),
        resources: attached,
        is_completed,
    }
}

impl ContentService {
    /// The program's hierarchy as the caller may see it: managers get every
    /// module and lesson, enrolled learners only published ones along with
    /// their own completion flags and rollup.
    pub async fn get_program_learning_content(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<LearningContentView, AppError> {
        let program = find_program(&self.db, program_id).await?;
        let access = require_view(&self.db, caller, &program).await?;

        let Hierarchy {
            modules,
            mut resources,
        } = load_hierarchy(&self.db, &program.id, access.sees_unpublished()).await?;

        let (completed, progress) = if access == ContentAccess::Enrolled {
            let lesson_ids: Vec<String> = modules
                .iter()
                .flat_map(|(_, lessons)| lessons.iter().map(|l| l.id.clone()))
                .collect();
            let completed: HashSet<String> =
                rollup::lesson_rows(&self.db, &caller.user_id, &lesson_ids)
                    .await?
                    .into_iter()
                    .filter(|r| r.is_completed)
                    .map(|r| r.lesson_id)
                    .collect();
            let progress = rollup::find_rollup(&self.db, &caller.user_id, &program.id)
                .await?
                .map(|p| ProgramProgressView::from_model(p, Some(program.name.clone())));
            (Some(completed), progress)
        } else {
            (None, None)
        };

        let modules = modules
            .into_iter()
            .map(|(module, lessons)| ModuleContent {
                module: ModuleView::from(module),
                lessons: lessons
                    .into_iter()
                    .map(|lesson| {
                        let done = completed.as_ref().map(|set| set.contains(&lesson.id));
                        lesson_content(lesson, &mut resources, done)
                    })
                    .collect(),
            })
            .collect();

        Ok(LearningContentView {
            program: ProgramSummary::from(&program),
            can_manage: access.sees_unpublished(),
            modules,
            progress,
        })
    }

    /// Published structure of an active program for any signed-in caller.
    /// Only preview lessons carry their body, video and resources.
    pub async fn get_program_outline(
        &self,
        caller: &Caller,
        program_id: &str,
    ) -> Result<ProgramOutlineView, AppError> {
        let program = find_program(&self.db, program_id).await?;
        if !program.is_active && !can_manage(caller, &program.instructor_id) {
            return Err(AppError::NotFound(format!("Program {} not found", program_id)));
        }

        let Hierarchy {
            modules,
            mut resources,
        } = load_hierarchy(&self.db, &program.id, false).await?;

        let mut total_lessons = 0;
        let mut total_duration_minutes: i64 = 0;
        let modules = modules
            .into_iter()
            .map(|(module, lessons)| {
                total_lessons += lessons.len();
                OutlineModule {
                    id: module.id,
                    title: module.title,
                    description: module.description,
                    order_index: module.order_index,
                    lessons: lessons
                        .into_iter()
                        .map(|lesson| {
                            total_duration_minutes += lesson.duration_minutes.unwrap_or(0) as i64;
                            OutlineLesson {
                                id: lesson.id.clone(),
                                title: lesson.title.clone(),
                                duration_minutes: lesson.duration_minutes,
                                order_index: lesson.order_index,
                                is_preview: lesson.is_preview,
                                preview: lesson
                                    .is_preview
                                    .then(|| lesson_content(lesson, &mut resources, None)),
                            }
                        })
                        .collect(),
                }
            })
            .collect();

        Ok(ProgramOutlineView {
            program: ProgramSummary::from(&program),
            total_lessons,
            total_duration_minutes,
            modules,
        })
    }
}
