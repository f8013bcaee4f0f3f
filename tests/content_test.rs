mod common;

use bytes::Bytes;
use common::setup;
use fitlearn_backend::api::error::AppError;
use fitlearn_backend::entities::{prelude::*, *};
use fitlearn_backend::models::Role;
use fitlearn_backend::services::content_service::types::{
    CreateModuleRequest, ResourceForm, UpdateLessonRequest, UpdateModuleRequest,
};
use fitlearn_backend::services::storage::UploadedFile;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_week_modules_append_then_reorder() {
    let ctx = setup().await;
    let coach = ctx.user("coach", Role::Instructor).await;
    let program = ctx.program(&coach, "Strength 101").await;
    let content = &ctx.state.content_service;

    let week1 = ctx.module(&coach, &program.id, "Week 1", true).await;
    let week2 = ctx.module(&coach, &program.id, "Week 2", true).await;
    assert_eq!(week1.order_index, 0);
    assert_eq!(week2.order_index, 1);

    let reordered = content
        .reorder_modules(&coach, &program.id, vec![week2.id.clone(), week1.id.clone()])
        .await
        .unwrap();
    assert_eq!(reordered[0].id, week2.id);
    assert_eq!(reordered[0].order_index, 0);
    assert_eq!(reordered[1].id, week1.id);
    assert_eq!(reordered[1].order_index, 1);

    let listed = content.list_modules(&coach, &program.id).await.unwrap();
    let titles: Vec<&str> = listed.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Week 2", "Week 1"]);
}

#[tokio::test]
async fn test_reorder_rejects_foreign_and_partial_ids() {
    let ctx = setup().await;
    let coach = ctx.user("coach", Role::Instructor).await;
    let program = ctx.program(&coach, "Strength 101").await;
    let other = ctx.program(&coach, "Mobility").await;
    let content = &ctx.state.content_service;

    let a = ctx.module(&coach, &program.id, "A", true).await;
    let b = ctx.module(&coach, &program.id, "B", true).await;
    let foreign = ctx.module(&coach, &other.id, "Elsewhere", true).await;

    let err = content
        .reorder_modules(&coach, &program.id, vec![b.id.clone(), foreign.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = content
        .reorder_modules(&coach, &program.id, vec![b.id.clone()])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    // Nothing moved.
    let listed = content.list_modules(&coach, &program.id).await.unwrap();
    assert_eq!(listed[0].id, a.id);
    assert_eq!(listed[1].id, b.id);
    let untouched = ProgramModules::find_by_id(&foreign.id)
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.order_index, 0);
}

#[tokio::test]
async fn test_explicit_order_index_shifts_siblings() {
    let ctx = setup().await;
    let coach = ctx.user("coach", Role::Instructor).await;
    let program = ctx.program(&coach, "Strength 101").await;
    let content = &ctx.state.content_service;

    let a = ctx.module(&coach, &program.id, "A", true).await;
    let b = ctx.module(&coach, &program.id, "B", true).await;
    let intro = content
        .create_module(
            &coach,
            &program.id,
            CreateModuleRequest {
                title: "Intro".to_string(),
                description: None,
                order_index: Some(0),
                is_published: Some(true),
            },
        )
        .await
        .unwrap();
    assert_eq!(intro.order_index, 0);

    let listed = content.list_modules(&coach, &program.id).await.unwrap();
    let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec![intro.id.as_str(), a.id.as_str(), b.id.as_str()]);
    let indices: Vec<i32> = listed.iter().map(|m| m.order_index).collect();
    assert_eq!(indices, vec![0, 1, 2]);

    // Out-of-range targets clamp to the end.
    content
        .update_module(
            &coach,
            &intro.id,
            UpdateModuleRequest {
                order_index: Some(99),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let listed = content.list_modules(&coach, &program.id).await.unwrap();
    assert_eq!(listed[2].id, intro.id);
    assert_eq!(listed[2].order_index, 2);
}

#[tokio::test]
async fn test_delete_module_cascades_and_compacts() {
    let ctx = setup().await;
    let (coach, learner, program, week1) = ctx.enrolled_program().await;
    let content = &ctx.state.content_service;
    let week2 = ctx.module(&coach, &program.id, "Week 2", true).await;
    let week3 = ctx.module(&coach, &program.id, "Week 3", true).await;

    let lesson = ctx.lesson(&coach, &week1.id, "Squats", true).await;
    let resource = content
        .create_resource(
            &coach,
            &lesson.id,
            ResourceForm {
                title: Some("Squat form".to_string()),
                file: Some(UploadedFile {
                    filename: "squat.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    data: Bytes::from_static(b"%PDF-1.4 squat"),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(ctx.storage.len(), 1);
    ctx.state
        .progress_service
        .mark_lesson_complete(&learner, &lesson.id, Some(60))
        .await
        .unwrap();

    content.delete_module(&coach, &week1.id).await.unwrap();

    assert!(Lessons::find_by_id(&lesson.id).one(&ctx.db).await.unwrap().is_none());
    assert!(
        LessonResources::find_by_id(&resource.id)
            .one(&ctx.db)
            .await
            .unwrap()
            .is_none()
    );
    let progress_rows = LessonProgress::find()
        .filter(lesson_progress::Column::LessonId.eq(&lesson.id))
        .count(&ctx.db)
        .await
        .unwrap();
    assert_eq!(progress_rows, 0);
    assert_eq!(ctx.storage.len(), 0);

    let listed = content.list_modules(&coach, &program.id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!((listed[0].id.as_str(), listed[0].order_index), (week2.id.as_str(), 0));
    assert_eq!((listed[1].id.as_str(), listed[1].order_index), (week3.id.as_str(), 1));

    // The rollup follows the structure it was computed from.
    let progress = ctx
        .state
        .progress_service
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(progress.total_lessons, 0);
    assert_eq!(progress.completed_lessons, 0);
}

#[tokio::test]
async fn test_lessons_reorder_and_unpublished_hidden_from_learners() {
    let ctx = setup().await;
    let (coach, learner, _program, module) = ctx.enrolled_program().await;
    let content = &ctx.state.content_service;

    let l1 = ctx.lesson(&coach, &module.id, "Warm-up", true).await;
    let l2 = ctx.lesson(&coach, &module.id, "Main set", true).await;
    let draft = ctx.lesson(&coach, &module.id, "Draft", false).await;

    let reordered = content
        .reorder_lessons(
            &coach,
            &module.id,
            vec![draft.id.clone(), l2.id.clone(), l1.id.clone()],
        )
        .await
        .unwrap();
    let ids: Vec<&str> = reordered.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec![draft.id.as_str(), l2.id.as_str(), l1.id.as_str()]);

    let seen = content.list_lessons(&learner, &module.id).await.unwrap();
    let ids: Vec<&str> = seen.iter().map(|l| l.id.as_str()).collect();
    assert_eq!(ids, vec![l2.id.as_str(), l1.id.as_str()]);

    let err = content.get_lesson(&learner, &draft.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert!(content.get_lesson(&coach, &draft.id).await.is_ok());
}

#[tokio::test]
async fn test_resource_file_overrides_metadata_and_replacement_discards_old() {
    let ctx = setup().await;
    let (coach, _learner, _program, module) = ctx.enrolled_program().await;
    let content = &ctx.state.content_service;
    let lesson = ctx.lesson(&coach, &module.id, "Deadlifts", true).await;

    let created = content
        .create_resource(
            &coach,
            &lesson.id,
            ResourceForm {
                title: Some("Program sheet".to_string()),
                file_url: Some("https://example.com/ignored.pdf".to_string()),
                file_type: Some("text/plain".to_string()),
                file_size_bytes: Some(1),
                file: Some(UploadedFile {
                    filename: "sheet.pdf".to_string(),
                    content_type: Some("application/pdf".to_string()),
                    data: Bytes::from_static(b"%PDF-1.4 sheet"),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let file_url = created.file_url.clone().unwrap();
    assert!(file_url.starts_with(&format!("http://cdn.test/resources/{}/", lesson.id)));
    assert!(file_url.ends_with("-sheet.pdf"));
    assert_eq!(created.file_type.as_deref(), Some("application/pdf"));
    assert_eq!(created.file_size_bytes, Some(14));
    let first_key = file_url.trim_start_matches("http://cdn.test/").to_string();
    assert!(ctx.storage.contains(&first_key));

    let updated = content
        .update_resource(
            &coach,
            &created.id,
            ResourceForm {
                file: Some(UploadedFile {
                    filename: "sheet-v2.pdf".to_string(),
                    content_type: None,
                    data: Bytes::from_static(b"%PDF-1.4 second version"),
                }),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Program sheet");
    assert!(!ctx.storage.contains(&first_key));
    assert_eq!(ctx.storage.len(), 1);

    let link = content
        .create_resource(
            &coach,
            &lesson.id,
            ResourceForm {
                title: Some("Video guide".to_string()),
                file_url: Some("https://example.com/guide".to_string()),
                file_type: Some("link".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(link.order_index, 1);
    assert_eq!(link.file_url.as_deref(), Some("https://example.com/guide"));

    content.delete_resource(&coach, &created.id).await.unwrap();
    assert_eq!(ctx.storage.len(), 0);
    let remaining = content.list_resources(&coach, &lesson.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].order_index, 0);
}

#[tokio::test]
async fn test_oversized_upload_rejected() {
    let ctx = setup().await;
    let (coach, _learner, _program, module) = ctx.enrolled_program().await;
    let lesson = ctx.lesson(&coach, &module.id, "Cardio", true).await;

    let err = ctx
        .state
        .content_service
        .upload_lesson_video(
            &coach,
            &lesson.id,
            UploadedFile {
                filename: "huge.mp4".to_string(),
                content_type: Some("video/mp4".to_string()),
                data: Bytes::from(vec![0u8; 2 * 1024 * 1024]),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PayloadTooLarge(_)));
    assert_eq!(ctx.storage.len(), 0);
}

#[tokio::test]
async fn test_learning_content_merges_resources_and_flags_completion() {
    let ctx = setup().await;
    let (coach, learner, program, week1) = ctx.enrolled_program().await;
    let content = &ctx.state.content_service;
    let draft_module = ctx.module(&coach, &program.id, "Week 2 (draft)", false).await;
    ctx.lesson(&coach, &draft_module.id, "Hidden", true).await;

    let l1 = ctx.lesson(&coach, &week1.id, "Push-ups", true).await;
    let l2 = ctx.lesson(&coach, &week1.id, "Pull-ups", true).await;
    ctx.lesson(&coach, &week1.id, "Unfinished", false).await;
    for title in ["Checklist", "Video"] {
        content
            .create_resource(
                &coach,
                &l2.id,
                ResourceForm {
                    title: Some(title.to_string()),
                    file_url: Some(format!("https://example.com/{}", title)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }
    ctx.state
        .progress_service
        .mark_lesson_complete(&learner, &l1.id, None)
        .await
        .unwrap();

    let view = content
        .get_program_learning_content(&learner, &program.id)
        .await
        .unwrap();
    assert!(!view.can_manage);
    assert_eq!(view.modules.len(), 1);
    let lessons = &view.modules[0].lessons;
    assert_eq!(lessons.len(), 2);
    assert_eq!(lessons[0].lesson.id, l1.id);
    assert_eq!(lessons[0].is_completed, Some(true));
    assert_eq!(lessons[1].is_completed, Some(false));
    let titles: Vec<&str> = lessons[1].resources.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Checklist", "Video"]);
    let progress = view.progress.unwrap();
    assert_eq!(progress.total_lessons, 2);
    assert_eq!(progress.completed_lessons, 1);

    let managed = content
        .get_program_learning_content(&coach, &program.id)
        .await
        .unwrap();
    assert!(managed.can_manage);
    assert_eq!(managed.modules.len(), 2);
    assert_eq!(managed.modules[0].lessons.len(), 3);
    assert!(managed.progress.is_none());
    assert_eq!(managed.modules[0].lessons[0].is_completed, None);
}

#[tokio::test]
async fn test_outline_shows_preview_lessons_only() {
    let ctx = setup().await;
    let coach = ctx.user("coach", Role::Instructor).await;
    let visitor = ctx.user("visitor", Role::Learner).await;
    let program = ctx.program(&coach, "Strength 101").await;
    let module = ctx.module(&coach, &program.id, "Week 1", true).await;
    let free = ctx.lesson(&coach, &module.id, "Free intro", true).await;
    ctx.lesson(&coach, &module.id, "Paid set", true).await;
    ctx.state
        .content_service
        .update_lesson(
            &coach,
            &free.id,
            UpdateLessonRequest {
                is_preview: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let outline = ctx
        .state
        .content_service
        .get_program_outline(&visitor, &program.id)
        .await
        .unwrap();
    assert_eq!(outline.total_lessons, 2);
    assert_eq!(outline.total_duration_minutes, 20);
    let lessons = &outline.modules[0].lessons;
    assert!(lessons[0].is_preview);
    assert_eq!(
        lessons[0].preview.as_ref().unwrap().lesson.content.as_deref(),
        Some("Free intro body")
    );
    assert!(lessons[1].preview.is_none());
}

#[tokio::test]
async fn test_non_owner_cannot_manage_content() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let rival = ctx.user("rival", Role::Instructor).await;
    let admin = ctx.user("admin", Role::Admin).await;
    let content = &ctx.state.content_service;
    let lesson = ctx.lesson(&coach, &module.id, "Squats", true).await;

    let req = || CreateModuleRequest {
        title: "Sneaky".to_string(),
        description: None,
        order_index: None,
        is_published: None,
    };
    for caller in [&rival, &learner] {
        let err = content
            .create_module(caller, &program.id, req())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = content.delete_lesson(caller, &lesson.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    assert!(content.create_module(&admin, &program.id, req()).await.is_ok());

    let err = content
        .create_module(&coach, "missing-program", req())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
