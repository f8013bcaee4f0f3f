mod common;

use common::setup;
use fitlearn_backend::api::error::AppError;
use fitlearn_backend::entities::{prelude::*, *};
use fitlearn_backend::models::Role;
use fitlearn_backend::services::content_service::types::UpdateLessonRequest;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn test_completing_every_lesson_reaches_100_percent() {
    let ctx = setup().await;
    let (coach, learner, program, week1) = ctx.enrolled_program().await;
    let week2 = ctx.module(&coach, &program.id, "Week 2", true).await;
    let lessons = vec![
        ctx.lesson(&coach, &week1.id, "Squats", true).await,
        ctx.lesson(&coach, &week1.id, "Lunges", true).await,
        ctx.lesson(&coach, &week2.id, "Deadlifts", true).await,
    ];
    let progress = &ctx.state.progress_service;

    for lesson in &lessons {
        let view = progress
            .mark_lesson_complete(&learner, &lesson.id, Some(120))
            .await
            .unwrap();
        assert!(view.is_completed);
        assert!(view.completed_at.is_some());
    }

    let detail = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(detail.total_lessons, 3);
    assert_eq!(detail.completed_lessons, 3);
    assert_eq!(detail.progress_percentage, 100.0);
    assert!(detail.is_completed);
    assert_eq!(detail.total_watch_time_seconds, 360);
    assert_eq!(detail.lessons.len(), 3);
    assert_eq!(detail.lessons[2].module_title, "Week 2");

    let rollup = ProgramProgress::find()
        .filter(program_progress::Column::UserId.eq(&learner.user_id))
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert!(rollup.is_completed);
    assert!(rollup.completed_at.is_some());

    let notices = ctx.notifier.wait_for(1).await;
    assert_eq!(notices, vec![(learner.user_id.clone(), program.id.clone())]);
}

#[tokio::test]
async fn test_marking_complete_twice_does_not_double_count() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let first = ctx.lesson(&coach, &module.id, "Squats", true).await;
    ctx.lesson(&coach, &module.id, "Lunges", true).await;
    let progress = &ctx.state.progress_service;

    let once = progress
        .mark_lesson_complete(&learner, &first.id, Some(30))
        .await
        .unwrap();
    let twice = progress
        .mark_lesson_complete(&learner, &first.id, Some(15))
        .await
        .unwrap();
    assert_eq!(once.completed_at, twice.completed_at);
    assert_eq!(twice.watch_time_seconds, 45);

    let detail = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(detail.completed_lessons, 1);
    assert_eq!(detail.progress_percentage, 50.0);

    let rows = LessonProgress::find()
        .filter(lesson_progress::Column::UserId.eq(&learner.user_id))
        .count(&ctx.db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_complete_then_incomplete_restores_rollup() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let done = ctx.lesson(&coach, &module.id, "Squats", true).await;
    let toggled = ctx.lesson(&coach, &module.id, "Lunges", true).await;
    ctx.lesson(&coach, &module.id, "Planks", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .mark_lesson_complete(&learner, &done.id, None)
        .await
        .unwrap();
    let before = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();

    progress
        .mark_lesson_complete(&learner, &toggled.id, None)
        .await
        .unwrap();
    let reopened = progress
        .mark_lesson_incomplete(&learner, &toggled.id)
        .await
        .unwrap();
    assert!(!reopened.is_completed);
    assert!(reopened.completed_at.is_none());
    assert!(reopened.last_watched_at.is_some());

    let after = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(after.completed_lessons, before.completed_lessons);
    assert_eq!(after.progress_percentage, before.progress_percentage);
    assert!(!progress.is_lesson_completed(&learner, &toggled.id).await.unwrap());
}

#[tokio::test]
async fn test_incomplete_on_untouched_lesson_creates_nothing() {
    let ctx = setup().await;
    let (coach, learner, _program, module) = ctx.enrolled_program().await;
    let lesson = ctx.lesson(&coach, &module.id, "Squats", true).await;

    let view = ctx
        .state
        .progress_service
        .mark_lesson_incomplete(&learner, &lesson.id)
        .await
        .unwrap();
    assert_eq!(view.lesson_id, lesson.id);
    assert!(!view.is_completed);
    assert_eq!(view.watch_time_seconds, 0);
    assert!(view.last_watched_at.is_none());

    let rows = LessonProgress::find().count(&ctx.db).await.unwrap();
    assert_eq!(rows, 0);
}

#[tokio::test]
async fn test_program_without_published_lessons_is_zero_percent() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    ctx.lesson(&coach, &module.id, "Draft", false).await;
    let progress = &ctx.state.progress_service;

    let initialized = progress
        .initialize_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(initialized.total_lessons, 0);
    assert_eq!(initialized.progress_percentage, 0.0);
    assert!(!initialized.is_completed);

    let detail = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(detail.progress_percentage, 0.0);
    assert!(!detail.is_completed);
    assert!(detail.lessons.is_empty());
}

#[tokio::test]
async fn test_watch_time_accumulates_per_lesson_and_program() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let squats = ctx.lesson(&coach, &module.id, "Squats", true).await;
    let lunges = ctx.lesson(&coach, &module.id, "Lunges", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .update_watch_time(&learner, &squats.id, 30)
        .await
        .unwrap();
    let view = progress
        .update_watch_time(&learner, &squats.id, 45)
        .await
        .unwrap();
    assert_eq!(view.watch_time_seconds, 75);
    assert!(!view.is_completed);

    progress
        .update_watch_time(&learner, &lunges.id, 25)
        .await
        .unwrap();

    let detail = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(detail.total_watch_time_seconds, 100);
    assert_eq!(detail.completed_lessons, 0);

    let all = progress.get_all_user_progress(&learner).await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].total_watch_time_seconds, 100);
    assert_eq!(all[0].program_name.as_deref(), Some("Strength 101"));

    let err = progress
        .update_watch_time(&learner, &squats.id, -5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_watch_time_overflow_is_rejected() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let squats = ctx.lesson(&coach, &module.id, "Squats", true).await;
    let lunges = ctx.lesson(&coach, &module.id, "Lunges", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .update_watch_time(&learner, &squats.id, i64::MAX)
        .await
        .unwrap();
    let err = progress
        .update_watch_time(&learner, &squats.id, 10)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = progress
        .mark_lesson_complete(&learner, &squats.id, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let view = progress
        .get_lesson_progress(&learner, &squats.id)
        .await
        .unwrap();
    assert_eq!(view.watch_time_seconds, i64::MAX);
    assert!(!view.is_completed);

    progress
        .update_watch_time(&learner, &lunges.id, 60)
        .await
        .unwrap();
    let detail = progress
        .get_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(detail.total_watch_time_seconds, i64::MAX);

    let stats = progress.get_user_progress_stats(&learner).await.unwrap();
    assert_eq!(stats.total_watch_time_hours, i64::MAX / 3600);
}

#[tokio::test]
async fn test_unpublishing_a_lesson_refreshes_rollups() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let a = ctx.lesson(&coach, &module.id, "A", true).await;
    let b = ctx.lesson(&coach, &module.id, "B", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .mark_lesson_complete(&learner, &a.id, None)
        .await
        .unwrap();
    let all = progress.get_all_user_progress(&learner).await.unwrap();
    assert_eq!(all[0].progress_percentage, 50.0);

    ctx.state
        .content_service
        .update_lesson(
            &coach,
            &b.id,
            UpdateLessonRequest {
                is_published: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let all = progress.get_all_user_progress(&learner).await.unwrap();
    assert_eq!(all[0].total_lessons, 1);
    assert_eq!(all[0].completed_lessons, 1);
    assert!(all[0].is_completed);
    let notices = ctx.notifier.wait_for(1).await;
    assert_eq!(notices, vec![(learner.user_id.clone(), program.id.clone())]);
}

#[tokio::test]
async fn test_deleting_unfinished_module_completes_program_after_commit() {
    let ctx = setup().await;
    let (coach, learner, program, week1) = ctx.enrolled_program().await;
    let done = ctx.lesson(&coach, &week1.id, "Done", true).await;
    let week2 = ctx.module(&coach, &program.id, "Week 2", true).await;
    ctx.lesson(&coach, &week2.id, "Pending", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .mark_lesson_complete(&learner, &done.id, None)
        .await
        .unwrap();
    assert!(ctx.notifier.wait_for(1).await.is_empty());

    ctx.state
        .content_service
        .delete_module(&coach, &week2.id)
        .await
        .unwrap();

    let notices = ctx.notifier.wait_for(1).await;
    assert_eq!(notices, vec![(learner.user_id.clone(), program.id.clone())]);

    let stored = ProgramProgress::find()
        .filter(program_progress::Column::UserId.eq(&learner.user_id))
        .filter(program_progress::Column::ProgramId.eq(&program.id))
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_completed);
    assert_eq!(stored.total_lessons, 1);

    // A failed structural change announces nothing further.
    let err = ctx
        .state
        .content_service
        .delete_module(&coach, &week2.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    assert_eq!(ctx.notifier.wait_for(2).await.len(), 1);
}

#[tokio::test]
async fn test_progress_locks_are_released_after_writes() {
    let ctx = setup().await;
    let (coach, learner, program, module) = ctx.enrolled_program().await;
    let squats = ctx.lesson(&coach, &module.id, "Squats", true).await;
    let progress = &ctx.state.progress_service;

    progress
        .mark_lesson_complete(&learner, &squats.id, Some(30))
        .await
        .unwrap();
    progress
        .update_watch_time(&learner, &squats.id, 15)
        .await
        .unwrap();
    progress
        .initialize_program_progress(&learner, &program.id)
        .await
        .unwrap();
    assert_eq!(progress.lock_count(), 0);

    // Rejected writes release their lock too.
    progress
        .update_watch_time(&learner, &squats.id, i64::MAX)
        .await
        .unwrap_err();
    assert_eq!(progress.lock_count(), 0);
}

#[tokio::test]
async fn test_stats_across_programs() {
    let ctx = setup().await;
    let (coach, learner, first, module) = ctx.enrolled_program().await;
    let solo = ctx.lesson(&coach, &module.id, "Only lesson", true).await;

    let second = ctx.program(&coach, "Mobility").await;
    let second_module = ctx.module(&coach, &second.id, "Week 1", true).await;
    let stretch = ctx.lesson(&coach, &second_module.id, "Stretch", true).await;
    ctx.lesson(&coach, &second_module.id, "Breathe", true).await;
    ctx.state
        .program_service
        .enroll(&learner, &second.id)
        .await
        .unwrap();

    let progress = &ctx.state.progress_service;
    progress
        .mark_lesson_complete(&learner, &solo.id, Some(3600))
        .await
        .unwrap();
    progress
        .mark_lesson_complete(&learner, &stretch.id, Some(1800))
        .await
        .unwrap();

    let stats = progress.get_user_progress_stats(&learner).await.unwrap();
    assert_eq!(stats.total_programs_enrolled, 2);
    assert_eq!(stats.completed_programs, 1);
    assert_eq!(stats.in_progress_programs, 1);
    assert_eq!(stats.total_lessons_completed, 2);
    assert_eq!(stats.average_progress_percentage, 75.0);
    assert_eq!(stats.total_watch_time_hours, 1);

    let detail = progress.get_program_progress(&learner, &first.id).await.unwrap();
    assert!(detail.is_completed);
}

#[tokio::test]
async fn test_instructor_does_not_enroll() {
    let ctx = setup().await;
    let (coach, _learner, program, _module) = ctx.enrolled_program().await;
    let other = ctx.user("other-coach", Role::Instructor).await;

    for caller in [&coach, &other] {
        let err = ctx
            .state
            .program_service
            .enroll(caller, &program.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
