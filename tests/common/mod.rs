#![allow(dead_code)]

use async_trait::async_trait;
use fitlearn_backend::AppState;
use fitlearn_backend::config::AppConfig;
use fitlearn_backend::infrastructure::{database, seed};
use fitlearn_backend::models::{Caller, Role};
use fitlearn_backend::services::content_service::types::{
    CreateLessonRequest, CreateModuleRequest, LessonView, ModuleView,
};
use fitlearn_backend::services::notifier::Notifier;
use fitlearn_backend::services::program_service::{CreateProgramRequest, ProgramView};
use fitlearn_backend::services::storage::StorageService;
use fitlearn_backend::utils::auth::create_jwt;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub struct MockStorageService {
    pub files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            files: Mutex::new(HashMap::new()),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn upload_file(&self, key: &str, data: Vec<u8>, _content_type: &str) -> anyhow::Result<()> {
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> anyhow::Result<()> {
        self.files.lock().unwrap().remove(key);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://cdn.test/{}", key)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub completed: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn program_completed(&self, user_id: &str, program_id: &str) -> anyhow::Result<()> {
        self.completed
            .lock()
            .unwrap()
            .push((user_id.to_string(), program_id.to_string()));
        Ok(())
    }
}

impl RecordingNotifier {
    /// Notifications are spawned; give them a moment to land.
    pub async fn wait_for(&self, count: usize) -> Vec<(String, String)> {
        for _ in 0..50 {
            if self.completed.lock().unwrap().len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.completed.lock().unwrap().clone()
    }
}

pub struct TestContext {
    pub db: DatabaseConnection,
    pub state: AppState,
    pub storage: Arc<MockStorageService>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn setup_test_db() -> DatabaseConnection {
    // One connection so every query sees the same in-memory database.
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.unwrap();
    database::run_migrations(&db).await.unwrap();
    db
}

pub async fn setup() -> TestContext {
    let db = setup_test_db().await;
    let storage = Arc::new(MockStorageService::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let config = AppConfig {
        jwt_secret: "test_secret".to_string(),
        max_upload_size: 1024 * 1024,
        ..AppConfig::default()
    };
    let state = AppState::new(db.clone(), storage.clone(), notifier.clone(), config);

    TestContext {
        db,
        state,
        storage,
        notifier,
    }
}

impl TestContext {
    pub async fn user(&self, username: &str, role: Role) -> Caller {
        let user = seed::ensure_user(&self.db, username, role).await.unwrap();
        Caller::new(user.id, role)
    }

    pub fn token(&self, caller: &Caller) -> String {
        create_jwt(
            &caller.user_id,
            &self.state.config.jwt_secret,
            chrono::Duration::hours(1),
        )
        .unwrap()
    }

    pub async fn program(&self, owner: &Caller, name: &str) -> ProgramView {
        self.state
            .program_service
            .create_program(
                owner,
                CreateProgramRequest {
                    name: name.to_string(),
                    description: Some("Strength basics".to_string()),
                    price: 49.0,
                    duration_weeks: 4,
                    difficulty: Some("BEGINNER".to_string()),
                    category: Some("Strength".to_string()),
                    location: None,
                },
            )
            .await
            .unwrap()
    }

    pub async fn module(&self, owner: &Caller, program_id: &str, title: &str, published: bool) -> ModuleView {
        self.state
            .content_service
            .create_module(
                owner,
                program_id,
                CreateModuleRequest {
                    title: title.to_string(),
                    description: None,
                    order_index: None,
                    is_published: Some(published),
                },
            )
            .await
            .unwrap()
    }

    pub async fn lesson(&self, owner: &Caller, module_id: &str, title: &str, published: bool) -> LessonView {
        self.state
            .content_service
            .create_lesson(
                owner,
                module_id,
                CreateLessonRequest {
                    title: title.to_string(),
                    description: None,
                    content: Some(format!("{} body", title)),
                    video_url: None,
                    duration_minutes: Some(10),
                    order_index: None,
                    is_published: Some(published),
                    is_preview: Some(false),
                },
            )
            .await
            .unwrap()
    }

    /// Instructor, enrolled learner and a program with one published module.
    pub async fn enrolled_program(&self) -> (Caller, Caller, ProgramView, ModuleView) {
        let instructor = self.user("coach", Role::Instructor).await;
        let learner = self.user("learner", Role::Learner).await;
        let program = self.program(&instructor, "Strength 101").await;
        let module = self.module(&instructor, &program.id, "Week 1", true).await;
        self.state
            .program_service
            .enroll(&learner, &program.id)
            .await
            .unwrap();
        (instructor, learner, program, module)
    }
}
