pub use super::audit_logs::Entity as AuditLogs;
pub use super::enrollments::Entity as Enrollments;
pub use super::lesson_progress::Entity as LessonProgress;
pub use super::lesson_resources::Entity as LessonResources;
pub use super::lessons::Entity as Lessons;
pub use super::program_modules::Entity as ProgramModules;
pub use super::program_progress::Entity as ProgramProgress;
pub use super::programs::Entity as Programs;
pub use super::users::Entity as Users;
