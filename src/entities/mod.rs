pub mod prelude;

pub mod audit_logs;
pub mod enrollments;
pub mod lesson_progress;
pub mod lesson_resources;
pub mod lessons;
pub mod program_modules;
pub mod program_progress;
pub mod programs;
pub mod users;
