pub mod access;
pub mod audit;
pub mod content_service;
pub mod notifier;
pub mod program_service;
pub mod progress_service;
pub mod storage;
