pub mod health;
pub mod learning_content;
pub mod lessons;
pub mod modules;
pub mod programs;
pub mod progress;
pub mod resources;
mod uploads;
