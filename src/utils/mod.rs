pub mod auth;
pub mod keyed_mutex;
