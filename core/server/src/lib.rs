pub mod config;
pub mod routes;

pub use config::AppConfig;
pub use routes::{router, AppState};
