pub mod app;
pub mod cleanup;
pub mod config;
pub mod csrf;
pub mod errors;
pub mod gemini;
pub mod handlers;
pub mod models;
pub mod page;
pub mod plan;
pub mod prefs;
pub mod proxy;
pub mod state;
pub mod stats;
pub mod storage;
pub mod theme;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::load_data;
