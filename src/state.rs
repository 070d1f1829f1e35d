use crate::config::AppConfig;
use crate::gemini::{GeminiClient, GeminiError};
use crate::models::AppData;
use crate::prefs::FilePreferences;
use crate::theme::ThemeController;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub data: Arc<Mutex<AppData>>,
    pub theme: Arc<Mutex<ThemeController<FilePreferences>>>,
    pub gemini: GeminiClient,
}

impl AppState {
    pub fn new(config: AppConfig, data: AppData) -> Result<Self, GeminiError> {
        let gemini = GeminiClient::with_timeout(&config.gemini_endpoint, config.gemini_timeout)?;
        let prefs = FilePreferences::open(&config.prefs_path);
        debug!(prefs = %prefs.path().display(), endpoint = gemini.endpoint(), "application state ready");
        Ok(Self {
            config: Arc::new(config),
            data: Arc::new(Mutex::new(data)),
            theme: Arc::new(Mutex::new(ThemeController::new(prefs))),
            gemini,
        })
    }
}
