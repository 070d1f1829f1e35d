use crate::gemini::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
use std::{env, path::PathBuf, time::Duration};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub data_path: PathBuf,
    pub prefs_path: PathBuf,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_endpoint: String,
    pub gemini_timeout: Duration,
    pub use_client_proxy: bool,
    pub register_date: Option<String>,
    pub user_name: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_path: PathBuf::from("data/state.json"),
            prefs_path: PathBuf::from("data/preferences.json"),
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_endpoint: DEFAULT_ENDPOINT.to_string(),
            gemini_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            use_client_proxy: true,
            register_date: None,
            user_name: "学习报告".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads the process environment; a `.env` file is loaded first when present.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|value| value.trim().to_string()).filter(|value| !value.is_empty());

        Self {
            port: get("PORT")
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(defaults.port),
            data_path: get("APP_DATA_PATH").map(PathBuf::from).unwrap_or(defaults.data_path),
            prefs_path: get("APP_PREFS_PATH").map(PathBuf::from).unwrap_or(defaults.prefs_path),
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_endpoint: get("GEMINI_ENDPOINT").unwrap_or(defaults.gemini_endpoint),
            gemini_timeout: get("GEMINI_TIMEOUT")
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.gemini_timeout),
            use_client_proxy: get("USE_CLIENT_PROXY")
                .map(|value| parse_flag(&value))
                .unwrap_or(defaults.use_client_proxy),
            register_date: get("REGISTER_DATE"),
            user_name: get("REPORT_USER_NAME").unwrap_or(defaults.user_name),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_environment_uses_defaults() {
        let config = AppConfig::from_lookup(|_| None);
        assert_eq!(config.port, 8080);
        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert!(config.use_client_proxy);
        assert_eq!(config.gemini_timeout, Duration::from_secs(15));
    }

    #[test]
    fn values_override_defaults() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("PORT", "9090"),
            ("USE_CLIENT_PROXY", "off"),
            ("GEMINI_TIMEOUT", "30"),
            ("GEMINI_API_KEY", "  "),
            ("REGISTER_DATE", "2025-09-01"),
        ]);
        let config = AppConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()));
        assert_eq!(config.port, 9090);
        assert!(!config.use_client_proxy);
        assert_eq!(config.gemini_timeout, Duration::from_secs(30));
        assert_eq!(config.gemini_api_key, None);
        assert_eq!(config.register_date.as_deref(), Some("2025-09-01"));
    }
}
