use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Success,
    Failed,
    NoContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportLog {
    pub date: String,
    pub sent_at: String,
    pub status: ReportStatus,
    pub subject: String,
    pub content_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ReportLog {
    /// `YYYY-MM-DD` part of the send timestamp.
    pub fn sent_on(&self) -> &str {
        self.sent_at.get(..10).unwrap_or(&self.sent_at)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppData {
    /// Monthly plan text keyed by `YYYY-MM`.
    #[serde(default)]
    pub plans: BTreeMap<String, String>,
    #[serde(default)]
    pub reports: Vec<ReportLog>,
}

/// Everything the client needs to call the generation endpoint itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyPayload {
    #[serde(default)]
    pub use_client_proxy: bool,
    pub api_key: String,
    pub prompt: String,
    pub original_content: String,
    pub model: String,
    /// Day the content was taken from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
    /// Fall back to the nearest planned day when the date has no section.
    #[serde(default)]
    pub relative: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendReportRequest {
    pub processed_content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendReportResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CleanupResponse {
    pub processed_content: String,
}

#[derive(Debug, Deserialize)]
pub struct SliderRequest {
    pub value: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanRequest {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlanResponse {
    pub year: i32,
    pub month: u32,
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExtractResponse {
    ClientProxy {
        date: String,
        payload: ProxyPayload,
    },
    /// On a generation failure `processed_content` is the original text and
    /// `error` says why.
    Server {
        date: String,
        original_content: String,
        processed_content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}
