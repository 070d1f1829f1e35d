//! Client-side proxy for the generation endpoint.
//!
//! Used when the server is configured not to call the endpoint itself: the
//! client calls it with its own network, cleans the text and posts the
//! result back to the origin. Everything visible goes through [`ProxyView`].

use crate::cleanup;
use crate::csrf;
use crate::gemini::GeminiClient;
use crate::models::{ProxyPayload, SendReportRequest, SendReportResponse};
use tracing::{error, info};

pub const SEND_REPORT_PATH: &str = "/reporter/send-report/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyEvent {
    LoadingShown,
    LoadingHidden,
    ContentDisplayed(String),
    ErrorShown(String),
    SendingShown,
    SendingHidden,
    Banner { kind: BannerKind, message: String },
    TriggerEnabled(bool),
}

pub trait ProxyView {
    fn apply(&mut self, event: ProxyEvent);
}

/// Keeps every event; useful for headless clients and tests.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ProxyEvent>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content currently in the display region (last write wins).
    pub fn displayed(&self) -> Option<&str> {
        self.events.iter().rev().find_map(|event| match event {
            ProxyEvent::ContentDisplayed(content) => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProxyEvent::ErrorShown(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn banners(&self) -> Vec<(BannerKind, &str)> {
        self.events
            .iter()
            .filter_map(|event| match event {
                ProxyEvent::Banner { kind, message } => Some((*kind, message.as_str())),
                _ => None,
            })
            .collect()
    }
}

impl ProxyView for RecordingView {
    fn apply(&mut self, event: ProxyEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyOutcome {
    Processed(String),
    Failed(String),
}

impl ProxyPayload {
    pub fn from_embedded(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text.trim())
    }
}

#[derive(Debug, Clone)]
pub struct ClientProxy {
    gemini: GeminiClient,
    http: reqwest::Client,
    origin: String,
}

impl ClientProxy {
    pub fn new(gemini: GeminiClient, origin: impl Into<String>) -> Self {
        Self {
            gemini,
            http: reqwest::Client::new(),
            origin: origin.into().trim_end_matches('/').to_string(),
        }
    }

    /// Click handler: parse the embedded payload and process it when it
    /// asks for client-side calling.
    pub async fn trigger(&self, embedded: &str, view: &mut impl ProxyView) -> Option<ProxyOutcome> {
        let payload = match ProxyPayload::from_embedded(embedded) {
            Ok(payload) => payload,
            Err(err) => {
                error!("failed to parse client proxy data: {err}");
                view.apply(ProxyEvent::ErrorShown("failed to parse client proxy data".to_string()));
                return None;
            }
        };
        if !payload.use_client_proxy {
            error!("client proxy data is not enabled for client-side calls");
            view.apply(ProxyEvent::ErrorShown("invalid client proxy data".to_string()));
            return None;
        }
        Some(self.process(&payload, view).await)
    }

    /// Generates, cleans and displays the summary. On any failure the
    /// original content is displayed instead.
    pub async fn process(&self, payload: &ProxyPayload, view: &mut impl ProxyView) -> ProxyOutcome {
        view.apply(ProxyEvent::LoadingShown);
        info!(model = %payload.model, "calling generation endpoint from client");

        let outcome = match self
            .gemini
            .generate(&payload.api_key, &payload.model, &payload.prompt)
            .await
        {
            Ok(text) => {
                let cleaned = cleanup::clean(&text);
                view.apply(ProxyEvent::ContentDisplayed(cleaned.clone()));
                ProxyOutcome::Processed(cleaned)
            }
            Err(err) => {
                error!("client proxy processing failed: {err}");
                let message = format!("client proxy processing failed: {err}");
                view.apply(ProxyEvent::ErrorShown(message.clone()));
                view.apply(ProxyEvent::ContentDisplayed(payload.original_content.clone()));
                ProxyOutcome::Failed(message)
            }
        };

        view.apply(ProxyEvent::LoadingHidden);
        outcome
    }

    /// Posts the cleaned summary to the origin for `date`.
    pub async fn submit(
        &self,
        processed_content: &str,
        date: &str,
        csrf_token: Option<&str>,
        view: &mut impl ProxyView,
    ) -> SendReportResponse {
        view.apply(ProxyEvent::SendingShown);
        view.apply(ProxyEvent::TriggerEnabled(false));

        let result = self.post_report(processed_content, date, csrf_token).await;
        view.apply(ProxyEvent::SendingHidden);

        let response = match result {
            Ok(data) => {
                let kind = if data.success {
                    BannerKind::Success
                } else {
                    BannerKind::Error
                };
                view.apply(ProxyEvent::Banner {
                    kind,
                    message: data.message.clone(),
                });
                data
            }
            Err(err) => {
                error!("failed to send processed content: {err}");
                view.apply(ProxyEvent::Banner {
                    kind: BannerKind::Error,
                    message: "server did not respond while sending the report".to_string(),
                });
                SendReportResponse {
                    success: false,
                    message: format!("failed to send processed content: {err}"),
                }
            }
        };

        view.apply(ProxyEvent::TriggerEnabled(true));
        response
    }

    async fn post_report(
        &self,
        processed_content: &str,
        date: &str,
        csrf_token: Option<&str>,
    ) -> Result<SendReportResponse, reqwest::Error> {
        let mut request = self
            .http
            .post(format!("{}{SEND_REPORT_PATH}", self.origin))
            .query(&[("date", date)])
            .header("X-Requested-With", "XMLHttpRequest")
            .json(&SendReportRequest {
                processed_content: processed_content.to_string(),
            });
        if let Some(token) = csrf_token {
            request = request
                .header(csrf::HEADER_NAME, token)
                .header(reqwest::header::COOKIE, csrf::cookie_pair(token));
        }

        request.send().await?.json().await
    }
}
