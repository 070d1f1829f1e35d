use crate::cleanup;
use crate::csrf;
use crate::errors::AppError;
use crate::models::{
    CleanupRequest, CleanupResponse, DateQuery, ExtractResponse, PlanRequest, PlanResponse,
    ProxyPayload, ReportLog, ReportStatus, SendReportRequest, SendReportResponse, SliderRequest,
};
use crate::page::PROXY_DATA_ID;
use crate::plan::{
    build_prompt, content_preview, extract_content_for_date, plan_for_date, relative_date_content,
    report_subject,
};
use crate::state::AppState;
use crate::stats::{build_dashboard, render_stats, StatsView};
use crate::storage::persist_data;
use crate::theme::{ImageUpload, ThemeError, ThemeUpdate, MAX_BACKGROUND_BYTES};
use crate::ui::render_index;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate, Utc};
use tracing::{debug, error, info, warn};

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut page = {
        let data = state.data.lock().await;
        build_dashboard(&data, state.config.register_date.as_deref())
    };

    if state.config.use_client_proxy {
        let today = Local::now().date_naive();
        if let (Ok((content, day)), Some(api_key)) = (
            find_content(&state, today, false).await,
            state.config.gemini_api_key.clone(),
        ) {
            match serde_json::to_string(&client_payload(&state, api_key, content, day)) {
                Ok(json) => {
                    page.set_text(PROXY_DATA_ID, json);
                }
                Err(err) => warn!("failed to encode client proxy data: {err}"),
            }
        }
    }

    let prefs = state.theme.lock().await.preferences();
    let view = render_stats(&page, Utc::now());

    with_csrf_cookie(&headers, Html(render_index(&page, &prefs, &view)))
}

pub async fn get_stats(State(state): State<AppState>) -> Json<StatsView> {
    let data = state.data.lock().await;
    let page = build_dashboard(&data, state.config.register_date.as_deref());
    Json(render_stats(&page, Utc::now()))
}

pub async fn get_theme(State(state): State<AppState>) -> Json<ThemeUpdate> {
    let mut theme = state.theme.lock().await;
    Json(theme.init())
}

pub async fn set_opacity(
    State(state): State<AppState>,
    Json(payload): Json<SliderRequest>,
) -> Result<Json<ThemeUpdate>, AppError> {
    if payload.value > 100 {
        return Err(AppError::bad_request("opacity must be between 0 and 100"));
    }
    let mut theme = state.theme.lock().await;
    Ok(Json(theme.set_opacity(payload.value)))
}

pub async fn set_blur(
    State(state): State<AppState>,
    Json(payload): Json<SliderRequest>,
) -> Json<ThemeUpdate> {
    let mut theme = state.theme.lock().await;
    Json(theme.set_blur(payload.value))
}

pub async fn upload_background(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ThemeUpdate>, AppError> {
    let body = body.map_err(|rejection| upload_rejection(&headers, rejection))?;
    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    let upload = ImageUpload::new(mime, body.to_vec());

    let mut theme = state.theme.lock().await;
    let update = theme.upload_background(&upload).inspect_err(|err| {
        warn!("background upload rejected: {err}");
    })?;
    Ok(Json(update))
}

pub async fn reset_theme(State(state): State<AppState>) -> Json<ThemeUpdate> {
    let mut theme = state.theme.lock().await;
    Json(theme.reset())
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
) -> Result<Json<PlanResponse>, AppError> {
    let key = plan_key(year, month)?;
    let data = state.data.lock().await;
    let content = data
        .plans
        .get(&key)
        .cloned()
        .ok_or_else(|| AppError::not_found(format!("no plan for {key}")))?;
    Ok(Json(PlanResponse { year, month, content }))
}

pub async fn put_plan(
    State(state): State<AppState>,
    Path((year, month)): Path<(i32, u32)>,
    Json(payload): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    let key = plan_key(year, month)?;
    let mut data = state.data.lock().await;
    data.plans.insert(key.clone(), payload.content.clone());
    persist_data(&state.config.data_path, &data).await?;

    info!("saved plan {key}");
    Ok(Json(PlanResponse {
        year,
        month,
        content: payload.content,
    }))
}

/// Day content from the monthly plan, either handed to the client for
/// processing or processed here.
pub async fn extract(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
) -> Result<Response, AppError> {
    let date = parse_date(query.date.as_deref())?;

    let (original_content, date_str) = match find_content(&state, date, query.relative).await {
        Ok(found) => found,
        Err(message) => {
            log_failure(&state, date, ReportStatus::Failed, "", &message).await;
            return Err(AppError::not_found(message));
        }
    };
    let Some(api_key) = state.config.gemini_api_key.clone() else {
        let message = "Gemini API key is not configured";
        log_failure(&state, date, ReportStatus::Failed, &original_content, message).await;
        return Err(AppError::bad_request(message));
    };

    let response = if state.config.use_client_proxy {
        info!("preparing client proxy payload for {date_str}");
        ExtractResponse::ClientProxy {
            payload: client_payload(&state, api_key, original_content, date_str.clone()),
            date: date_str,
        }
    } else {
        let prompt = build_prompt(&original_content);
        match state
            .gemini
            .generate(&api_key, &state.config.gemini_model, &prompt)
            .await
        {
            Ok(text) => ExtractResponse::Server {
                date: date_str,
                processed_content: cleanup::clean(&text),
                original_content,
                error: None,
            },
            Err(err) => {
                error!(endpoint = state.gemini.endpoint(), "server-side generation failed: {err}");
                let message = format!("generation failed: {err}");
                log_failure(&state, date, ReportStatus::Failed, &original_content, &message).await;
                ExtractResponse::Server {
                    date: date_str,
                    processed_content: original_content.clone(),
                    original_content,
                    error: Some(message),
                }
            }
        }
    };

    Ok(with_csrf_cookie(&headers, Json(response)))
}

pub async fn clean_text(Json(payload): Json<CleanupRequest>) -> Json<CleanupResponse> {
    Json(CleanupResponse {
        processed_content: cleanup::clean(&payload.text),
    })
}

pub async fn send_report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DateQuery>,
    Json(payload): Json<SendReportRequest>,
) -> Result<Json<SendReportResponse>, AppError> {
    let cookies = headers.get(header::COOKIE).and_then(|value| value.to_str().ok());
    let token = headers.get(csrf::HEADER_NAME).and_then(|value| value.to_str().ok());
    if !csrf::verify(cookies, token) {
        warn!("rejected report submission with bad CSRF token");
        return Err(AppError::forbidden("CSRF verification failed"));
    }

    let date = parse_date(query.date.as_deref())?;
    let content = payload.processed_content.trim();
    let status = if content.is_empty() {
        ReportStatus::NoContent
    } else {
        ReportStatus::Success
    };

    let error_message = (status == ReportStatus::NoContent).then(|| "no content to send".to_string());
    record_report(&state, date, status, content, error_message).await?;

    let response = match status {
        ReportStatus::Success => SendReportResponse {
            success: true,
            message: format!("report for {date} sent"),
        },
        _ => SendReportResponse {
            success: false,
            message: "no content to send".to_string(),
        },
    };
    Ok(Json(response))
}

pub async fn get_reports(State(state): State<AppState>) -> Json<Vec<ReportLog>> {
    let data = state.data.lock().await;
    Json(data.reports.iter().rev().cloned().collect())
}

/// Plan content for `date` and the day it came from. With `relative`, the
/// nearest planned day is used, reaching back to earlier months if needed.
async fn find_content(
    state: &AppState,
    date: NaiveDate,
    relative: bool,
) -> Result<(String, String), String> {
    let requested = date.format("%Y-%m-%d").to_string();
    let data = state.data.lock().await;
    let Some((month, plan)) = plan_for_date(&data.plans, date, relative) else {
        return Err(format!("no plan for {}", date.format("%Y-%m")));
    };

    let found = if relative {
        relative_date_content(plan, date)
    } else {
        extract_content_for_date(plan, date).map(|content| (content, requested.clone()))
    };
    match found {
        Some((content, day)) => {
            if day != requested {
                info!(plan = month, "no section for {requested}, using {day}");
            }
            Ok((content, day))
        }
        None => Err(format!("no plan content for {requested}")),
    }
}

async fn record_report(
    state: &AppState,
    date: NaiveDate,
    status: ReportStatus,
    content: &str,
    error_message: Option<String>,
) -> Result<(), AppError> {
    let log = ReportLog {
        date: date.format("%Y-%m-%d").to_string(),
        sent_at: Local::now().to_rfc3339(),
        status,
        subject: report_subject(&state.config.user_name, date),
        content_preview: content_preview(content),
        error_message,
    };
    info!(subject = %log.subject, ?status, "recording report");

    let mut data = state.data.lock().await;
    data.reports.push(log);
    persist_data(&state.config.data_path, &data).await
}

async fn log_failure(state: &AppState, date: NaiveDate, status: ReportStatus, content: &str, message: &str) {
    warn!(%date, "report not produced: {message}");
    if let Err(err) = record_report(state, date, status, content, Some(message.to_string())).await {
        error!("failed to record report failure: {}", err.message);
    }
}

fn client_payload(
    state: &AppState,
    api_key: String,
    original_content: String,
    date: String,
) -> ProxyPayload {
    ProxyPayload {
        use_client_proxy: true,
        api_key,
        prompt: build_prompt(&original_content),
        original_content,
        model: state.config.gemini_model.clone(),
        date: Some(date),
    }
}

/// Bodies over the route limit never reach the theme controller; report
/// them the same way as an oversize image.
fn upload_rejection(headers: &HeaderMap, rejection: BytesRejection) -> AppError {
    let status = rejection.status();
    if status != StatusCode::PAYLOAD_TOO_LARGE {
        return AppError {
            status,
            message: rejection.body_text(),
        };
    }
    let size = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(MAX_BACKGROUND_BYTES + 1);
    debug!(size, "background upload over the body limit");
    AppError::from(ThemeError::TooLarge { size })
}

fn with_csrf_cookie(headers: &HeaderMap, body: impl IntoResponse) -> Response {
    let has_token = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(|cookies| csrf::cookie_value(cookies, csrf::COOKIE_NAME))
        .is_some_and(|token| !token.is_empty());
    if has_token {
        return body.into_response();
    }

    let cookie = csrf::set_cookie_header(&csrf::generate_token());
    ([(header::SET_COOKIE, cookie)], body).into_response()
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate, AppError> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| AppError::bad_request(format!("invalid date '{value}', expected YYYY-MM-DD"))),
        None => Ok(Local::now().date_naive()),
    }
}

fn plan_key(year: i32, month: u32) -> Result<String, AppError> {
    if !(2000..=2100).contains(&year) || !(1..=12).contains(&month) {
        return Err(AppError::bad_request("year must be 2000-2100 and month 1-12"));
    }
    Ok(format!("{year:04}-{month:02}"))
}
