//! Runs the client-proxy flow from this machine: the generation endpoint is
//! called with the local network, and the cleaned summary is posted back to
//! the reporter server.

use chrono::Local;
use clap::Parser;
use daily_reporter::csrf;
use daily_reporter::gemini::{GeminiClient, DEFAULT_ENDPOINT};
use daily_reporter::models::ExtractResponse;
use daily_reporter::proxy::{BannerKind, ClientProxy, ProxyEvent, ProxyOutcome, ProxyView};
use reqwest::header::SET_COOKIE;
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "report_proxy", about = "Generate and send a daily report through the client proxy")]
struct Args {
    /// Reporter server origin
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Report date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    date: Option<String>,

    /// Base URL of the generation API
    #[arg(long, default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Use a saved `client-proxy-data` JSON document instead of asking the server
    #[arg(long)]
    payload_file: Option<PathBuf>,

    /// Print the summary without sending it
    #[arg(long)]
    no_send: bool,
}

struct TerminalView;

impl ProxyView for TerminalView {
    fn apply(&mut self, event: ProxyEvent) {
        match event {
            ProxyEvent::LoadingShown => info!("processing..."),
            ProxyEvent::SendingShown => info!("sending report..."),
            ProxyEvent::ContentDisplayed(content) => println!("{}", content.replace("<br>", "\n")),
            ProxyEvent::ErrorShown(message) => error!("{message}"),
            ProxyEvent::Banner { kind: BannerKind::Success, message } => info!("{message}"),
            ProxyEvent::Banner { kind: BannerKind::Error, message } => error!("{message}"),
            ProxyEvent::LoadingHidden | ProxyEvent::SendingHidden | ProxyEvent::TriggerEnabled(_) => {}
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let server = args.server.trim_end_matches('/').to_string();
    let date = args
        .date
        .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string());
    let http = reqwest::Client::new();
    let proxy = ClientProxy::new(GeminiClient::new(&args.endpoint), &server);
    let mut view = TerminalView;

    let response = http.get(format!("{server}/")).send().await?.error_for_status()?;
    let token = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| csrf::cookie_value(value, csrf::COOKIE_NAME));
    if token.is_none() {
        warn!("server did not hand out a CSRF token");
    }

    let outcome = match &args.payload_file {
        Some(path) => {
            let embedded = tokio::fs::read_to_string(path).await?;
            match proxy.trigger(&embedded, &mut view).await {
                Some(outcome) => outcome,
                None => return Ok(false),
            }
        }
        None => {
            let extract: ExtractResponse = http
                .get(format!("{server}/reporter/extract/"))
                .query(&[("date", date.as_str())])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            match extract {
                ExtractResponse::ClientProxy { payload, .. } => proxy.process(&payload, &mut view).await,
                ExtractResponse::Server {
                    processed_content,
                    error: Some(message),
                    ..
                } => {
                    view.apply(ProxyEvent::ErrorShown(message.clone()));
                    view.apply(ProxyEvent::ContentDisplayed(processed_content));
                    ProxyOutcome::Failed(message)
                }
                ExtractResponse::Server { processed_content, .. } => {
                    view.apply(ProxyEvent::ContentDisplayed(processed_content.clone()));
                    ProxyOutcome::Processed(processed_content)
                }
            }
        }
    };

    let ProxyOutcome::Processed(content) = outcome else {
        return Ok(false);
    };
    if args.no_send {
        return Ok(true);
    }

    let sent = proxy.submit(&content, &date, token.as_deref(), &mut view).await;
    Ok(sent.success)
}
