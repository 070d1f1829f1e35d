use crate::errors::AppError;
use crate::models::AppData;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error};

/// Loads plans and report history. A missing or corrupt file yields an empty store.
pub async fn load_data(path: &Path) -> AppData {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no data file yet");
            return AppData::default();
        }
        Err(err) => {
            error!(path = %path.display(), "failed to read data file: {err}");
            return AppData::default();
        }
    };

    serde_json::from_slice(&bytes).unwrap_or_else(|err| {
        error!(path = %path.display(), "failed to parse data file: {err}");
        AppData::default()
    })
}

/// Writes to a sibling temp file and renames it over `path`, so a crash
/// mid-write leaves the previous history intact.
pub async fn persist_data(path: &Path, data: &AppData) -> Result<(), AppError> {
    let payload = serde_json::to_vec_pretty(data).map_err(AppError::internal)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let staging = path.with_extension("json.tmp");
    fs::write(&staging, payload).await?;
    fs::rename(&staging, path).await?;
    debug!(path = %path.display(), reports = data.reports.len(), "persisted data");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReportLog, ReportStatus};

    fn temp_file(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("daily_reporter_storage_{}_{name}", std::process::id()))
            .join("state.json")
    }

    #[tokio::test]
    async fn persisted_history_loads_back() {
        let path = temp_file("roundtrip");
        let mut data = AppData::default();
        data.plans.insert("2026-03".into(), "<2026-03-02>读书</2026-03-02>".into());
        data.reports.push(ReportLog {
            date: "2026-03-02".into(),
            sent_at: "2026-03-02T21:00:00+08:00".into(),
            status: ReportStatus::Success,
            subject: "学习报告 2026-03-02 星期一 日报".into(),
            content_preview: "读书".into(),
            error_message: None,
        });

        persist_data(&path, &data).await.unwrap();
        let loaded = load_data(&path).await;

        assert_eq!(loaded.plans.len(), 1);
        assert_eq!(loaded.reports[0].sent_on(), "2026-03-02");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn corrupt_file_starts_empty() {
        let path = temp_file("corrupt");
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(&path, b"{not json").await.unwrap();

        let loaded = load_data(&path).await;
        assert!(loaded.plans.is_empty());
        assert!(loaded.reports.is_empty());
    }
}
