use crate::models::{AppData, ReportStatus};
use crate::page::{
    PageData, CHART_DATA_ATTR, CHART_ID, COUNT_ATTR, MONTHLY_COUNT_ID, REGISTER_DATE_ATTR,
    REGISTRATION_ID, TOTAL_COUNT_ID,
};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;
const SERIES_LABEL: &str = "Reports sent";
const SERIES_COLOR: &str = "rgba(0, 120, 215, 1)";
const SERIES_FILL: &str = "rgba(0, 120, 215, 0.2)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub day: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsView {
    pub monthly_emails: u64,
    pub total_emails: u64,
    pub chart: Option<ChartConfig>,
    pub days_since_registration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub data: ChartData,
    pub options: ChartOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub label: &'static str,
    pub data: Vec<u64>,
    pub background_color: &'static str,
    pub border_color: &'static str,
    pub border_width: u32,
    pub point_background_color: &'static str,
    pub point_radius: u32,
    pub tension: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub responsive: bool,
    pub maintain_aspect_ratio: bool,
    pub plugins: ChartPlugins,
    pub scales: ChartScales,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPlugins {
    pub legend: Legend,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    pub mode: &'static str,
    pub intersect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartScales {
    pub y: YAxis,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YAxis {
    pub begin_at_zero: bool,
    pub ticks: Ticks,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ticks {
    pub precision: u32,
}

pub fn render_stats(page: &PageData, now: DateTime<Utc>) -> StatsView {
    let chart = page.has(CHART_ID).then(|| {
        let series = read_chart_data(page).unwrap_or_else(|err| {
            error!("failed to parse chart data: {err}");
            Vec::new()
        });
        build_chart(&series)
    });

    let days_since_registration = page
        .attr(REGISTRATION_ID, REGISTER_DATE_ATTR)
        .filter(|value| !value.is_empty())
        .and_then(parse_register_date)
        .map(|registered| days_since_registration(registered, now));

    StatsView {
        monthly_emails: read_count(page, MONTHLY_COUNT_ID),
        total_emails: read_count(page, TOTAL_COUNT_ID),
        chart,
        days_since_registration,
    }
}

/// `data-count` of `id`; 0 when missing or not numeric.
pub fn read_count(page: &PageData, id: &str) -> u64 {
    page.attr(id, COUNT_ATTR).map(parse_leading_int).unwrap_or(0)
}

pub fn read_chart_data(page: &PageData) -> Result<Vec<SeriesPoint>, serde_json::Error> {
    let raw = page
        .attr(CHART_ID, CHART_DATA_ATTR)
        .filter(|value| !value.is_empty())
        .unwrap_or("[]");
    serde_json::from_str(raw)
}

pub fn build_chart(series: &[SeriesPoint]) -> ChartConfig {
    ChartConfig {
        kind: "line",
        data: ChartData {
            labels: series.iter().map(|point| point.day.clone()).collect(),
            datasets: vec![Dataset {
                label: SERIES_LABEL,
                data: series.iter().map(|point| point.count).collect(),
                background_color: SERIES_FILL,
                border_color: SERIES_COLOR,
                border_width: 2,
                point_background_color: SERIES_COLOR,
                point_radius: 4,
                tension: 0.2,
            }],
        },
        options: ChartOptions {
            responsive: true,
            maintain_aspect_ratio: false,
            plugins: ChartPlugins {
                legend: Legend { display: false },
                tooltip: Tooltip {
                    mode: "index",
                    intersect: false,
                },
            },
            scales: ChartScales {
                y: YAxis {
                    begin_at_zero: true,
                    ticks: Ticks { precision: 0 },
                },
            },
        },
    }
}

/// Whole days between the two instants, rounded up.
pub fn days_since_registration(registered: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let diff = (now - registered).num_milliseconds().abs();
    (diff + DAY_MS - 1) / DAY_MS
}

/// `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_register_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

pub fn build_dashboard(data: &AppData, register_date: Option<&str>) -> PageData {
    build_dashboard_at(Local::now().date_naive(), data, register_date)
}

/// Page data for the dashboard: successful report counts and one point per
/// day of the current month up to `today`.
pub fn build_dashboard_at(today: NaiveDate, data: &AppData, register_date: Option<&str>) -> PageData {
    let month_prefix = today.format("%Y-%m").to_string();
    let month_start = today - Duration::days(i64::from(today.day0()));

    let sent: Vec<&str> = data
        .reports
        .iter()
        .filter(|report| report.status == ReportStatus::Success)
        .map(|report| report.sent_on())
        .collect();

    let monthly = sent.iter().filter(|day| day.starts_with(&month_prefix)).count();

    let mut series = Vec::with_capacity(today.day() as usize);
    for offset in 0..today.day() {
        let date = month_start + Duration::days(i64::from(offset));
        let key = date.format("%Y-%m-%d").to_string();
        series.push(SeriesPoint {
            day: date.day().to_string(),
            count: sent.iter().filter(|day| **day == key).count() as u64,
        });
    }

    let mut page = PageData::new();
    page.set_attr(MONTHLY_COUNT_ID, COUNT_ATTR, monthly.to_string())
        .set_attr(TOTAL_COUNT_ID, COUNT_ATTR, sent.len().to_string())
        .set_attr(
            CHART_ID,
            CHART_DATA_ATTR,
            serde_json::to_string(&series).unwrap_or_else(|_| "[]".to_string()),
        );
    if let Some(register_date) = register_date {
        page.set_attr(REGISTRATION_ID, REGISTER_DATE_ATTR, register_date);
    }
    page
}

fn parse_leading_int(value: &str) -> u64 {
    let digits: String = value
        .trim_start()
        .chars()
        .take_while(|ch| ch.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReportLog;

    fn report(sent_at: &str, status: ReportStatus) -> ReportLog {
        ReportLog {
            date: sent_at[..10].to_string(),
            sent_at: sent_at.to_string(),
            status,
            subject: "report".to_string(),
            content_preview: String::new(),
            error_message: None,
        }
    }

    #[test]
    fn chart_series_maps_days_and_counts() {
        let mut page = PageData::new();
        page.set_attr(CHART_ID, CHART_DATA_ATTR, r#"[{"day":"1","count":3},{"day":"2","count":5}]"#);

        let view = render_stats(&page, Utc::now());
        let chart = view.chart.expect("chart");
        assert_eq!(chart.data.labels, vec!["1", "2"]);
        assert_eq!(chart.data.datasets.len(), 1);
        assert_eq!(chart.data.datasets[0].data, vec![3, 5]);
        assert!(!chart.options.plugins.legend.display);
        assert_eq!(chart.options.plugins.tooltip.mode, "index");
        assert!(chart.options.scales.y.begin_at_zero);
    }

    #[test]
    fn chart_serializes_with_widget_field_names() {
        let json = serde_json::to_value(build_chart(&[])).unwrap();
        assert_eq!(json["type"], "line");
        assert_eq!(json["options"]["maintainAspectRatio"], false);
        assert_eq!(json["options"]["scales"]["y"]["beginAtZero"], true);
        assert_eq!(json["data"]["datasets"][0]["pointRadius"], 4);
    }

    #[test]
    fn missing_attributes_default_to_zero_and_empty() {
        let mut page = PageData::new();
        page.set_attr(CHART_ID, "class", "chart");
        page.set_attr(MONTHLY_COUNT_ID, COUNT_ATTR, "oops");

        let view = render_stats(&page, Utc::now());
        assert_eq!(view.monthly_emails, 0);
        assert_eq!(view.total_emails, 0);
        assert!(view.chart.unwrap().data.labels.is_empty());
        assert_eq!(view.days_since_registration, None);
    }

    #[test]
    fn counts_are_read_like_parse_int() {
        let mut page = PageData::new();
        page.set_attr(TOTAL_COUNT_ID, COUNT_ATTR, " 42 emails");
        assert_eq!(read_count(&page, TOTAL_COUNT_ID), 42);
    }

    #[test]
    fn malformed_chart_json_renders_empty_chart() {
        let mut page = PageData::new();
        page.set_attr(CHART_ID, CHART_DATA_ATTR, "{not json");
        assert!(read_chart_data(&page).is_err());
        let view = render_stats(&page, Utc::now());
        assert!(view.chart.unwrap().data.datasets[0].data.is_empty());
    }

    #[test]
    fn registration_ten_days_ago_is_ten() {
        let now = Utc::now();
        let registered = now - Duration::days(10);
        assert_eq!(days_since_registration(registered, now), 10);
    }

    #[test]
    fn partial_days_round_up_in_either_direction() {
        let now = parse_register_date("2026-03-10T12:00:00Z").unwrap();
        let registered = parse_register_date("2026-03-01").unwrap();
        assert_eq!(days_since_registration(registered, now), 10);
        assert_eq!(days_since_registration(now, registered), 10);
    }

    #[test]
    fn registration_attribute_feeds_render() {
        let mut page = PageData::new();
        page.set_attr(REGISTRATION_ID, REGISTER_DATE_ATTR, "2026-01-01");
        let now = parse_register_date("2026-01-11").unwrap();
        assert_eq!(render_stats(&page, now).days_since_registration, Some(10));
    }

    #[test]
    fn dashboard_counts_only_successful_reports() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        let data = AppData {
            reports: vec![
                report("2025-12-30T09:00:00+08:00", ReportStatus::Success),
                report("2026-01-02T09:00:00+08:00", ReportStatus::Success),
                report("2026-01-02T10:00:00+08:00", ReportStatus::Success),
                report("2026-01-04T09:00:00+08:00", ReportStatus::Failed),
            ],
            ..AppData::default()
        };

        let page = build_dashboard_at(today, &data, Some("2025-12-01"));
        assert_eq!(read_count(&page, MONTHLY_COUNT_ID), 2);
        assert_eq!(read_count(&page, TOTAL_COUNT_ID), 3);

        let series = read_chart_data(&page).unwrap();
        assert_eq!(series.len(), 5);
        assert_eq!(series[0].day, "1");
        assert_eq!(series[1].count, 2);
        assert_eq!(series[3].count, 0);
        assert_eq!(page.attr(REGISTRATION_ID, REGISTER_DATE_ATTR), Some("2025-12-01"));
    }
}
