use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

static OPEN_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<(\d{4}-\d{2}-\d{2})>").expect("date tag pattern"));

const PREVIEW_CHARS: usize = 100;
const WEEKDAYS: [&str; 7] = ["一", "二", "三", "四", "五", "六", "日"];

/// `(date, content)` for every `<YYYY-MM-DD>…</YYYY-MM-DD>` section, in order.
pub fn sections(plan: &str) -> Vec<(String, String)> {
    let mut found = Vec::new();
    let mut offset = 0;
    while let Some(open) = OPEN_TAG.captures_at(plan, offset) {
        let (Some(whole), Some(date)) = (open.get(0), open.get(1)) else {
            break;
        };
        let close = format!("</{}>", date.as_str());
        match plan[whole.end()..].find(&close) {
            Some(len) => {
                let body = &plan[whole.end()..whole.end() + len];
                found.push((date.as_str().to_string(), body.to_string()));
                offset = whole.end() + len + close.len();
            }
            None => offset = whole.end(),
        }
    }
    found
}

/// Monthly plan for `date`. With `fallback`, a month without a plan falls
/// back to the latest stored month before it.
pub fn plan_for_date<'a>(
    plans: &'a BTreeMap<String, String>,
    date: NaiveDate,
    fallback: bool,
) -> Option<(&'a str, &'a str)> {
    let key = date.format("%Y-%m").to_string();
    if let Some((month, plan)) = plans.get_key_value(&key) {
        return Some((month.as_str(), plan.as_str()));
    }
    if !fallback {
        return None;
    }
    plans
        .range(..key)
        .next_back()
        .map(|(month, plan)| (month.as_str(), plan.as_str()))
}

pub fn extract_content_for_date(plan: &str, date: NaiveDate) -> Option<String> {
    let key = date.format("%Y-%m-%d").to_string();
    sections(plan)
        .into_iter()
        .find(|(day, _)| *day == key)
        .map(|(_, content)| content.trim().to_string())
}

/// Exact date, else the latest earlier date, else the earliest date.
/// Returns the content and the date it came from.
pub fn relative_date_content(plan: &str, date: NaiveDate) -> Option<(String, String)> {
    let key = date.format("%Y-%m-%d").to_string();
    let mut all = sections(plan);
    if let Some((day, content)) = all.iter().find(|(day, _)| *day == key) {
        return Some((content.trim().to_string(), day.clone()));
    }

    all.sort_by(|a, b| a.0.cmp(&b.0));
    let earlier = all.iter().filter(|(day, _)| *day < key).next_back();
    earlier
        .or_else(|| all.first())
        .map(|(day, content)| (content.trim().to_string(), day.clone()))
}

pub fn build_prompt(content: &str) -> String {
    format!(
        r#"
    请根据以下内容，总结今天的学习要点，要求：
    1. 内容要详细具体,对各个要点的可能内容进行猜测
    2. 用1、2、3...的形式列出，直接给出要点，不要加尊敬的领导/同事等问候语
    3. 每个要点后面加上<br><br>标签换行
    4. 每个点的要简洁一些,以正式邮件的格式列出，但不要加结束语如"此致敬礼"等
    5. 不要出现"待补充"、"后续内容"等不确定的表述
    6. 绝对不要出现诸如"好的，根据您提供的内容，今天的学习要点总结如下"这样的表述
    7. 不要出现"可能"、"推测"之类的词语
    8. 不要添加任何引言和结束语，直接开始列举要点

    原始内容：
    {content}
    "#
    )
}

pub fn report_subject(user_name: &str, date: NaiveDate) -> String {
    let weekday = WEEKDAYS[date.weekday().num_days_from_monday() as usize];
    format!("{user_name} {} 星期{weekday} 日报", date.format("%Y-%m-%d"))
}

pub fn content_preview(content: &str) -> String {
    if content.chars().count() > PREVIEW_CHARS {
        let head: String = content.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        content.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAN: &str = "\
<2026-01-02>
  读文档
</2026-01-02>
<2026-01-05>写测试</2026-01-05>
<2026-01-07>未闭合
<2026-01-09>复盘</2026-01-09>";

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, d).unwrap()
    }

    #[test]
    fn sections_skip_unclosed_tags() {
        let dates: Vec<_> = sections(PLAN).into_iter().map(|(date, _)| date).collect();
        assert_eq!(dates, vec!["2026-01-02", "2026-01-05", "2026-01-09"]);
    }

    #[test]
    fn exact_date_is_trimmed() {
        assert_eq!(extract_content_for_date(PLAN, day(2)).as_deref(), Some("读文档"));
        assert_eq!(extract_content_for_date(PLAN, day(3)), None);
    }

    #[test]
    fn relative_lookup_prefers_latest_earlier_date() {
        assert_eq!(
            relative_date_content(PLAN, day(6)),
            Some(("写测试".to_string(), "2026-01-05".to_string()))
        );
        assert_eq!(
            relative_date_content(PLAN, day(1)),
            Some(("读文档".to_string(), "2026-01-02".to_string()))
        );
        assert_eq!(relative_date_content("no tags", day(1)), None);
    }

    #[test]
    fn month_without_plan_falls_back_to_latest_earlier_month() {
        let mut plans = BTreeMap::new();
        plans.insert("2025-11".to_string(), "november".to_string());
        plans.insert("2025-12".to_string(), "december".to_string());
        plans.insert("2026-03".to_string(), "march".to_string());
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();

        assert_eq!(plan_for_date(&plans, date, false), None);
        assert_eq!(plan_for_date(&plans, date, true), Some(("2025-12", "december")));
        assert_eq!(
            plan_for_date(&plans, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(), false),
            Some(("2026-03", "march"))
        );
        assert_eq!(plan_for_date(&plans, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), true), None);
    }

    #[test]
    fn prompt_embeds_content() {
        assert!(build_prompt("今天学了 Rust").contains("原始内容：\n    今天学了 Rust"));
    }

    #[test]
    fn subject_names_the_weekday() {
        assert_eq!(report_subject("小明", day(5)), "小明 2026-01-05 星期一 日报");
    }

    #[test]
    fn preview_is_cut_at_one_hundred_chars() {
        let long = "字".repeat(120);
        let preview = content_preview(&long);
        assert_eq!(preview.chars().count(), 103);
        assert!(preview.ends_with("..."));
        assert_eq!(content_preview("短"), "短");
    }
}
