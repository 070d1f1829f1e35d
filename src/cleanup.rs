//! Cleanup applied to generated summaries before they are shown or sent.
//!
//! The pipeline is an ordered list of named [`Rule`]s. Order matters: list
//! markers are normalised before separators are inserted, and only items
//! 1 through 10 are recognised.

use once_cell::sync::Lazy;
use regex::Regex;

/// Blank-line separator in the HTML the summary is rendered as.
pub const BREAK: &str = "<br><br>";
const MAX_ITEM: u32 = 10;

pub struct Rule {
    pub name: &'static str,
    transform: fn(&str) -> String,
}

impl Rule {
    pub fn apply(&self, text: &str) -> String {
        (self.transform)(text)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

static RULES: [Rule; 10] = [
    Rule { name: "trim_input", transform: trim },
    Rule { name: "strip_lead_in", transform: strip_lead_in },
    Rule { name: "strip_sign_off", transform: strip_sign_off },
    Rule { name: "strip_salutations", transform: strip_salutations },
    Rule { name: "strip_closings", transform: strip_closings },
    Rule { name: "normalize_markers", transform: normalize_markers },
    Rule { name: "separate_items", transform: separate_items },
    Rule { name: "collapse_breaks", transform: collapse_breaks },
    Rule { name: "trim_output", transform: trim },
    Rule { name: "seek_first_item", transform: seek_first_item },
];

pub fn rules() -> &'static [Rule] {
    &RULES
}

pub fn clean(text: &str) -> String {
    rules()
        .iter()
        .fold(text.to_string(), |acc, rule| rule.apply(&acc))
}

static LEAD_IN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:以下是|以下是对|这是|这是对|根据|这里是|以下是我|下面是|根据您提供的内容，|嗨，以下是|为您总结).*?(?:要点|总结|学习|内容|笔记)(?:：|:)?\s*",
    )
    .expect("lead-in pattern")
});

static SIGN_OFF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:这些是|这些是今天的|以上是|以上是今天的|希望|祝您|如有|如果|需要|如需).{0,50}$")
        .expect("sign-off pattern")
});

static SALUTATIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)尊敬的领导|尊敬的同事|各位领导|各位同事|尊敬的[0-9A-Za-z_\s]+:|亲爱的[0-9A-Za-z_\s]+:")
        .expect("salutation pattern")
});

static CLOSINGS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)此致[，,]?\s*敬礼|祝(?:您|你)[0-9A-Za-z_\s]+|感谢您的[0-9A-Za-z_\s]+|此致|敬礼|顺祝[0-9A-Za-z_\s]+",
    )
    .expect("closing pattern")
});

/// Per item number: `N)` + whitespace and `N、` + optional whitespace.
static MARKERS: Lazy<Vec<(u32, Regex, Regex)>> = Lazy::new(|| {
    (1..=MAX_ITEM)
        .map(|n| {
            (
                n,
                Regex::new(&format!(r"{n}\)\s+")).expect("paren marker pattern"),
                Regex::new(&format!(r"{n}、\s*")).expect("comma marker pattern"),
            )
        })
        .collect()
});

static BREAK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:<br>){3,}").expect("break pattern"));
static FIRST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"1\.\s").expect("first item pattern"));

fn trim(text: &str) -> String {
    text.trim().to_string()
}

fn strip_lead_in(text: &str) -> String {
    LEAD_IN.replace(text, "").into_owned()
}

fn strip_sign_off(text: &str) -> String {
    SIGN_OFF.replace(text, "").into_owned()
}

fn strip_salutations(text: &str) -> String {
    SALUTATIONS.replace_all(text, "").into_owned()
}

fn strip_closings(text: &str) -> String {
    CLOSINGS.replace_all(text, "").into_owned()
}

fn normalize_markers(text: &str) -> String {
    let mut text = text.to_string();
    for (n, paren, comma) in MARKERS.iter() {
        let canonical = format!("{n}. ");
        text = text.replace(&format!("{n}. {BREAK}"), &canonical);
        text = text.replace(&format!("{n}.{BREAK}"), &canonical);
        text = paren.replace_all(&text, canonical.as_str()).into_owned();
        text = comma.replace_all(&text, canonical.as_str()).into_owned();
    }
    text
}

fn separate_items(text: &str) -> String {
    let mut text = text.to_string();
    for n in 2..=MAX_ITEM {
        text = text.replace(&format!("{n}. "), &format!("{BREAK}{n}. "));
    }
    text
}

fn collapse_breaks(text: &str) -> String {
    BREAK_RUN.replace_all(text, BREAK).into_owned()
}

fn seek_first_item(text: &str) -> String {
    if text.starts_with("1.") && text[2..].starts_with(char::is_whitespace) {
        return text.to_string();
    }
    match FIRST_ITEM.find(text) {
        Some(found) if found.start() > 0 => text[found.start()..].to_string(),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str) -> &'static Rule {
        rules()
            .iter()
            .find(|rule| rule.name == name)
            .expect("unknown rule")
    }

    #[test]
    fn summary_with_lead_in_and_comma_markers() {
        let cleaned = clean("以下是总结：1、第一点 2、第二点");
        assert!(cleaned.starts_with("1. 第一点"), "{cleaned}");
        assert_eq!(cleaned.matches(BREAK).count(), 1);
        assert!(cleaned.contains("<br><br>2. 第二点"), "{cleaned}");
    }

    #[test]
    fn rules_run_in_documented_order() {
        let names: Vec<_> = rules().iter().map(|rule| rule.name).collect();
        assert_eq!(
            names,
            vec![
                "trim_input",
                "strip_lead_in",
                "strip_sign_off",
                "strip_salutations",
                "strip_closings",
                "normalize_markers",
                "separate_items",
                "collapse_breaks",
                "trim_output",
                "seek_first_item",
            ]
        );
    }

    #[test]
    fn lead_in_is_only_stripped_at_start() {
        let strip = rule("strip_lead_in");
        assert_eq!(strip.apply("这是今天的要点：1. 读书"), "1. 读书");
        assert_eq!(strip.apply("这是今天的学习要点：1. 读书"), "要点：1. 读书");
        assert_eq!(strip.apply("1. 以下是总结"), "1. 以下是总结");
    }

    #[test]
    fn sign_off_is_stripped_from_the_end() {
        let strip = rule("strip_sign_off");
        assert_eq!(strip.apply("1. 读书 以上是今天的总结。"), "1. 读书 ");
        assert_eq!(strip.apply("1. 希望"), "1. ");
    }

    #[test]
    fn salutations_and_closings_are_removed() {
        assert_eq!(rule("strip_salutations").apply("尊敬的领导1. 读书"), "1. 读书");
        assert_eq!(rule("strip_salutations").apply("Dear 亲爱的 team:1. x"), "Dear 1. x");
        assert_eq!(rule("strip_closings").apply("1. 读书 此致，敬礼"), "1. 读书 ");
    }

    #[test]
    fn all_marker_styles_become_canonical() {
        let normalize = rule("normalize_markers");
        assert_eq!(normalize.apply("1.<br><br>读书"), "1. 读书");
        assert_eq!(normalize.apply("1. <br><br>读书"), "1. 读书");
        assert_eq!(normalize.apply("1)  读书 2) 写字"), "1. 读书 2. 写字");
        assert_eq!(normalize.apply("3、 复习"), "3. 复习");
    }

    #[test]
    fn separators_start_from_second_item() {
        assert_eq!(
            rule("separate_items").apply("1. a 2. b 10. c"),
            "1. a <br><br>2. b <br><br>10. c"
        );
    }

    #[test]
    fn break_runs_collapse_to_one_blank_line() {
        assert_eq!(rule("collapse_breaks").apply("a<br><br><br><br>b"), "a<br><br>b");
        assert_eq!(rule("collapse_breaks").apply("a<br><br>b"), "a<br><br>b");
    }

    #[test]
    fn text_before_first_item_is_dropped() {
        let seek = rule("seek_first_item");
        assert_eq!(seek.apply("好的 1. 读书"), "1. 读书");
        assert_eq!(seek.apply("1. 读书"), "1. 读书");
        assert_eq!(seek.apply("没有要点"), "没有要点");
    }

    #[test]
    fn existing_breaks_do_not_stack() {
        let cleaned = clean("1. 读书<br><br>2. 写字<br><br>3. 复习");
        assert_eq!(cleaned, "1. 读书<br><br>2. 写字<br><br>3. 复习");
    }

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(clean("   "), "");
    }
}
