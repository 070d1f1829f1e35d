use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MONTHLY_COUNT_ID: &str = "monthly-emails-count";
pub const TOTAL_COUNT_ID: &str = "total-emails-count";
pub const CHART_ID: &str = "emailMonthlyChart";
pub const REGISTRATION_ID: &str = "days-since-registration";
pub const PROXY_DATA_ID: &str = "client-proxy-data";

pub const COUNT_ATTR: &str = "data-count";
pub const CHART_DATA_ATTR: &str = "data-chart-data";
pub const REGISTER_DATE_ATTR: &str = "data-register-date";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
}

/// Values the server embeds in page markup, keyed by element id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageData {
    elements: BTreeMap<String, Element>,
}

impl PageData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    pub fn attr(&self, id: &str, name: &str) -> Option<&str> {
        self.elements
            .get(id)
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    pub fn text(&self, id: &str) -> Option<&str> {
        self.elements.get(id).and_then(|element| element.text.as_deref())
    }

    pub fn set_attr(&mut self, id: &str, name: &str, value: impl Into<String>) -> &mut Self {
        self.elements
            .entry(id.to_string())
            .or_default()
            .attributes
            .insert(name.to_string(), value.into());
        self
    }

    pub fn set_text(&mut self, id: &str, text: impl Into<String>) -> &mut Self {
        self.elements.entry(id.to_string()).or_default().text = Some(text.into());
        self
    }

    /// Markup fragment `data-x="…"` for every attribute of `id`, HTML-escaped.
    pub fn attributes_html(&self, id: &str) -> String {
        let Some(element) = self.elements.get(id) else {
            return String::new();
        };
        element
            .attributes
            .iter()
            .map(|(name, value)| format!(" {name}=\"{}\"", escape_html(value)))
            .collect()
    }
}

pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
