pub mod board;
pub mod detail;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// How a value is pulled out of the first element matching a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Rule {
    Text,
    Attr {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fallback: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    pub selector: String,
    pub rule: Rule,
}

impl FieldRule {
    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            rule: Rule::Text,
        }
    }

    pub fn attr(selector: &str, name: &str, fallback: Option<&str>) -> Self {
        Self {
            selector: selector.to_string(),
            rule: Rule::Attr {
                name: name.to_string(),
                fallback: fallback.map(str::to_string),
            },
        }
    }

    pub fn compile(&self, field: &str) -> Result<CompiledRule, ExtractionError> {
        Ok(CompiledRule {
            selector: compile_selector(field, &self.selector)?,
            rule: self.rule.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    selector: Selector,
    rule: Rule,
}

impl CompiledRule {
    /// Extract from the first match under `scope`. Blank values count as absent.
    pub fn first(&self, scope: ElementRef<'_>) -> Option<String> {
        let el = scope.select(&self.selector).next()?;
        match &self.rule {
            Rule::Text => element_text(el),
            Rule::Attr { name, fallback } => attr_value(el, name)
                .or_else(|| fallback.as_deref().and_then(|f| attr_value(el, f))),
        }
    }
}

pub fn compile_selector(field: &str, css: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::InvalidSelector {
        field: field.to_string(),
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// Whitespace-collapsed text of an element, `None` when empty.
pub fn element_text(el: ElementRef<'_>) -> Option<String> {
    clean_text(&el.text().collect::<String>())
}

pub fn clean_text(raw: &str) -> Option<String> {
    let text = WS_RE.replace_all(raw.trim(), " ");
    if text.is_empty() {
        None
    } else {
        Some(text.into_owned())
    }
}

fn attr_value(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
