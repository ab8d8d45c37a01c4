use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

use super::{compile_selector, element_text, CompiledRule, FieldRule};
use crate::error::ExtractionError;
use crate::model::DetailRecord;

/// Selectors and label tokens for a per-title detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailContract {
    pub info_line: String,
    pub director_label: String,
    pub actor_label: String,
    pub link: String,
    pub summary: FieldRule,
}

impl Default for DetailContract {
    fn default() -> Self {
        Self {
            info_line: ".celebrity-group".to_string(),
            director_label: "导演".to_string(),
            actor_label: "演员".to_string(),
            link: "a.name".to_string(),
            summary: FieldRule::text("span.dra"),
        }
    }
}

impl DetailContract {
    pub fn compile(&self) -> Result<CompiledDetail, ExtractionError> {
        Ok(CompiledDetail {
            info_line: compile_selector("info_line", &self.info_line)?,
            link: compile_selector("link", &self.link)?,
            summary: self.summary.compile("summary")?,
            director_label: self.director_label.clone(),
            actor_label: self.actor_label.clone(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledDetail {
    info_line: Selector,
    link: Selector,
    summary: CompiledRule,
    director_label: String,
    actor_label: String,
}

impl CompiledDetail {
    pub fn parse(&self, html: &str) -> DetailRecord {
        let doc = Html::parse_document(html);
        let mut director: Option<String> = None;
        let mut actors: Option<String> = None;

        for line in doc.select(&self.info_line) {
            let text: String = line.text().collect();

            if director.is_none() && text.contains(&self.director_label) {
                director = line.select(&self.link).find_map(element_text);
            }

            if actors.is_none() && text.contains(&self.actor_label) {
                let names: Vec<String> = line.select(&self.link).filter_map(element_text).collect();
                if !names.is_empty() {
                    actors = Some(names.join(", "));
                }
            }
        }

        let summary = self.summary.first(doc.root_element());

        let defaults = DetailRecord::default();
        DetailRecord {
            director: director.unwrap_or(defaults.director),
            actors: actors.unwrap_or(defaults.actors),
            summary: summary.unwrap_or(defaults.summary),
        }
    }
}
