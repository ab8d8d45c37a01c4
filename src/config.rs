use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::extract::board::BoardContract;
use crate::extract::detail::DetailContract;
use crate::model::SourceKey;
use crate::pipeline::Pacing;

/// One board to scrape: where it lives, what to call it, and where its records go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpec {
    pub url: Url,
    pub label: String,
    pub key: SourceKey,
}

/// Delays and ceilings, in milliseconds so the config file stays plain JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub settle_ms: u64,
    pub politeness_ms: u64,
    pub detail_timeout_ms: u64,
    pub board_timeout_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle_ms: 5_000,
            politeness_ms: 1_000,
            detail_timeout_ms: 10_000,
            board_timeout_ms: 30_000,
        }
    }
}

impl PacingConfig {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn politeness(&self) -> Duration {
        Duration::from_millis(self.politeness_ms)
    }

    pub fn detail_timeout(&self) -> Duration {
        Duration::from_millis(self.detail_timeout_ms)
    }

    pub fn board_timeout(&self) -> Duration {
        Duration::from_millis(self.board_timeout_ms)
    }

    pub fn pipeline_pacing(&self) -> Pacing {
        Pacing {
            politeness: self.politeness(),
            detail_timeout: self.detail_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: Vec<SourceSpec>,
    pub board: BoardContract,
    pub detail: DetailContract,
    pub pacing: PacingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            board: BoardContract::default(),
            detail: DetailContract::default(),
            pacing: PacingConfig::default(),
        }
    }
}

fn default_sources() -> Vec<SourceSpec> {
    [
        ("https://www.maoyan.com/board/1", "Domestic box office", SourceKey::DomesticMovies),
        ("https://www.maoyan.com/board/2", "North America box office", SourceKey::ForeignMovies),
    ]
    .into_iter()
    .filter_map(|(url, label, key)| {
        Some(SourceSpec {
            url: Url::parse(url).ok()?,
            label: label.to_string(),
            key,
        })
    })
    .collect()
}

impl Config {
    /// Built-in defaults, or a JSON file whose sections override them.
    pub fn load(path: Option<&Path>) -> Result<Config> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_json(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Config::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Config> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            bail!("No sources configured");
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.key) {
                bail!("Source key {} is configured more than once", source.key);
            }
            if !matches!(source.url.scheme(), "http" | "https") {
                bail!("Source {} must be an http(s) URL, got {}", source.key, source.url);
            }
        }

        self.board.compile().context("Board extraction contract")?;
        self.detail.compile().context("Detail extraction contract")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::FieldRule;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.pacing.settle(), Duration::from_secs(5));
        assert_eq!(config.pacing.politeness(), Duration::from_secs(1));
        assert_eq!(config.pacing.detail_timeout(), Duration::from_secs(10));
        let pacing = config.pacing.pipeline_pacing();
        assert_eq!(pacing.politeness, Duration::from_secs(1));
        assert_eq!(pacing.detail_timeout, Duration::from_secs(10));
    }

    #[test]
    fn partial_file_keeps_default_sections() {
        let config = Config::from_json(
            r#"{
                "sources": [
                    {"url": "https://example.com/tv/cn", "label": "CN series", "key": "domestic_series"},
                    {"url": "https://example.com/tv/us", "label": "US series", "key": "foreign_series"}
                ],
                "pacing": {"politeness_ms": 0}
            }"#,
        )
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.sources[1].key, SourceKey::ForeignSeries);
        assert_eq!(config.pacing.politeness_ms, 0);
        assert_eq!(config.pacing.settle_ms, 5_000);
        assert_eq!(config.board, BoardContract::default());
    }

    #[test]
    fn duplicate_keys_rejected() {
        let mut config = Config::default();
        let dup = config.sources[0].clone();
        config.sources.push(dup);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn invalid_selector_rejected() {
        let mut config = Config::default();
        config.board.title = FieldRule::text("p.name[");
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_key_rejected() {
        let err = Config::from_json(
            r#"{"sources": [{"url": "https://example.com/", "label": "x", "key": "cartoons"}]}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn non_http_source_rejected() {
        let config = Config::from_json(
            r#"{"sources": [{"url": "file:///tmp/board.html", "label": "x", "key": "domestic_movies"}]}"#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_sources_rejected() {
        let config = Config::from_json(r#"{"sources": []}"#).unwrap();
        assert!(config.validate().is_err());
    }
}
