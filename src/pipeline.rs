use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use url::Url;

use crate::config::SourceSpec;
use crate::error::ExtractionError;
use crate::extract::board::{BoardContract, CompiledBoard};
use crate::extract::detail::{CompiledDetail, DetailContract};
use crate::fetch::PageLoader;
use crate::model::{AggregateResult, BoardResult, DetailRecord, EnrichedRecord};

/// How hard we lean on the source sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Pause after each detail fetch before moving to the next item.
    pub politeness: Duration,
    pub detail_timeout: Duration,
}

/// Board → items → detail pages, one thing at a time.
pub struct Pipeline {
    boards: Box<dyn PageLoader>,
    details: Box<dyn PageLoader>,
    board_contract: CompiledBoard,
    detail_contract: CompiledDetail,
    pacing: Pacing,
}

impl Pipeline {
    pub fn new(
        boards: Box<dyn PageLoader>,
        details: Box<dyn PageLoader>,
        board_contract: &BoardContract,
        detail_contract: &DetailContract,
        pacing: Pacing,
    ) -> Result<Self, ExtractionError> {
        Ok(Self {
            boards,
            details,
            board_contract: board_contract.compile()?,
            detail_contract: detail_contract.compile()?,
            pacing,
        })
    }

    /// Never fails: anything that goes wrong yields default fields.
    pub async fn fetch_detail(&self, url: &Url) -> DetailRecord {
        match tokio::time::timeout(self.pacing.detail_timeout, self.details.load(url)).await {
            Ok(Ok(html)) => self.detail_contract.parse(&html),
            Ok(Err(e)) => {
                warn!("Detail fetch failed, using defaults: {}", e);
                DetailRecord::default()
            }
            Err(_) => {
                warn!(
                    "Detail page {} timed out after {:.1}s, using defaults",
                    url,
                    self.pacing.detail_timeout.as_secs_f64()
                );
                DetailRecord::default()
            }
        }
    }

    /// Scrape one board in ranking order. Returns empty if the listing itself
    /// cannot be obtained; per-item problems only cost that item's fields.
    pub async fn fetch_board(&self, board_url: &Url, label: &str) -> Vec<EnrichedRecord> {
        let html = match self.boards.load(board_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Board '{}' unavailable: {}", label, e);
                return Vec::new();
            }
        };

        let items = self.board_contract.parse_items(&html, board_url);
        if items.is_empty() {
            warn!(
                "Board '{}' has no recognizable items; the page markup may have changed",
                label
            );
            return Vec::new();
        }

        let pb = ProgressBar::new(items.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );

        let mut records = Vec::with_capacity(items.len());
        let mut issues = 0usize;

        for (i, item) in items.into_iter().enumerate() {
            let rank = i + 1;
            for issue in &item.issues {
                warn!("{} #{}: {}", label, rank, issue);
            }
            issues += item.issues.len();
            pb.set_message(item.listing.title.clone());

            let detail = match &item.listing.detail_link {
                Some(link) => {
                    info!("{} #{} {}: fetching details", label, rank, item.listing.title);
                    let detail = self.fetch_detail(link).await;
                    if !self.pacing.politeness.is_zero() {
                        tokio::time::sleep(self.pacing.politeness).await;
                    }
                    Some(detail)
                }
                None => None,
            };

            records.push(EnrichedRecord::merge(item.listing, detail));
            pb.inc(1);
        }

        pb.finish_and_clear();
        info!(
            "Board '{}': {} items ({} extraction issues)",
            label,
            records.len(),
            issues
        );
        records
    }

    /// Run every source in order. Each configured key is present in the
    /// result, even when its board came back empty.
    pub async fn aggregate(&self, sources: &[SourceSpec]) -> AggregateResult {
        let mut result = AggregateResult::default();

        for (i, source) in sources.iter().enumerate() {
            println!(
                "[{}/{}] Fetching {} ({})",
                i + 1,
                sources.len(),
                source.label,
                source.url
            );
            let records = self.fetch_board(&source.url, &source.label).await;
            println!("        {} records from {}", records.len(), source.label);
            result.insert(
                source.key,
                BoardResult {
                    label: source.label.clone(),
                    records,
                },
            );
        }

        info!(
            "Collected {} records from {} boards",
            result.total_records(),
            result.len()
        );
        result
    }
}
