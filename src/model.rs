use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

pub const UNKNOWN: &str = "unknown";
pub const NO_RATING: &str = "no rating";
pub const NO_SUMMARY: &str = "no summary";

/// Which board a record set came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKey {
    DomesticMovies,
    ForeignMovies,
    DomesticSeries,
    ForeignSeries,
}

impl SourceKey {
    pub const ALL: [SourceKey; 4] = [
        SourceKey::DomesticMovies,
        SourceKey::ForeignMovies,
        SourceKey::DomesticSeries,
        SourceKey::ForeignSeries,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SourceKey::DomesticMovies => "domestic_movies",
            SourceKey::ForeignMovies => "foreign_movies",
            SourceKey::DomesticSeries => "domestic_series",
            SourceKey::ForeignSeries => "foreign_series",
        }
    }

    pub fn parse(name: &str) -> Option<SourceKey> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Two-part score as the boards print it. The markup usually carries the
/// decimal point on one side ("8." + "5"); displayed with exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub integer: String,
    pub fraction: String,
}

impl Rating {
    /// Both parts are required; a lone half is no rating at all.
    pub fn from_parts(integer: Option<String>, fraction: Option<String>) -> Option<Rating> {
        Some(Rating {
            integer: integer?,
            fraction: fraction?,
        })
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let integer = self.integer.strip_suffix('.').unwrap_or(&self.integer);
        let fraction = self.fraction.strip_prefix('.').unwrap_or(&self.fraction);
        write!(f, "{}.{}", integer, fraction)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingRecord {
    pub title: String,
    pub rating: Option<Rating>,
    pub image: String,
    pub detail_link: Option<Url>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub director: String,
    pub actors: String,
    pub summary: String,
}

impl Default for DetailRecord {
    fn default() -> Self {
        Self {
            director: UNKNOWN.to_string(),
            actors: UNKNOWN.to_string(),
            summary: NO_SUMMARY.to_string(),
        }
    }
}

/// Listing fields with the detail fields overlaid. This is what gets rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrichedRecord {
    pub title: String,
    pub rating: String,
    pub image: String,
    pub director: String,
    pub actors: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail_link: Option<String>,
}

impl EnrichedRecord {
    pub fn merge(listing: ListingRecord, detail: Option<DetailRecord>) -> Self {
        let detail = detail.unwrap_or_default();
        Self {
            title: listing.title,
            rating: listing
                .rating
                .map(|r| r.to_string())
                .unwrap_or_else(|| NO_RATING.to_string()),
            image: listing.image,
            director: detail.director,
            actors: detail.actors,
            summary: detail.summary,
            detail_link: listing.detail_link.map(String::from),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardResult {
    pub label: String,
    pub records: Vec<EnrichedRecord>,
}

/// Boards keyed by source, in the order the sources were configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateResult {
    boards: Vec<(SourceKey, BoardResult)>,
}

impl AggregateResult {
    /// Later inserts for the same key replace the earlier board in place.
    pub fn insert(&mut self, key: SourceKey, board: BoardResult) {
        match self.boards.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = board,
            None => self.boards.push((key, board)),
        }
    }

    pub fn get(&self, key: SourceKey) -> Option<&BoardResult> {
        self.boards.iter().find(|(k, _)| *k == key).map(|(_, b)| b)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceKey, &BoardResult)> {
        self.boards.iter().map(|(k, b)| (*k, b))
    }

    pub fn len(&self) -> usize {
        self.boards.len()
    }

    pub fn total_records(&self) -> usize {
        self.boards.iter().map(|(_, b)| b.records.len()).sum()
    }

    pub fn has_records(&self) -> bool {
        self.boards.iter().any(|(_, b)| !b.records.is_empty())
    }
}

impl Serialize for AggregateResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.boards.len()))?;
        for (key, board) in &self.boards {
            map.serialize_entry(key.as_str(), board)?;
        }
        map.end()
    }
}
