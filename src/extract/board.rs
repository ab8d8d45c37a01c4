use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use super::{compile_selector, CompiledRule, FieldRule};
use crate::error::ExtractionError;
use crate::model::{ListingRecord, Rating, UNKNOWN};

/// Selectors for one ranked listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardContract {
    pub item: String,
    pub title: FieldRule,
    pub rating_integer: FieldRule,
    pub rating_fraction: FieldRule,
    pub image: FieldRule,
    pub detail_link: FieldRule,
}

impl Default for BoardContract {
    fn default() -> Self {
        Self {
            item: "dd".to_string(),
            title: FieldRule::text("p.name"),
            rating_integer: FieldRule::text("i.integer"),
            rating_fraction: FieldRule::text("i.fraction"),
            image: FieldRule::attr("img.board-img", "data-src", Some("src")),
            detail_link: FieldRule::attr("p.name a", "href", None),
        }
    }
}

impl BoardContract {
    pub fn compile(&self) -> Result<CompiledBoard, ExtractionError> {
        Ok(CompiledBoard {
            item: compile_selector("item", &self.item)?,
            title: self.title.compile("title")?,
            rating_integer: self.rating_integer.compile("rating_integer")?,
            rating_fraction: self.rating_fraction.compile("rating_fraction")?,
            image: self.image.compile("image")?,
            detail_link: self.detail_link.compile("detail_link")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledBoard {
    item: Selector,
    title: CompiledRule,
    rating_integer: CompiledRule,
    rating_fraction: CompiledRule,
    image: CompiledRule,
    detail_link: CompiledRule,
}

/// One item fragment's listing record plus anything that went wrong on the way.
#[derive(Debug)]
pub struct ItemExtract {
    pub listing: ListingRecord,
    pub issues: Vec<ExtractionError>,
}

impl CompiledBoard {
    /// Extract every item fragment in document order.
    pub fn parse_items(&self, html: &str, board_url: &Url) -> Vec<ItemExtract> {
        let doc = Html::parse_document(html);
        doc.select(&self.item)
            .map(|item| {
                let mut issues = Vec::new();

                let title = self.title.first(item).unwrap_or_else(|| UNKNOWN.to_string());
                let rating = Rating::from_parts(
                    self.rating_integer.first(item),
                    self.rating_fraction.first(item),
                );
                let image = self
                    .image
                    .first(item)
                    .map(|src| absolute_image(&src))
                    .unwrap_or_default();

                let detail_link = self.detail_link.first(item).and_then(|href| {
                    match resolve_detail_link(board_url, &href) {
                        Ok(url) => Some(url),
                        Err(reason) => {
                            issues.push(ExtractionError::DetailLink { href, reason });
                            None
                        }
                    }
                });

                ItemExtract {
                    listing: ListingRecord {
                        title,
                        rating,
                        image,
                        detail_link,
                    },
                    issues,
                }
            })
            .collect()
    }
}

/// Only http(s) pages other than the board itself count as detail pages.
fn resolve_detail_link(board_url: &Url, href: &str) -> Result<Url, String> {
    let url = board_url.join(href).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme {:?}", url.scheme()));
    }
    let mut page = url.clone();
    page.set_fragment(None);
    let mut board = board_url.clone();
    board.set_fragment(None);
    if page == board {
        return Err("points back at the board".to_string());
    }
    Ok(url)
}

/// Protocol-relative poster URLs (`//host/x.jpg`) are pinned to https.
pub fn absolute_image(src: &str) -> String {
    if src.starts_with("//") {
        format!("https:{}", src)
    } else {
        src.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NO_RATING;

    fn board_url() -> Url {
        Url::parse("https://www.maoyan.com/board/1").unwrap()
    }

    fn parse(html: &str) -> Vec<ItemExtract> {
        BoardContract::default().compile().unwrap().parse_items(html, &board_url())
    }

    #[test]
    fn fixture_board() {
        let html = std::fs::read_to_string("tests/fixtures/board.html").unwrap();
        let items = parse(&html);
        assert_eq!(items.len(), 3);

        let first = &items[0].listing;
        assert_eq!(first.title, "Movie A");
        assert_eq!(first.rating.as_ref().map(|r| r.to_string()).as_deref(), Some("8.5"));
        assert_eq!(first.image, "https://img.example/a.jpg");
        assert!(first.detail_link.is_none());

        let second = &items[1].listing;
        assert_eq!(second.title, UNKNOWN);
        assert!(second.rating.is_none());
        assert_eq!(second.image, "");

        let third = &items[2].listing;
        assert_eq!(third.title, "Movie C");
        assert_eq!(third.image, "https://img.example/c.jpg");
        assert_eq!(
            third.detail_link.as_ref().map(Url::as_str),
            Some("https://www.maoyan.com/films/1234")
        );
        assert!(items.iter().all(|i| i.issues.is_empty()));
    }

    #[test]
    fn partial_rating_is_no_rating() {
        let html = r#"<dl>
            <dd><p class="name">Only Int</p><i class="integer">7.</i></dd>
            <dd><p class="name">Only Frac</p><i class="fraction">3</i></dd>
        </dl>"#;
        let items = parse(html);
        assert_eq!(items.len(), 2);
        for item in &items {
            assert!(item.listing.rating.is_none());
            let rec = crate::model::EnrichedRecord::merge(item.listing.clone(), None);
            assert_eq!(rec.rating, NO_RATING);
        }
    }

    #[test]
    fn image_prefers_data_src() {
        let html = r#"<dl><dd>
            <img class="board-img" data-src="//cdn.example/p.jpg" src="/placeholder.png">
        </dd></dl>"#;
        let items = parse(html);
        assert_eq!(items[0].listing.image, "https://cdn.example/p.jpg");
    }

    #[test]
    fn image_normalization() {
        assert_eq!(absolute_image("//img.example/a.jpg"), "https://img.example/a.jpg");
        assert_eq!(absolute_image("http://img.example/a.jpg"), "http://img.example/a.jpg");
        assert_eq!(absolute_image("/local.jpg"), "/local.jpg");
    }

    #[test]
    fn unresolvable_link_is_an_issue_not_a_failure() {
        let html = r#"<dl><dd><p class="name"><a href="http://[bad">Broken</a></p></dd></dl>"#;
        let items = parse(html);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].listing.title, "Broken");
        assert!(items[0].listing.detail_link.is_none());
        assert!(matches!(items[0].issues[..], [ExtractionError::DetailLink { .. }]));
    }

    #[test]
    fn non_page_links_are_rejected() {
        let html = r##"<dl>
            <dd><p class="name"><a href="javascript:void(0)">Script</a></p></dd>
            <dd><p class="name"><a href="mailto:box@maoyan.com">Mail</a></p></dd>
            <dd><p class="name"><a href="#">Anchor</a></p></dd>
            <dd><p class="name"><a href="/films/42#cast">Real</a></p></dd>
        </dl>"##;
        let items = parse(html);
        assert_eq!(items.len(), 4);
        for item in &items[..3] {
            assert!(item.listing.detail_link.is_none(), "{}", item.listing.title);
            assert!(matches!(item.issues[..], [ExtractionError::DetailLink { .. }]));
        }
        assert_eq!(
            items[3].listing.detail_link.as_ref().map(Url::as_str),
            Some("https://www.maoyan.com/films/42#cast")
        );
        assert!(items[3].issues.is_empty());
    }

    #[test]
    fn no_items() {
        assert!(parse("<html><body><p>maintenance</p></body></html>").is_empty());
        assert!(parse("").is_empty());
    }
}
