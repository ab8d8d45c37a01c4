use std::fmt::Write as _;
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::error::RenderError;
use crate::model::{AggregateResult, BoardResult, EnrichedRecord, SourceKey};

pub const DEFAULT_TEMPLATE: &str = include_str!("../templates/index.html");
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_]+)(?:\s*:\s*([A-Za-z_]*))?\s*\}\}").unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Now,
    Boards,
    Board(SourceKey),
    DataJson,
}

/// A page template split into literal text and placeholders:
/// `{{ now }}`, `{{ boards }}`, `{{ board:<key> }}`, `{{ data_json }}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(text: &str) -> Result<Template, RenderError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER_RE.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            if whole.start() > last {
                segments.push(Segment::Literal(text[last..whole.start()].to_string()));
            }
            last = whole.end();

            let name = &caps[1];
            let arg = caps.get(2).map(|m| m.as_str());
            let segment = match (name, arg) {
                ("now", None) => Segment::Now,
                ("boards", None) => Segment::Boards,
                ("data_json", None) => Segment::DataJson,
                ("board", Some(key)) => Segment::Board(
                    SourceKey::parse(key).ok_or_else(|| RenderError::UnknownBoard {
                        key: key.to_string(),
                    })?,
                ),
                _ => {
                    return Err(RenderError::UnknownPlaceholder {
                        name: whole.as_str().trim_matches(|c| c == '{' || c == '}').trim().to_string(),
                    })
                }
            };
            segments.push(segment);
        }

        if last < text.len() {
            segments.push(Segment::Literal(text[last..].to_string()));
        }
        Ok(Template { segments })
    }

    /// The compiled-in page, or a template file from disk.
    pub fn load(path: Option<&Path>) -> Result<Template, RenderError> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| RenderError::TemplateRead {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::parse(&text)
            }
            None => Self::parse(DEFAULT_TEMPLATE),
        }
    }
}

/// Pure: same result and timestamp always give the same bytes.
pub fn render(result: &AggregateResult, generated_at: NaiveDateTime, template: &Template) -> String {
    let mut out = String::with_capacity(DEFAULT_TEMPLATE.len() + result.total_records() * 512);

    for segment in &template.segments {
        match segment {
            Segment::Literal(text) => out.push_str(text),
            Segment::Now => out.push_str(&generated_at.format(TIMESTAMP_FORMAT).to_string()),
            Segment::Boards => {
                for (key, board) in result.iter() {
                    write_board(&mut out, key, board);
                }
            }
            Segment::Board(key) => match result.get(*key) {
                Some(board) => write_board(&mut out, *key, board),
                None => write_board(
                    &mut out,
                    *key,
                    &BoardResult {
                        label: key.to_string(),
                        records: Vec::new(),
                    },
                ),
            },
            Segment::DataJson => out.push_str(&data_json(result)),
        }
    }
    out
}

pub fn write_output(path: &Path, html: &str) -> Result<(), RenderError> {
    std::fs::write(path, html.as_bytes()).map_err(|source| RenderError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn write_board(out: &mut String, key: SourceKey, board: &BoardResult) {
    let _ = writeln!(out, "<section class=\"board\" id=\"board-{}\">", key);
    let _ = writeln!(out, "  <h2>{}</h2>", escape_html(&board.label));
    if board.records.is_empty() {
        out.push_str("  <p class=\"empty\">Nothing collected for this board.</p>\n");
    } else {
        out.push_str("  <ol class=\"cards\">\n");
        for (i, record) in board.records.iter().enumerate() {
            write_card(out, i + 1, record);
        }
        out.push_str("  </ol>\n");
    }
    out.push_str("</section>\n");
}

fn write_card(out: &mut String, rank: usize, r: &EnrichedRecord) {
    let title = escape_html(&r.title);
    out.push_str("    <li class=\"card\">\n");
    if r.image.is_empty() {
        out.push_str("      <div class=\"poster\"></div>\n");
    } else {
        let _ = writeln!(
            out,
            "      <img class=\"poster\" src=\"{}\" alt=\"{}\" loading=\"lazy\" referrerpolicy=\"no-referrer\">",
            escape_html(&r.image),
            title
        );
    }
    out.push_str("      <div class=\"body\">\n");
    match &r.detail_link {
        Some(link) => {
            let _ = writeln!(
                out,
                "        <h3><span class=\"rank\">{}</span><a href=\"{}\">{}</a></h3>",
                rank,
                escape_html(link),
                title
            );
        }
        None => {
            let _ = writeln!(out, "        <h3><span class=\"rank\">{}</span>{}</h3>", rank, title);
        }
    }
    let _ = writeln!(out, "        <p class=\"rating\">{}</p>", escape_html(&r.rating));
    let _ = writeln!(
        out,
        "        <p class=\"people\"><span>Director</span>{}</p>",
        escape_html(&r.director)
    );
    let _ = writeln!(
        out,
        "        <p class=\"people\"><span>Starring</span>{}</p>",
        escape_html(&r.actors)
    );
    let _ = writeln!(out, "        <p class=\"summary\">{}</p>", escape_html(&r.summary));
    out.push_str("      </div>\n    </li>\n");
}

/// JSON for a `<script type="application/json">` body; `</` cannot close the tag early.
fn data_json(result: &AggregateResult) -> String {
    serde_json::to_string(result)
        .unwrap_or_else(|_| "{}".to_string())
        .replace("</", "<\\/")
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
