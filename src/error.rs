use std::path::PathBuf;

/// Failures while obtaining a document. Never escapes a board or detail fetch.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("could not start rendering context: {reason}")]
    ResourceInit { reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} did not respond within {secs:.1}s")]
    Timeout { url: String, secs: f64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid selector for {field} ({selector:?}): {reason}")]
    InvalidSelector {
        field: String,
        selector: String,
        reason: String,
    },

    #[error("detail link {href:?} could not be resolved: {reason}")]
    DetailLink { href: String, reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("unknown template placeholder {{{{ {name} }}}}")]
    UnknownPlaceholder { name: String },

    #[error("template references unknown board {key:?}")]
    UnknownBoard { key: String },

    #[error("could not read template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
