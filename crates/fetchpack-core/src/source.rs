//! List source: where the newline-delimited URL list comes from.

use std::fmt;
use std::path::PathBuf;

use crate::fetch::{FetchError, Fetcher};

/// A list source is a remote `http(s)://` URL or a local file path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    Remote(String),
    Local(PathBuf),
}

impl ListSource {
    /// Classifies `s` by its prefix: `http://` or `https://` means remote,
    /// anything else is a filesystem path.
    pub fn parse(s: &str) -> Self {
        if s.starts_with("http://") || s.starts_with("https://") {
            ListSource::Remote(s.to_string())
        } else {
            ListSource::Local(PathBuf::from(s))
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, ListSource::Remote(_))
    }
}

impl fmt::Display for ListSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListSource::Remote(url) => f.write_str(url),
            ListSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("fetching list: {0}")]
    Fetch(#[from] FetchError),
    #[error("reading list {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Splits list content into item URLs: one per line, surrounding whitespace
/// (including `\r`) trimmed, empty lines dropped, order preserved.
pub fn split_items(content: &str) -> Vec<String> {
    content
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Reads the whole list once. No retries, no caching.
pub fn read_list(source: &ListSource, fetcher: &dyn Fetcher) -> Result<Vec<String>, SourceError> {
    let content = match source {
        ListSource::Remote(url) => fetcher.fetch_text(url)?,
        ListSource::Local(path) => {
            std::fs::read_to_string(path).map_err(|source| SourceError::Read {
                path: path.clone(),
                source,
            })?
        }
    };
    let items = split_items(&content);
    tracing::info!(source = %source, items = items.len(), "read item list");
    Ok(items)
}
