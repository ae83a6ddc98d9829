//! HTTP transport seam.
//!
//! Everything that talks to the network goes through [`Fetcher`]: the list
//! source reader (whole body as text) and the downloader (body streamed into a
//! writer). [`CurlFetcher`] is the libcurl-backed implementation.

mod http;

pub use http::CurlFetcher;

use crate::control::CancelToken;
use std::io::Write;

/// Failure of a single GET.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The URL could not be parsed or uses a scheme we do not fetch.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Connection, DNS, TLS, timeout or other transport failure.
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },
    /// Server answered with a non-2xx status.
    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u32 },
    /// Writing the response body to the sink failed.
    #[error("writing body of {url} failed: {source}")]
    Write {
        url: String,
        #[source]
        source: std::io::Error,
    },
    /// The cancel token was set while the transfer was running.
    #[error("GET {url} aborted: batch cancelled")]
    Aborted { url: String },
}

/// Performs GET requests. Implementations must be usable from several worker
/// threads at once.
pub trait Fetcher: Send + Sync {
    /// Streams the body of `url` into `sink` and returns the number of bytes
    /// written. Non-2xx statuses are errors and write nothing.
    fn fetch_to_writer(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError>;

    /// Fetches the whole body of `url` as text (invalid UTF-8 is replaced).
    fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let mut body = Vec::new();
        self.fetch_to_writer(url, &mut body, &CancelToken::new())?;
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

/// Accepts only absolute `http`/`https` URLs.
pub(crate) fn validate_url(url: &str) -> Result<(), FetchError> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme {:?}", other),
        }),
    }
}
