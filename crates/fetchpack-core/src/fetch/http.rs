//! libcurl-backed [`Fetcher`]: one `Easy` handle per GET, body streamed to the sink.

use curl::easy::Easy;
use std::io::{self, Write};

use super::{validate_url, FetchError, Fetcher};
use crate::config::HttpConfig;
use crate::control::CancelToken;

/// Runs each GET on the calling thread with the limits from [`HttpConfig`].
/// Call from a blocking context (worker thread or `spawn_blocking`).
#[derive(Debug, Clone, Default)]
pub struct CurlFetcher {
    http: HttpConfig,
}

impl CurlFetcher {
    pub fn new(http: HttpConfig) -> Self {
        Self { http }
    }

    fn configure(&self, easy: &mut Easy, url: &str) -> Result<(), curl::Error> {
        easy.url(url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.http.max_redirections)?;
        // HTTP >= 400 fails the transfer before any body reaches the sink.
        easy.fail_on_error(true)?;
        easy.connect_timeout(self.http.connect_timeout())?;
        if let Some(timeout) = self.http.timeout() {
            easy.timeout(timeout)?;
        }
        easy.low_speed_limit(self.http.low_speed_limit)?;
        easy.low_speed_time(self.http.low_speed_time())?;
        if let Some(agent) = &self.http.user_agent {
            easy.useragent(agent)?;
        }
        // Needed for the progress callback that polls the cancel token.
        easy.progress(true)?;
        Ok(())
    }
}

impl Fetcher for CurlFetcher {
    fn fetch_to_writer(
        &self,
        url: &str,
        sink: &mut dyn Write,
        cancel: &CancelToken,
    ) -> Result<u64, FetchError> {
        validate_url(url)?;
        if cancel.is_cancelled() {
            return Err(FetchError::Aborted {
                url: url.to_string(),
            });
        }
        let transport = |source: curl::Error| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let mut easy = Easy::new();
        self.configure(&mut easy, url).map_err(transport)?;

        let mut written: u64 = 0;
        let mut write_error: Option<io::Error> = None;
        let performed = {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| match sink.write_all(data) {
                    Ok(()) => {
                        written += data.len() as u64;
                        Ok(data.len())
                    }
                    Err(e) => {
                        write_error = Some(e);
                        Ok(0) // abort transfer
                    }
                })
                .map_err(transport)?;
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(transport)?;
            transfer.perform()
        };

        if let Some(source) = write_error {
            return Err(FetchError::Write {
                url: url.to_string(),
                source,
            });
        }
        if let Err(e) = performed {
            if e.is_aborted_by_callback() {
                return Err(FetchError::Aborted {
                    url: url.to_string(),
                });
            }
            if e.is_http_returned_error() {
                let status = easy.response_code().unwrap_or(0);
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status,
                });
            }
            return Err(transport(e));
        }

        let status = easy.response_code().map_err(transport)?;
        if !(200..300).contains(&status) {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        sink.flush().map_err(|source| FetchError::Write {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!(url, status, bytes = written, "GET complete");
        Ok(written)
    }
}
