//! Downloader: fetch one URL into the staging directory at most once.
//!
//! An existing file under the final name counts as downloaded and is reused
//! without a request. Otherwise the body is streamed into a part file that is
//! renamed on success and removed on failure (see [`crate::storage`]).

use std::path::{Path, PathBuf};

use crate::control::CancelToken;
use crate::fetch::{FetchError, Fetcher};
use crate::storage::PartFile;

/// What `download` did for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    /// The staged file already existed; nothing was fetched.
    AlreadyPresent,
    /// The body was fetched and stored.
    Fetched { bytes: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(FetchError),
    #[error("staging {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("download of {url} cancelled")]
    Cancelled { url: String },
}

impl DownloadError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadError::Cancelled { .. })
    }
}

/// Downloads `url` to `staging_dir/filename` unless that file already exists.
pub fn download(
    fetcher: &dyn Fetcher,
    url: &str,
    staging_dir: &Path,
    filename: &str,
    cancel: &CancelToken,
) -> Result<DownloadStatus, DownloadError> {
    let final_path = staging_dir.join(filename);
    if final_path.exists() {
        tracing::info!(file = filename, "file already exists, skipping download");
        return Ok(DownloadStatus::AlreadyPresent);
    }

    let mut part = PartFile::create(&final_path).map_err(|source| DownloadError::Storage {
        path: final_path.clone(),
        source,
    })?;

    let bytes = match fetcher.fetch_to_writer(url, &mut part, cancel) {
        Ok(n) => n,
        Err(e) => {
            part.discard();
            return Err(match e {
                FetchError::Aborted { url } => DownloadError::Cancelled { url },
                other => DownloadError::Fetch(other),
            });
        }
    };

    let temp = part.temp_path().to_path_buf();
    part.finalize().map_err(|source| {
        let _ = std::fs::remove_file(&temp);
        DownloadError::Storage {
            path: final_path.clone(),
            source,
        }
    })?;

    tracing::info!(url, file = filename, bytes, "downloaded");
    Ok(DownloadStatus::Fetched { bytes })
}
