//! Per-item results and the batch summary.

use std::path::PathBuf;

use crate::download::DownloadError;
use crate::extract::ExtractError;

/// Why an item did not complete.
#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("download failed: {0}")]
    Download(#[from] DownloadError),
    #[error("file does not exist after download: {}", .0.display())]
    MissingAfterDownload(PathBuf),
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Terminal state of one item.
#[derive(Debug)]
pub enum ItemOutcome {
    /// Downloaded (or reused) and extracted. `reused` is true when the staged
    /// file already existed and no request was made.
    Completed { reused: bool },
    Failed(ItemError),
    /// Not started, or aborted mid-transfer, because the batch was cancelled.
    Cancelled,
}

impl ItemOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ItemOutcome::Completed { .. })
    }
}

/// One candidate item and what happened to it.
#[derive(Debug)]
pub struct ItemReport {
    /// 0-based position in the item list.
    pub index: usize,
    pub url: String,
    pub filename: String,
    pub outcome: ItemOutcome,
}

/// Result of a whole batch run.
#[derive(Debug)]
pub struct BatchSummary {
    /// Number of entries in the item list.
    pub total_items: usize,
    pub start_pointer: usize,
    /// One report per candidate item (`start_pointer..total_items`), by index.
    pub reports: Vec<ItemReport>,
}

impl BatchSummary {
    /// Items that were both downloaded and extracted without error.
    pub fn processed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_completed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Failed(_)))
            .count()
    }

    pub fn cancelled(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| matches!(r.outcome, ItemOutcome::Cancelled))
            .count()
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled() > 0
    }

    /// Number of items the run was asked to handle.
    pub fn candidates(&self) -> usize {
        self.total_items - self.start_pointer
    }
}
