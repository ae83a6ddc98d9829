//! Batch driver: read the list once, then download and extract every item
//! from the start pointer on.
//!
//! Only list acquisition, pointer validation and creating the two output
//! directories are fatal. Anything that goes wrong with a single item is
//! recorded in its [`ItemReport`] and the batch moves on.

mod event;
mod outcome;
mod pool;

pub use event::BatchEvent;
pub use outcome::{BatchSummary, ItemError, ItemOutcome, ItemReport};

use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use crate::control::CancelToken;
use crate::download::{download, DownloadStatus};
use crate::extract::extract_archive;
use crate::fetch::Fetcher;
use crate::naming::{extraction_dir_name, item_filename};
use crate::source::{read_list, ListSource, SourceError};

/// Subdirectory of the destination holding downloaded archives.
pub const STAGING_DIR_NAME: &str = "savedFiles";
/// Subdirectory of the destination holding one extracted tree per item.
pub const EXTRACTION_DIR_NAME: &str = "extractedFiles";

/// Everything a run needs, built once at startup.
#[derive(Debug, Clone)]
pub struct BatchPlan {
    pub source: ListSource,
    pub destination: PathBuf,
    /// 0-based index of the first item to process.
    pub start_pointer: usize,
    /// Items processed concurrently; 1 keeps the run strictly sequential.
    pub jobs: usize,
}

impl BatchPlan {
    pub fn new(source: ListSource, destination: impl Into<PathBuf>) -> Self {
        Self {
            source,
            destination: destination.into(),
            start_pointer: 0,
            jobs: 1,
        }
    }

    pub fn with_start_pointer(mut self, start_pointer: usize) -> Self {
        self.start_pointer = start_pointer;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }
}

/// On-disk layout under the destination root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchLayout {
    pub staging_dir: PathBuf,
    pub extraction_dir: PathBuf,
}

impl BatchLayout {
    pub fn under(destination: &Path) -> Self {
        Self {
            staging_dir: destination.join(STAGING_DIR_NAME),
            extraction_dir: destination.join(EXTRACTION_DIR_NAME),
        }
    }

    /// Creates both directories (and parents). Existing ones are reused.
    pub fn create(&self) -> Result<(), BatchError> {
        for dir in [&self.staging_dir, &self.extraction_dir] {
            std::fs::create_dir_all(dir).map_err(|source| BatchError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn staged_path(&self, filename: &str) -> PathBuf {
        self.staging_dir.join(filename)
    }

    pub fn extraction_path(&self, filename: &str) -> PathBuf {
        self.extraction_dir.join(extraction_dir_name(filename))
    }
}

/// Errors that abort the whole batch.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("error fetching file list from {list}: {source}")]
    List {
        list: String,
        #[source]
        source: SourceError,
    },
    #[error("start pointer {pointer} exceeds the number of items ({len})")]
    PointerOutOfRange { pointer: usize, len: usize },
    #[error("creating directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Shared, read-only state for processing items (sequentially or from workers).
pub(crate) struct ItemContext<'a> {
    fetcher: &'a dyn Fetcher,
    layout: &'a BatchLayout,
    cancel: &'a CancelToken,
    events: Option<&'a Sender<BatchEvent>>,
    total: usize,
}

impl ItemContext<'_> {
    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = self.events {
            // A caller that stopped listening does not stop the batch.
            let _ = tx.send(event);
        }
    }
}

/// Runs steps download → existence check → extract for one item.
fn run_item(ctx: &ItemContext<'_>, url: &str, filename: &str, position: usize) -> ItemOutcome {
    let status = match download(ctx.fetcher, url, &ctx.layout.staging_dir, filename, ctx.cancel) {
        Ok(status) => status,
        Err(e) if e.is_cancelled() => return ItemOutcome::Cancelled,
        Err(e) => return ItemOutcome::Failed(e.into()),
    };
    let reused = status == DownloadStatus::AlreadyPresent;
    if reused {
        ctx.emit(BatchEvent::AlreadyPresent {
            position,
            total: ctx.total,
            filename: filename.to_string(),
        });
    }

    let staged = ctx.layout.staged_path(filename);
    if !staged.exists() {
        return ItemOutcome::Failed(ItemError::MissingAfterDownload(staged));
    }

    match extract_archive(&staged, &ctx.layout.extraction_path(filename)) {
        Ok(format) => {
            tracing::info!(file = filename, %format, "extracted");
            ItemOutcome::Completed { reused }
        }
        Err(e) => ItemOutcome::Failed(e.into()),
    }
}

pub(crate) fn process_item(ctx: &ItemContext<'_>, index: usize, url: &str) -> ItemReport {
    let filename = item_filename(index, url);
    let position = index + 1;
    let total = ctx.total;

    let outcome = if ctx.cancel.is_cancelled() {
        ItemOutcome::Cancelled
    } else {
        tracing::info!(position, total, file = %filename, url, "processing item");
        ctx.emit(BatchEvent::ItemStarted {
            position,
            total,
            filename: filename.clone(),
        });
        run_item(ctx, url, &filename, position)
    };

    match &outcome {
        ItemOutcome::Completed { .. } => ctx.emit(BatchEvent::ItemCompleted {
            position,
            total,
            filename: filename.clone(),
        }),
        ItemOutcome::Failed(e) => {
            tracing::warn!(position, total, url, "item failed: {}", e);
            ctx.emit(BatchEvent::ItemFailed {
                position,
                total,
                url: url.to_string(),
                reason: e.to_string(),
            });
        }
        ItemOutcome::Cancelled => ctx.emit(BatchEvent::ItemCancelled {
            position,
            total,
            filename: filename.clone(),
        }),
    }

    ItemReport {
        index,
        url: url.to_string(),
        filename,
        outcome,
    }
}

/// Runs the whole batch described by `plan`.
///
/// Returns the per-item summary; `summary.processed()` is the number of items
/// that were downloaded (or reused) and extracted. Progress is reported on
/// `events` when given.
pub fn run_batch(
    fetcher: &dyn Fetcher,
    plan: &BatchPlan,
    cancel: &CancelToken,
    events: Option<&Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let list = plan.source.to_string();
    if let Some(tx) = events {
        let _ = tx.send(BatchEvent::ListRequested {
            source: list.clone(),
        });
    }
    tracing::info!(source = %list, "getting item list");

    let items = read_list(&plan.source, fetcher)
        .map_err(|source| BatchError::List { list, source })?;
    let total = items.len();
    if plan.start_pointer > total {
        return Err(BatchError::PointerOutOfRange {
            pointer: plan.start_pointer,
            len: total,
        });
    }

    let layout = BatchLayout::under(&plan.destination);
    layout.create()?;

    let ctx = ItemContext {
        fetcher,
        layout: &layout,
        cancel,
        events,
        total,
    };
    let pending = total - plan.start_pointer;
    ctx.emit(BatchEvent::Prepared { total, pending });
    tracing::info!(total, pending, jobs = plan.jobs, "preparing items");

    let reports = if plan.jobs > 1 && pending > 1 {
        pool::run_pool(&ctx, &items, plan.start_pointer, plan.jobs)
    } else {
        (plan.start_pointer..total)
            .map(|i| process_item(&ctx, i, &items[i]))
            .collect()
    };

    let summary = BatchSummary {
        total_items: total,
        start_pointer: plan.start_pointer,
        reports,
    };
    tracing::info!(
        candidates = summary.candidates(),
        processed = summary.processed(),
        failed = summary.failed(),
        cancelled = summary.cancelled(),
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests;
