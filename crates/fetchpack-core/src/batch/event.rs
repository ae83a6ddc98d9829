//! Progress events sent from the batch driver to its caller (e.g. the CLI).
//!
//! `position` is the 1-based index of the item in the full list and `total`
//! the list length, so `[position/total]` is what users see.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchEvent {
    /// About to read the item list.
    ListRequested { source: String },
    /// List read and pointer validated; `pending` items will be processed.
    Prepared { total: usize, pending: usize },
    ItemStarted {
        position: usize,
        total: usize,
        filename: String,
    },
    /// The staged file already existed; the download was skipped.
    AlreadyPresent {
        position: usize,
        total: usize,
        filename: String,
    },
    ItemCompleted {
        position: usize,
        total: usize,
        filename: String,
    },
    ItemFailed {
        position: usize,
        total: usize,
        url: String,
        reason: String,
    },
    ItemCancelled {
        position: usize,
        total: usize,
        filename: String,
    },
}
