//! Extraction error type.

use super::ArchiveFormat;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unsupported archive format (no zip, tar, gzip or bzip2 signature)")]
    UnsupportedFormat,

    #[error("corrupt {format} stream: {reason}")]
    Corrupt {
        format: ArchiveFormat,
        reason: String,
    },

    #[error("invalid zip archive: {0}")]
    InvalidZip(String),

    #[error("zip extraction failed: {0}")]
    ZipExtraction(String),

    #[error("{format} extraction failed: {reason}")]
    TarExtraction {
        format: ArchiveFormat,
        reason: String,
    },
}
