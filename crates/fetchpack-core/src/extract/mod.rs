//! Extractor: expand one staged archive into its output directory.
//!
//! The format is sniffed from the file's leading bytes rather than trusted
//! from the URL tail. Compressed streams (gzip, bzip2) are peeked after
//! decompression to tell a tarball from a single compressed file.

mod error;

pub use error::ExtractError;

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

const ZIP_LOCAL_HEADER: &[u8] = b"PK\x03\x04";
const ZIP_EMPTY_ARCHIVE: &[u8] = b"PK\x05\x06";
const GZIP_MAGIC: &[u8] = &[0x1f, 0x8b];
const BZIP2_MAGIC: &[u8] = b"BZh";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;
const TAR_BLOCK: usize = 512;
const READ_BUF: usize = 1024 * 1024;

/// Archive formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    TarBz2,
    /// A single gzip-compressed file.
    Gzip,
    /// A single bzip2-compressed file.
    Bzip2,
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::Tar => "tar",
            ArchiveFormat::TarGz => "tar.gz",
            ArchiveFormat::TarBz2 => "tar.bz2",
            ArchiveFormat::Gzip => "gzip",
            ArchiveFormat::Bzip2 => "bzip2",
        })
    }
}

fn read_prefix(reader: impl Read, len: usize) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(len);
    reader.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

fn is_tar_header(block: &[u8]) -> bool {
    block.len() >= TAR_MAGIC_OFFSET + TAR_MAGIC.len()
        && &block[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len()] == TAR_MAGIC
}

fn open_buffered(path: &Path) -> io::Result<BufReader<File>> {
    Ok(BufReader::with_capacity(READ_BUF, File::open(path)?))
}

// Multi-member decoders: pigz/pbzip2 output and concatenated streams are
// read to the end instead of stopping after the first member.
fn gz_reader(path: &Path) -> io::Result<flate2::read::MultiGzDecoder<BufReader<File>>> {
    Ok(flate2::read::MultiGzDecoder::new(open_buffered(path)?))
}

fn bz_reader(path: &Path) -> io::Result<bzip2::read::MultiBzDecoder<BufReader<File>>> {
    Ok(bzip2::read::MultiBzDecoder::new(open_buffered(path)?))
}

/// Sniffs the archive format of the file at `path`.
///
/// Only leading magic is checked: a zip must start with a local file header
/// (or be an empty archive), and a tar needs the POSIX `ustar` magic. Zips
/// with a prepended stub (self-extractors) and pre-POSIX V7 tars are reported
/// as [`ExtractError::UnsupportedFormat`].
pub fn detect_format(path: &Path) -> Result<ArchiveFormat, ExtractError> {
    let head = read_prefix(File::open(path)?, TAR_BLOCK)?;

    if head.starts_with(ZIP_LOCAL_HEADER) || head.starts_with(ZIP_EMPTY_ARCHIVE) {
        return Ok(ArchiveFormat::Zip);
    }
    if head.starts_with(GZIP_MAGIC) {
        let inner = read_prefix(gz_reader(path)?, TAR_BLOCK).map_err(|e| {
            ExtractError::Corrupt {
                format: ArchiveFormat::Gzip,
                reason: e.to_string(),
            }
        })?;
        return Ok(if is_tar_header(&inner) {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Gzip
        });
    }
    if head.starts_with(BZIP2_MAGIC) {
        let inner = read_prefix(bz_reader(path)?, TAR_BLOCK).map_err(|e| {
            ExtractError::Corrupt {
                format: ArchiveFormat::Bzip2,
                reason: e.to_string(),
            }
        })?;
        return Ok(if is_tar_header(&inner) {
            ArchiveFormat::TarBz2
        } else {
            ArchiveFormat::Bzip2
        });
    }
    if is_tar_header(&head) {
        return Ok(ArchiveFormat::Tar);
    }
    Err(ExtractError::UnsupportedFormat)
}

/// Name for the single file inside a plain gzip/bzip2 stream: the archive
/// name minus its compression suffix, or with `.out` appended.
fn decompressed_name(archive: &Path, suffix: &str) -> String {
    let name = archive
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.strip_suffix(suffix) {
        Some(stem) if !stem.is_empty() => stem.to_string(),
        _ => format!("{}.out", name),
    }
}

fn unpack_tar(
    reader: impl Read,
    output_dir: &Path,
    format: ArchiveFormat,
) -> Result<(), ExtractError> {
    let mut archive = tar::Archive::new(reader);
    archive.set_overwrite(true);
    archive
        .unpack(output_dir)
        .map_err(|e| ExtractError::TarExtraction {
            format,
            reason: e.to_string(),
        })
}

fn unpack_single(
    mut reader: impl Read,
    target: &Path,
    format: ArchiveFormat,
) -> Result<(), ExtractError> {
    let mut out = File::create(target)?;
    io::copy(&mut reader, &mut out).map_err(|e| ExtractError::Corrupt {
        format,
        reason: e.to_string(),
    })?;
    Ok(())
}

fn unpack_zip(archive: &Path, output_dir: &Path) -> Result<(), ExtractError> {
    let mut zip = zip::ZipArchive::new(open_buffered(archive)?)
        .map_err(|e| ExtractError::InvalidZip(e.to_string()))?;
    zip.extract(output_dir)
        .map_err(|e| ExtractError::ZipExtraction(e.to_string()))
}

/// Extracts `archive` into `output_dir` (created if missing) and returns the
/// detected format. Existing entries are overwritten. On failure the archive
/// and whatever was already written stay in place.
pub fn extract_archive(archive: &Path, output_dir: &Path) -> Result<ArchiveFormat, ExtractError> {
    let format = detect_format(archive)?;
    fs::create_dir_all(output_dir)?;

    match format {
        ArchiveFormat::Zip => unpack_zip(archive, output_dir)?,
        ArchiveFormat::Tar => unpack_tar(open_buffered(archive)?, output_dir, format)?,
        ArchiveFormat::TarGz => unpack_tar(gz_reader(archive)?, output_dir, format)?,
        ArchiveFormat::TarBz2 => unpack_tar(bz_reader(archive)?, output_dir, format)?,
        ArchiveFormat::Gzip => unpack_single(
            gz_reader(archive)?,
            &output_dir.join(decompressed_name(archive, ".gz")),
            format,
        )?,
        ArchiveFormat::Bzip2 => unpack_single(
            bz_reader(archive)?,
            &output_dir.join(decompressed_name(archive, ".bz2")),
            format,
        )?,
    }

    tracing::debug!(
        archive = %archive.display(),
        output = %output_dir.display(),
        %format,
        "extracted"
    );
    Ok(format)
}
