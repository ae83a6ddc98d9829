//! Staged file lifecycle.
//!
//! A download is written to `<final>.part` and only renamed to its final name
//! once the body was fully written and synced. On failure the part file is
//! removed, so a file under its final name is always complete.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` to the final path (e.g. `a.zip` → `a.zip.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Buffered writer for one staged download.
pub struct PartFile {
    writer: BufWriter<File>,
    temp_path: PathBuf,
    final_path: PathBuf,
}

impl PartFile {
    /// Create (or truncate a stale) `<final_path>.part`.
    pub fn create(final_path: &Path) -> io::Result<Self> {
        let temp_path = temp_path(final_path);
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        Ok(PartFile {
            writer: BufWriter::with_capacity(64 * 1024, file),
            temp_path,
            final_path: final_path.to_path_buf(),
        })
    }

    /// Path to the current temp file.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// Flush, sync and atomically rename the temp file to the final path.
    pub fn finalize(self) -> io::Result<PathBuf> {
        let PartFile {
            writer,
            temp_path,
            final_path,
        } = self;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        std::fs::rename(&temp_path, &final_path)?;
        Ok(final_path)
    }

    /// Close and delete the temp file. A missing file is not an error.
    pub fn discard(self) {
        let PartFile {
            writer, temp_path, ..
        } = self;
        drop(writer);
        match std::fs::remove_file(&temp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                file = %temp_path.display(),
                "could not remove part file: {}",
                e
            ),
        }
    }
}

impl Write for PartFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}
