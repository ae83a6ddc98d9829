//! Item naming: staged filename and extraction directory derived from the
//! item's position in the list and the tail of its URL.

/// Minimum width of the 1-based ordinal prefix.
const ORDINAL_WIDTH: usize = 4;

/// Returns everything after the last `/` of `url`, or the whole string when
/// there is no `/`. Query strings and fragments are kept as-is.
pub fn url_tail(url: &str) -> &str {
    match url.rfind('/') {
        Some(pos) => &url[pos + 1..],
        None => url,
    }
}

/// Staged filename for the item at 0-based `index`: `{index+1:04}__{tail}`.
///
/// The ordinal is padded to at least four digits and never truncated, so the
/// prefix alone keeps names unique within one list.
///
/// # Examples
///
/// - `item_filename(3, "http://x.test/a/report.zip")` → `"0004__report.zip"`
/// - `item_filename(9999, "http://x.test/f.bin")` → `"10000__f.bin"`
pub fn item_filename(index: usize, url: &str) -> String {
    format!(
        "{:0width$}__{}",
        index + 1,
        url_tail(url),
        width = ORDINAL_WIDTH
    )
}

/// Extraction subdirectory for a staged archive: every `.` becomes `_`.
pub fn extraction_dir_name(filename: &str) -> String {
    filename.replace('.', "_")
}
