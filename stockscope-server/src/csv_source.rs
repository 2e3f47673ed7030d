//! Shared CSV reading for the symbol directory and the report files.
//!
//! Upstream exports are UTF-8, usually with a byte-order mark.

use std::path::Path;

const UTF8_BOM: char = '\u{feff}';

/// Read a UTF-8 file, dropping a leading byte-order mark.
pub fn read_utf8(path: &Path) -> std::io::Result<String> {
    let text = std::fs::read_to_string(path)?;
    Ok(match text.strip_prefix(UTF8_BOM) {
        Some(rest) => rest.to_string(),
        None => text,
    })
}

/// CSV reader over in-memory text with a header row and trimmed cells.
pub fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes())
}
