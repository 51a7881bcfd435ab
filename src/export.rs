// 📤 Export - record grid → spreadsheet-friendly CSV
// Every cell quoted, quotes doubled, UTF-8 BOM up front so spreadsheet
// tools pick the right encoding.

use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::parser::Record;

const BOM: &str = "\u{feff}";

/// Serialize a grid of rows
pub fn to_csv_string(rows: &[Record]) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| std::io::Error::new(err.error().kind(), err.error().to_string()))?;

    // csv only writes what it was given, which is UTF-8
    let body = String::from_utf8_lossy(&bytes);
    Ok(format!("{}{}", BOM, body))
}

/// Write the grid to `path`, returning the number of rows written
pub fn export_to_path(rows: &[Record], path: &Path) -> Result<usize> {
    let content = to_csv_string(rows)?;
    fs::write(path, content)?;

    info!(path = %path.display(), rows = rows.len(), "exported rows");
    Ok(rows.len())
}
