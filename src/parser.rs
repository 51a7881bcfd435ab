// 🏗️ Tabular Parser - CSV text → positional records
// Row 0 is kept as-is: it is the header and downstream code skips it.

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::error::{ReconError, Result};
use crate::schema::Source;

/// One row of a tabular source, addressed by position
pub type Record = Vec<String>;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// ============================================================================
// LEDGER FILE
// ============================================================================

/// LedgerFile - a parsed table from one source
///
/// The JSON shape (`name`, `content`, `source`) is shared with the
/// local-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerFile {
    pub name: String,

    /// Header row followed by data rows
    #[serde(rename = "content")]
    pub rows: Vec<Record>,

    pub source: Source,
}

impl LedgerFile {
    pub fn new(name: impl Into<String>, rows: Vec<Record>, source: Source) -> Self {
        LedgerFile {
            name: name.into(),
            rows,
            source,
        }
    }

    pub fn header(&self) -> Option<&Record> {
        self.rows.first()
    }

    /// All rows after the header
    pub fn data_rows(&self) -> &[Record] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn data_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

// ============================================================================
// PARSING
// ============================================================================

/// Parse delimited text into a LedgerFile
///
/// Rows may have different lengths; a leading byte-order mark is dropped.
pub fn parse_ledger<R: Read>(mut reader: R, name: &str, source: Source) -> Result<LedgerFile> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(&bytes[..]);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(body);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| ReconError::Parse {
            name: name.to_string(),
            source: err,
        })?;
        rows.push(record.iter().map(str::to_string).collect::<Record>());
    }

    debug!(file = name, source = %source, rows = rows.len(), "parsed ledger");

    Ok(LedgerFile::new(name, rows, source))
}

pub fn parse_ledger_str(text: &str, name: &str, source: Source) -> Result<LedgerFile> {
    parse_ledger(text.as_bytes(), name, source)
}

/// Open and parse a file from disk
pub fn load_ledger(path: &Path, source: Source) -> Result<LedgerFile> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown.csv")
        .to_string();

    let file = File::open(path)?;
    parse_ledger(file, &name, source)
}

/// Parse a whole upload batch; the first failure aborts the batch
pub fn load_ledgers<P: AsRef<Path>>(paths: &[P], source: Source) -> Result<Vec<LedgerFile>> {
    paths
        .iter()
        .map(|path| load_ledger(path.as_ref(), source))
        .collect()
}
