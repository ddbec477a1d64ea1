//! Delimited-text parser for GMAO equipment exports.

use csv::ReaderBuilder;

use crate::audit::normalize::equipment_type_from_file_name;
use crate::error::AuditError;

/// One equipment table as read from disk, before any normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataset {
    pub file_name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawDataset {
    pub fn new(file_name: impl Into<String>, headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            file_name: file_name.into(),
            headers,
            rows,
        }
    }

    pub fn equipment_type(&self) -> String {
        equipment_type_from_file_name(&self.file_name)
    }
}

/// Extensions of native spreadsheet workbooks found next to the CSV exports.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];

/// True when `file_name` is a spreadsheet workbook rather than delimited text.
pub fn is_spreadsheet(file_name: &str) -> bool {
    std::path::Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            SPREADSHEET_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s))
        })
}

/// Picks `;` or tab from the header record, counting only separators outside
/// double quotes. A quoted header may span several physical lines.
/// French spreadsheet exports default to `;`, so it wins a tie with `,`.
pub fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let (mut commas, mut semicolons, mut tabs) = (0usize, 0usize, 0usize);
    let mut quoted = false;

    for &b in bytes {
        match b {
            b'"' => quoted = !quoted,
            _ if quoted => {}
            b'\n' => break,
            b',' => commas += 1,
            b';' => semicolons += 1,
            b'\t' => tabs += 1,
            _ => {}
        }
    }

    if semicolons > 0 && semicolons >= commas && semicolons >= tabs {
        b';'
    } else if tabs > commas {
        b'\t'
    } else {
        b','
    }
}

/// Cells are UTF-8 when valid, Windows-1252 otherwise (the code page of
/// French Excel exports, a superset of Latin-1's printable range).
fn decode_cell(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => encoding_rs::WINDOWS_1252
            .decode_without_bom_handling(bytes)
            .0
            .into_owned(),
    }
}

/// Parses a header row followed by data rows.
///
/// Rows may be shorter or longer than the header. `delimiter` overrides
/// [`sniff_delimiter`].
///
/// # Errors
///
/// [`AuditError::SourceUnreadable`] when the input is a spreadsheet workbook,
/// has no header row or is not well-formed delimited text.
pub fn parse_dataset(
    file_name: &str,
    bytes: &[u8],
    delimiter: Option<u8>,
) -> Result<RawDataset, AuditError> {
    let unreadable = |reason: String| AuditError::SourceUnreadable {
        file: file_name.to_string(),
        reason,
    };

    // xlsx/xlsm are zip containers, legacy xls is an OLE compound file
    if is_spreadsheet(file_name)
        || bytes.starts_with(b"PK\x03\x04")
        || bytes.starts_with(b"\xd0\xcf\x11\xe0")
    {
        return Err(unreadable(
            "spreadsheet workbook not supported, export the sheet as CSV".into(),
        ));
    }

    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(bytes));
    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = rdr
        .byte_headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(decode_cell)
        .collect();

    if headers.is_empty() {
        return Err(unreadable("no header row".into()));
    }

    let mut rows = Vec::new();
    for result in rdr.byte_records() {
        let record = result.map_err(|e| unreadable(e.to_string()))?;
        rows.push(record.iter().map(decode_cell).collect());
    }

    Ok(RawDataset::new(file_name, headers, rows))
}
