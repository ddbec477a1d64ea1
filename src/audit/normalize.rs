//! Header cleanup and column role resolution.

use std::collections::HashMap;
use std::path::Path;

use crate::config::ColumnSynonyms;
use crate::error::AuditError;

/// Canonical form of a header: BOM removed, every whitespace run (newlines and
/// non-breaking spaces included) collapsed to one space, trimmed, lower-cased.
pub fn normalize_header(raw: &str) -> String {
    raw.replace('\u{feff}', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Spreadsheet artifacts for unlabeled columns (`Unnamed: 3`, empty headers).
pub fn is_placeholder(raw: &str) -> bool {
    let name = normalize_header(raw);
    name.is_empty() || name.starts_with("unnamed")
}

/// Equipment type for a file stem: trimmed, inner whitespace replaced by `_`.
pub fn equipment_type_from_stem(stem: &str) -> String {
    stem.trim()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

pub fn equipment_type_from_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    equipment_type_from_stem(stem)
}

/// Drops placeholder headers and normalizes the rest.
///
/// Returns `(source index, canonical name)` pairs. A name seen twice gets a
/// `.1`, `.2`, ... suffix so both columns stay addressable.
pub fn normalize_headers(raw: &[String]) -> Vec<(usize, String)> {
    suffixed_headers(raw)
        .into_iter()
        .map(|header| (header.index, header.name))
        .collect()
}

/// A kept header with its suffixed name and the canonical name it came from.
struct NamedHeader {
    index: usize,
    base: String,
    name: String,
}

fn suffixed_headers(raw: &[String]) -> Vec<NamedHeader> {
    let mut seen: HashMap<String, usize> = HashMap::new();

    raw.iter()
        .enumerate()
        .filter(|(_, h)| !is_placeholder(h))
        .map(|(index, h)| {
            let base = normalize_header(h);
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base.clone()
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            NamedHeader { index, base, name }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Location,
    /// Identifiers and derived columns that are never checked.
    Structural,
    Attribute,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Position of the cell in the raw row.
    pub index: usize,
    pub name: String,
    pub role: ColumnRole,
}

/// Resolved columns of one dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub columns: Vec<Column>,
    pub location: usize,
    pub identifier: Option<usize>,
    pub description: Option<usize>,
}

impl ColumnLayout {
    /// Normalizes `headers` and assigns each surviving column a role.
    ///
    /// Roles follow the unsuffixed name, so a repeated `ASDU` or `Emplacement`
    /// column stays structural. Only the first location column is read.
    ///
    /// # Errors
    ///
    /// [`AuditError::MissingRequiredColumn`] when no header matches a location
    /// synonym.
    pub fn resolve(
        file: &str,
        headers: &[String],
        synonyms: &ColumnSynonyms,
    ) -> Result<Self, AuditError> {
        let named = suffixed_headers(headers);

        let find = |candidates: &[String]| {
            candidates.iter().find_map(|candidate| {
                named
                    .iter()
                    .find(|h| &h.name == candidate)
                    .map(|h| h.index)
            })
        };

        let location = find(&synonyms.location).ok_or_else(|| {
            AuditError::MissingRequiredColumn {
                file: file.to_string(),
                candidates: synonyms.location.join(", "),
            }
        })?;
        let identifier = find(&synonyms.identifier);
        let description = find(&synonyms.description);

        let columns = named
            .into_iter()
            .map(|NamedHeader { index, base, name }| {
                let role = if index == location {
                    ColumnRole::Location
                } else if synonyms.location.contains(&base)
                    || synonyms.ignored.contains(&base)
                    || synonyms.site.contains(&base)
                {
                    ColumnRole::Structural
                } else {
                    ColumnRole::Attribute
                };
                Column { index, name, role }
            })
            .collect();

        Ok(Self {
            columns,
            location,
            identifier,
            description,
        })
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Column> {
        self.columns
            .iter()
            .filter(|c| c.role == ColumnRole::Attribute)
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes().count()
    }
}
