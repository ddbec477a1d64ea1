//! Per-dataset extraction of missing attribute values.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::audit::normalize::ColumnLayout;
use crate::audit::types::{EquipmentRecord, MissingAttributeEntry};
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::parser::RawDataset;

/// Records of one equipment table, ready to be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedDataset {
    pub file_name: String,
    pub equipment_type: String,
    /// Attribute columns checked on every record of this table.
    pub checked_attributes: usize,
    pub records: Vec<EquipmentRecord>,
    /// Rows skipped because their location was blank.
    pub dropped_records: u64,
}

impl ExtractedDataset {
    /// Builds one [`EquipmentRecord`] per row with an attributable location.
    ///
    /// Attribute names are prefixed with the equipment type so that generic
    /// names such as `description` stay distinct across tables.
    ///
    /// # Errors
    ///
    /// [`AuditError::MissingRequiredColumn`] when the table has no location
    /// column.
    #[tracing::instrument(skip_all, fields(file = %dataset.file_name))]
    pub fn extract(dataset: &RawDataset, config: &AuditConfig) -> Result<Self, AuditError> {
        let equipment_type = dataset.equipment_type();
        let layout = ColumnLayout::resolve(&dataset.file_name, &dataset.headers, &config.columns)?;

        let cell = |row: &[String], index: usize| -> Option<String> {
            row.get(index)
                .map(|v| v.trim())
                .filter(|v| !config.is_empty_token(v))
                .map(str::to_string)
        };

        let mut records = Vec::with_capacity(dataset.rows.len());
        let mut dropped_records = 0u64;

        for row in &dataset.rows {
            let Some(location) = cell(row, layout.location) else {
                dropped_records += 1;
                continue;
            };

            let site: String = location.chars().take(config.site_prefix_len).collect();

            let attribute_values: BTreeMap<String, Option<String>> = layout
                .attributes()
                .map(|c| (format!("{}_{}", equipment_type, c.name), cell(row, c.index)))
                .collect();

            let label = layout
                .identifier
                .and_then(|i| cell(row, i))
                .or_else(|| layout.description.and_then(|i| cell(row, i)))
                .unwrap_or_else(|| location.clone());

            records.push(EquipmentRecord {
                location,
                site,
                equipment_type: equipment_type.clone(),
                label,
                attribute_values,
            });
        }

        if dropped_records > 0 {
            warn!(dropped_records, "Rows without location were dropped");
        }
        debug!(
            equipment_type = %equipment_type,
            records = records.len(),
            checked_attributes = layout.attribute_count(),
            "Dataset extracted"
        );

        Ok(Self {
            file_name: dataset.file_name.clone(),
            equipment_type,
            checked_attributes: layout.attribute_count(),
            records,
            dropped_records,
        })
    }

    /// One entry per absent value, in record order. Restartable: every call
    /// yields the same sequence.
    pub fn missing_entries(&self) -> impl Iterator<Item = MissingAttributeEntry> + '_ {
        self.records.iter().flat_map(|record| {
            record
                .missing_attributes()
                .map(move |attribute| MissingAttributeEntry {
                    site: record.site.clone(),
                    equipment_type: record.equipment_type.clone(),
                    attribute: attribute.to_string(),
                    location: record.location.clone(),
                    label: record.label.clone(),
                })
        })
    }
}
