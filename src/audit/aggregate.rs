use std::collections::{BTreeMap, BTreeSet};

use crate::audit::extract::ExtractedDataset;
use crate::audit::types::{
    Diagnostics, MissingAttributeEntry, SiteInventory, SiteSynthesis, SkippedSource,
};
use crate::error::AuditError;

/// Per-site inventory: site, then equipment type.
pub type Inventory = BTreeMap<String, BTreeMap<String, SiteInventory>>;

/// Partial result of a run, combined with [`AuditAccumulator::merge`].
///
/// Merging is associative and commutative: the detail table is kept sorted,
/// counts are summed and diagnostics are sorted, so any merge order over the
/// same datasets produces equal accumulators.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditAccumulator {
    detail: Vec<MissingAttributeEntry>,
    inventory: Inventory,
    diagnostics: Diagnostics,
}

impl AuditAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(dataset: &ExtractedDataset) -> Self {
        let mut acc = Self::new();
        acc.absorb(dataset);
        acc
    }

    pub fn from_skipped(file: &str, error: &AuditError) -> Self {
        let mut acc = Self::new();
        acc.record_skip(file, error);
        acc
    }

    /// Adds the records and missing entries of one extracted table.
    pub fn absorb(&mut self, dataset: &ExtractedDataset) {
        self.diagnostics.accepted_sources += 1;

        if dataset.dropped_records > 0 {
            *self
                .diagnostics
                .dropped_records
                .entry(dataset.file_name.clone())
                .or_default() += dataset.dropped_records;
        }

        for record in &dataset.records {
            self.inventory
                .entry(record.site.clone())
                .or_default()
                .entry(record.equipment_type.clone())
                .or_default()
                .merge(SiteInventory {
                    records: 1,
                    checked_attributes: record.attribute_values.len() as u64,
                });
        }

        self.detail.extend(dataset.missing_entries());
        self.detail.sort();
    }

    pub fn record_skip(&mut self, file: &str, error: &AuditError) {
        self.diagnostics.skipped_sources.push(SkippedSource {
            file: file.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
        });
        self.diagnostics.skipped_sources.sort();
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.detail.extend(other.detail);
        self.detail.sort();

        for (site, types) in other.inventory {
            let entry = self.inventory.entry(site).or_default();
            for (equipment_type, inv) in types {
                entry.entry(equipment_type).or_default().merge(inv);
            }
        }

        self.diagnostics.merge(other.diagnostics);
        self
    }

    pub fn accepted_sources(&self) -> usize {
        self.diagnostics.accepted_sources
    }

    pub fn finish(self) -> Aggregation {
        let synthesis = synthesize(&self.detail);
        Aggregation {
            detail: self.detail,
            synthesis,
            inventory: self.inventory,
            diagnostics: self.diagnostics,
        }
    }
}

/// Merged output of every accepted dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// Sorted by site, type, attribute, location, label.
    pub detail: Vec<MissingAttributeEntry>,
    pub synthesis: Vec<SiteSynthesis>,
    pub inventory: Inventory,
    pub diagnostics: Diagnostics,
}

impl Aggregation {
    pub fn equipment_types(&self) -> BTreeSet<&str> {
        self.inventory
            .values()
            .flat_map(|types| types.keys().map(String::as_str))
            .collect()
    }
}

/// Groups detail entries by site, collecting distinct attributes and types.
/// An empty detail table yields an empty synthesis.
pub fn synthesize(detail: &[MissingAttributeEntry]) -> Vec<SiteSynthesis> {
    let mut groups: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();

    for entry in detail {
        let (attributes, types) = groups.entry(entry.site.as_str()).or_default();
        attributes.insert(entry.attribute.as_str());
        types.insert(entry.equipment_type.as_str());
    }

    groups
        .into_iter()
        .map(|(site, (attributes, types))| SiteSynthesis {
            site: site.to_string(),
            missing_attributes: attributes.into_iter().map(str::to_string).collect(),
            equipment_types: types.into_iter().map(str::to_string).collect(),
        })
        .collect()
}
