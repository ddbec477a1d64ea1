//! Data types shared by the extraction, aggregation and scoring stages.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::audit::tier::Tier;

/// How the expected attribute total of a site is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Every record contributes the table count of its type.
    #[default]
    PerRecord,
    /// Each distinct type present at the site contributes its table count once.
    PerType,
    /// Every record contributes the number of attribute columns checked in its
    /// source; the expected table is not consulted.
    ObservedColumns,
}

impl ScoringMode {
    /// `true` when the mode reads the expected attribute table.
    pub fn uses_table(self) -> bool {
        !matches!(self, ScoringMode::ObservedColumns)
    }
}

/// Threshold set used to turn a rate into a [`Tier`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum TierScheme {
    /// `< 87.5` critical, `87.5..=97.5` correct, `> 97.5` excellent.
    #[default]
    Weighted,
    /// `>= 90` excellent, `>= 70` correct, otherwise critical.
    Legacy,
}

/// Treatment of equipment types missing from the expected table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum UnknownTypePolicy {
    /// Unknown types add nothing to the denominator but their missing
    /// entries still count.
    #[default]
    CountAsZero,
    /// Unknown types are left out of both numerator and denominator.
    Exclude,
}

/// One row of an equipment table, after column normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentRecord {
    pub location: String,
    pub site: String,
    pub equipment_type: String,
    /// Human label: equipment number, else description, else location.
    pub label: String,
    /// Prefixed attribute name to value, `None` when absent.
    pub attribute_values: BTreeMap<String, Option<String>>,
}

impl EquipmentRecord {
    pub fn missing_attributes(&self) -> impl Iterator<Item = &str> {
        self.attribute_values
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(k, _)| k.as_str())
    }
}

/// A single absent attribute value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MissingAttributeEntry {
    pub site: String,
    pub equipment_type: String,
    pub attribute: String,
    pub location: String,
    pub label: String,
}

/// Distinct missing attributes and affected types for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSynthesis {
    pub site: String,
    pub missing_attributes: Vec<String>,
    pub equipment_types: Vec<String>,
}

impl SiteSynthesis {
    pub fn attributes_display(&self) -> String {
        self.missing_attributes.join(", ")
    }

    pub fn equipment_types_display(&self) -> String {
        self.equipment_types.join(", ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessScore {
    pub site: String,
    pub total_expected: u64,
    pub total_missing: u64,
    pub rate_percent: f64,
    pub tier: Tier,
}

/// Record count and checked-cell count for one `(site, equipment type)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteInventory {
    pub records: u64,
    pub checked_attributes: u64,
}

impl SiteInventory {
    pub fn merge(&mut self, other: SiteInventory) {
        self.records += other.records;
        self.checked_attributes += other.checked_attributes;
    }
}

/// A source that was left out of the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SkippedSource {
    pub file: String,
    pub kind: String,
    pub message: String,
}

/// Non-fatal events collected during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub accepted_sources: usize,
    pub skipped_sources: Vec<SkippedSource>,
    /// Rows without an attributable location, per source file.
    pub dropped_records: BTreeMap<String, u64>,
    /// Equipment types with no entry in the expected table.
    pub configuration_gaps: Vec<String>,
}

impl Diagnostics {
    pub fn merge(&mut self, other: Diagnostics) {
        self.accepted_sources += other.accepted_sources;
        self.skipped_sources.extend(other.skipped_sources);
        self.skipped_sources.sort();
        for (file, count) in other.dropped_records {
            *self.dropped_records.entry(file).or_default() += count;
        }
        self.configuration_gaps.extend(other.configuration_gaps);
        self.configuration_gaps.sort();
        self.configuration_gaps.dedup();
    }

    pub fn total_dropped_records(&self) -> u64 {
        self.dropped_records.values().sum()
    }
}

/// Missing attributes of one record, as shown for a selected site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteMissingGroup {
    pub equipment_type: String,
    pub label: String,
    pub missing_attributes: Vec<String>,
}
