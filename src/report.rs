//! The report artifact and its read-only queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::audit::aggregate::Aggregation;
use crate::audit::score::{ScoringOptions, score_sites};
use crate::audit::tier::Tier;
use crate::audit::types::{
    CompletenessScore, Diagnostics, MissingAttributeEntry, ScoringMode, SiteMissingGroup,
    SiteSynthesis, TierScheme, UnknownTypePolicy,
};
use crate::config::AuditConfig;

pub const SCHEMA_VERSION: u8 = 1;

/// Detail, synthesis and completeness tables of one run, plus diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletenessReport {
    pub schema_version: u8,
    pub generated_at: DateTime<Utc>,
    pub scoring: ScoringMode,
    pub tiers: TierScheme,
    pub unknown_types: UnknownTypePolicy,
    pub detail: Vec<MissingAttributeEntry>,
    pub synthesis: Vec<SiteSynthesis>,
    pub completeness: Vec<CompletenessScore>,
    pub diagnostics: Diagnostics,
}

impl CompletenessReport {
    /// Scores the aggregation and records configuration gaps.
    pub fn assemble(aggregation: Aggregation, config: &AuditConfig) -> Self {
        let options = ScoringOptions::from(config);
        let completeness = score_sites(&aggregation, &config.expected, options);

        let Aggregation {
            detail,
            synthesis,
            inventory,
            mut diagnostics,
        } = aggregation;

        if options.mode.uses_table() {
            let observed = inventory
                .values()
                .flat_map(|types| types.keys().map(String::as_str));
            let gaps = config.expected.gaps(observed);
            for equipment_type in &gaps {
                warn!(
                    equipment_type = %equipment_type,
                    policy = ?options.unknown_types,
                    "Equipment type missing from expected attribute table"
                );
            }
            diagnostics.configuration_gaps = gaps.into_iter().collect();
        }

        Self {
            schema_version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            scoring: options.mode,
            tiers: options.tiers,
            unknown_types: options.unknown_types,
            detail,
            synthesis,
            completeness,
            diagnostics,
        }
    }

    /// `true` when no attribute is missing anywhere.
    pub fn is_empty_result(&self) -> bool {
        self.detail.is_empty()
    }

    /// Same tables and diagnostics, ignoring the generation timestamp.
    pub fn same_content(&self, other: &Self) -> bool {
        Self {
            generated_at: other.generated_at,
            ..self.clone()
        } == *other
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.completeness.iter().map(|s| s.site.as_str())
    }

    pub fn completeness_for_site(&self, site: &str) -> Option<&CompletenessScore> {
        self.completeness
            .binary_search_by(|s| s.site.as_str().cmp(site))
            .ok()
            .map(|i| &self.completeness[i])
    }

    pub fn synthesis_for_site(&self, site: &str) -> Option<&SiteSynthesis> {
        self.synthesis.iter().find(|s| s.site == site)
    }

    /// Missing attributes of each record at `site`, ordered by equipment type
    /// then record label.
    pub fn missing_for_site(&self, site: &str) -> Vec<SiteMissingGroup> {
        let mut groups: BTreeMap<(&str, &str, &str), Vec<String>> = BTreeMap::new();

        for entry in self.detail.iter().filter(|e| e.site == site) {
            groups
                .entry((
                    entry.equipment_type.as_str(),
                    entry.label.as_str(),
                    entry.location.as_str(),
                ))
                .or_default()
                .push(entry.attribute.clone());
        }

        groups
            .into_iter()
            .map(|((equipment_type, label, _), mut missing_attributes)| {
                missing_attributes.sort();
                SiteMissingGroup {
                    equipment_type: equipment_type.to_string(),
                    label: label.to_string(),
                    missing_attributes,
                }
            })
            .collect()
    }

    pub fn tier_counts(&self) -> BTreeMap<Tier, usize> {
        let mut counts = BTreeMap::new();
        for score in &self.completeness {
            *counts.entry(score.tier).or_default() += 1;
        }
        counts
    }
}
