//! Per-site completeness scoring.

use std::collections::BTreeMap;
use tracing::debug;

use crate::audit::aggregate::Aggregation;
use crate::audit::tier::Tier;
use crate::audit::types::{
    CompletenessScore, ScoringMode, SiteInventory, TierScheme, UnknownTypePolicy,
};
use crate::audit::utility::completeness_rate;
use crate::config::{AuditConfig, ExpectedAttributeTable};

/// Strategy knobs for [`score_sites`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringOptions {
    pub mode: ScoringMode,
    pub tiers: TierScheme,
    pub unknown_types: UnknownTypePolicy,
}

impl From<&AuditConfig> for ScoringOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            mode: config.scoring,
            tiers: config.tiers,
            unknown_types: config.unknown_types,
        }
    }
}

impl ScoringOptions {
    fn includes(&self, table: &ExpectedAttributeTable, equipment_type: &str) -> bool {
        !(self.mode.uses_table()
            && self.unknown_types == UnknownTypePolicy::Exclude
            && !table.contains(equipment_type))
    }
}

/// Scores every site that has at least one record, sorted by site.
pub fn score_sites(
    aggregation: &Aggregation,
    table: &ExpectedAttributeTable,
    options: ScoringOptions,
) -> Vec<CompletenessScore> {
    let mut missing: BTreeMap<(&str, &str), u64> = BTreeMap::new();
    for entry in &aggregation.detail {
        *missing
            .entry((entry.site.as_str(), entry.equipment_type.as_str()))
            .or_default() += 1;
    }

    aggregation
        .inventory
        .iter()
        .map(|(site, types)| {
            let site_missing: BTreeMap<&str, u64> = types
                .keys()
                .map(|t| {
                    let count = missing.get(&(site.as_str(), t.as_str())).copied();
                    (t.as_str(), count.unwrap_or(0))
                })
                .collect();
            score_site(site, types, &site_missing, table, options)
        })
        .collect()
}

/// Scores one site from its inventory and its missing count per type.
pub fn score_site(
    site: &str,
    types: &BTreeMap<String, SiteInventory>,
    missing_by_type: &BTreeMap<&str, u64>,
    table: &ExpectedAttributeTable,
    options: ScoringOptions,
) -> CompletenessScore {
    let mut total_expected = 0u64;
    let mut total_missing = 0u64;

    for (equipment_type, inventory) in types {
        if !options.includes(table, equipment_type) {
            continue;
        }

        let expected = u64::from(table.expected_for(equipment_type));
        total_expected += match options.mode {
            ScoringMode::PerRecord => inventory.records * expected,
            ScoringMode::PerType => expected,
            ScoringMode::ObservedColumns => inventory.checked_attributes,
        };
        total_missing += missing_by_type
            .get(equipment_type.as_str())
            .copied()
            .unwrap_or(0);
    }

    let rate_percent = completeness_rate(total_missing, total_expected);
    let tier = Tier::classify(rate_percent, options.tiers);

    debug!(site, total_expected, total_missing, rate_percent, %tier, "Site scored");

    CompletenessScore {
        site: site.to_string(),
        total_expected,
        total_missing,
        rate_percent,
        tier,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::aggregate::AuditAccumulator;
    use crate::audit::extract::ExtractedDataset;
    use crate::parser::RawDataset;

    fn aggregate(datasets: &[(&str, &[&str], &[&[&str]])]) -> Aggregation {
        datasets
            .iter()
            .map(|(file, headers, rows)| {
                let ds = RawDataset::new(
                    *file,
                    headers.iter().map(|h| h.to_string()).collect(),
                    rows.iter()
                        .map(|r| r.iter().map(|c| c.to_string()).collect())
                        .collect(),
                );
                let extracted = ExtractedDataset::extract(&ds, &AuditConfig::default()).unwrap();
                AuditAccumulator::from_dataset(&extracted)
            })
            .fold(AuditAccumulator::new(), AuditAccumulator::merge)
            .finish()
    }

    fn options(mode: ScoringMode) -> ScoringOptions {
        ScoringOptions {
            mode,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_missing_out_of_eight() {
        let agg = aggregate(&[("TRANSFOHT.csv", &["Emplacement", "Tension"], &[&["PST01A", ""]])]);
        let table = ExpectedAttributeTable::from_pairs([("TRANSFOHT", 8)]);
        let scores = score_sites(&agg, &table, ScoringOptions::default());

        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].site, "PST01");
        assert_eq!(scores[0].total_expected, 8);
        assert_eq!(scores[0].total_missing, 1);
        assert_eq!(scores[0].rate_percent, 87.5);
        assert_eq!(scores[0].tier, Tier::Correct);
    }

    #[test]
    fn test_filled_attribute_is_excellent() {
        let agg = aggregate(&[(
            "TRANSFOHT.csv",
            &["Emplacement", "Tension"],
            &[&["PST01A", "63kV"]],
        )]);
        let table = ExpectedAttributeTable::from_pairs([("TRANSFOHT", 8)]);
        let scores = score_sites(&agg, &table, ScoringOptions::default());

        assert!(agg.detail.is_empty());
        assert_eq!(scores[0].rate_percent, 100.0);
        assert_eq!(scores[0].tier, Tier::Excellent);
    }

    #[test]
    fn test_two_sources_same_site_all_missing() {
        let agg = aggregate(&[
            ("A.csv", &["Emplacement", "X"], &[&["PST01A", ""]]),
            ("B.csv", &["Emplacement", "Y"], &[&["PST01B", ""]]),
        ]);
        let table = ExpectedAttributeTable::from_pairs([("A", 1), ("B", 1)]);
        let scores = score_sites(&agg, &table, ScoringOptions::default());

        assert_eq!(scores[0].total_expected, 2);
        assert_eq!(scores[0].total_missing, 2);
        assert_eq!(scores[0].rate_percent, 0.0);
        assert_eq!(scores[0].tier, Tier::Critical);
    }

    #[test]
    fn test_per_record_and_per_type_differ() {
        let agg = aggregate(&[(
            "DISJ.csv",
            &["Emplacement", "Calibre"],
            &[&["PST01A", ""], &["PST01B", "630A"], &["PST01C", "630A"]],
        )]);
        let table = ExpectedAttributeTable::from_pairs([("DISJ", 4)]);

        let per_record = score_sites(&agg, &table, options(ScoringMode::PerRecord));
        assert_eq!(per_record[0].total_expected, 12);
        assert_eq!(per_record[0].rate_percent, 91.7);

        let per_type = score_sites(&agg, &table, options(ScoringMode::PerType));
        assert_eq!(per_type[0].total_expected, 4);
        assert_eq!(per_type[0].rate_percent, 75.0);
    }

    #[test]
    fn test_observed_columns_ignores_table() {
        let agg = aggregate(&[(
            "DISJ.csv",
            &["Emplacement", "Calibre", "Marque"],
            &[&["PST01A", "", "x"], &["PST01B", "y", "x"]],
        )]);
        let scores = score_sites(
            &agg,
            &ExpectedAttributeTable::default(),
            options(ScoringMode::ObservedColumns),
        );

        assert_eq!(scores[0].total_expected, 4);
        assert_eq!(scores[0].rate_percent, 75.0);
    }

    #[test]
    fn test_unknown_type_without_denominator_is_complete() {
        let agg = aggregate(&[("UNKNOWN.csv", &["Emplacement", "X"], &[&["PST09A", ""]])]);
        let scores = score_sites(&agg, &ExpectedAttributeTable::default(), ScoringOptions::default());

        assert_eq!(scores[0].total_expected, 0);
        assert_eq!(scores[0].total_missing, 1);
        assert_eq!(scores[0].rate_percent, 100.0);
        assert_eq!(scores[0].tier, Tier::Excellent);
    }

    #[test]
    fn test_unknown_type_policies() {
        let agg = aggregate(&[
            ("A.csv", &["Emplacement", "X"], &[&["PST01A", "ok"]]),
            ("UNKNOWN.csv", &["Emplacement", "X", "Y"], &[&["PST01B", "", ""]]),
        ]);
        let table = ExpectedAttributeTable::from_pairs([("A", 4)]);

        let counted = score_sites(&agg, &table, ScoringOptions::default());
        assert_eq!(counted[0].total_expected, 4);
        assert_eq!(counted[0].total_missing, 2);
        assert_eq!(counted[0].rate_percent, 50.0);

        let excluded = score_sites(
            &agg,
            &table,
            ScoringOptions {
                unknown_types: UnknownTypePolicy::Exclude,
                ..Default::default()
            },
        );
        assert_eq!(excluded[0].total_missing, 0);
        assert_eq!(excluded[0].rate_percent, 100.0);
    }

    #[test]
    fn test_rates_stay_in_range() {
        let agg = aggregate(&[(
            "A.csv",
            &["Emplacement", "X", "Y", "Z"],
            &[&["PST01A", "", "", ""], &["PST02A", "1", "", ""]],
        )]);
        let table = ExpectedAttributeTable::from_pairs([("A", 1)]);

        for mode in [
            ScoringMode::PerRecord,
            ScoringMode::PerType,
            ScoringMode::ObservedColumns,
        ] {
            for score in score_sites(&agg, &table, options(mode)) {
                assert!((0.0..=100.0).contains(&score.rate_percent));
            }
        }
    }
}
