//! Audit configuration.
//!
//! Stored as a JSON object, every field optional:
//! ```json
//! {
//!   "expected": { "TRANSFOHT": 8, "DISJONCTEUR": 12 },
//!   "empty_tokens": ["", "VIDE"],
//!   "site_prefix_len": 5,
//!   "scoring": "per_record",
//!   "tiers": "weighted",
//!   "unknown_types": "count_as_zero"
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::audit::normalize::{equipment_type_from_stem, normalize_header};
use crate::audit::types::{ScoringMode, TierScheme, UnknownTypePolicy};
use crate::error::AuditError;
use crate::fetch::load_bytes;

/// Expected attribute count per equipment type.
///
/// Keys go through the same cleanup as file names (trim, spaces to `_`) so
/// `"TRANSFO HT"` in the table matches a `TRANSFO HT.csv` source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpectedAttributeTable {
    entries: BTreeMap<String, u32>,
}

impl ExpectedAttributeTable {
    /// Builds a table from trusted pairs. When two keys normalize to the same
    /// type the last one wins; configuration documents go through
    /// [`AuditConfig::prepared`], which rejects such keys instead.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, u32)>,
        K: AsRef<str>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(k, v)| (equipment_type_from_stem(k.as_ref()), v))
                .collect(),
        }
    }

    /// Returns the configured count, `None` when the type is not in the table.
    pub fn get(&self, equipment_type: &str) -> Option<u32> {
        self.entries.get(equipment_type).copied()
    }

    /// Configured count, or 0 for a type the table does not know.
    pub fn expected_for(&self, equipment_type: &str) -> u32 {
        self.get(equipment_type).unwrap_or(0)
    }

    pub fn contains(&self, equipment_type: &str) -> bool {
        self.entries.contains_key(equipment_type)
    }

    /// Types from `observed` that have no entry in the table.
    pub fn gaps<'a, I>(&self, observed: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        observed
            .into_iter()
            .filter(|t| !self.contains(t))
            .map(str::to_string)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn normalized(self) -> Result<Self, AuditError> {
        let mut entries: BTreeMap<String, u32> = BTreeMap::new();
        let mut origins: BTreeMap<String, String> = BTreeMap::new();

        for (raw, count) in self.entries {
            let key = equipment_type_from_stem(&raw);
            if let Some(first) = origins.get(&key) {
                return Err(AuditError::InvalidConfiguration(format!(
                    "equipment types '{first}' and '{raw}' both normalize to '{key}'"
                )));
            }
            origins.insert(key.clone(), raw);
            entries.insert(key, count);
        }

        Ok(Self { entries })
    }

    fn validate(&self) -> Result<(), AuditError> {
        if let Some((name, _)) = self.entries.iter().find(|(_, v)| **v == 0) {
            return Err(AuditError::InvalidConfiguration(format!(
                "expected attribute count for '{name}' must be positive"
            )));
        }
        Ok(())
    }
}

/// Header spellings for each logical column, matched after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSynonyms {
    pub location: Vec<String>,
    pub ignored: Vec<String>,
    pub site: Vec<String>,
    pub identifier: Vec<String>,
    pub description: Vec<String>,
}

impl Default for ColumnSynonyms {
    fn default() -> Self {
        fn owned(values: &[&str]) -> Vec<String> {
            values.iter().map(|v| v.to_string()).collect()
        }

        Self {
            location: owned(&["emplacement", "location", "localisation"]),
            ignored: owned(&["asdu", "nom poste reseau", "nom poste réseau"]),
            site: owned(&["poste"]),
            identifier: owned(&[
                "equipement",
                "équipement",
                "numero equipement",
                "n° equipement",
            ]),
            description: owned(&["description", "libelle", "libellé"]),
        }
    }
}

impl ColumnSynonyms {
    fn normalized(self) -> Self {
        fn clean(values: Vec<String>) -> Vec<String> {
            let mut seen = BTreeSet::new();
            values
                .into_iter()
                .map(|v| normalize_header(&v))
                .filter(|v| !v.is_empty() && seen.insert(v.clone()))
                .collect()
        }

        Self {
            location: clean(self.location),
            ignored: clean(self.ignored),
            site: clean(self.site),
            identifier: clean(self.identifier),
            description: clean(self.description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub expected: ExpectedAttributeTable,
    pub columns: ColumnSynonyms,
    /// Cell values treated as absent, compared after trimming.
    pub empty_tokens: Vec<String>,
    /// Number of leading location characters that identify a site.
    pub site_prefix_len: usize,
    /// Forces the field delimiter instead of sniffing it from the header line.
    pub delimiter: Option<char>,
    pub scoring: ScoringMode,
    pub tiers: TierScheme,
    pub unknown_types: UnknownTypePolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            expected: ExpectedAttributeTable::default(),
            columns: ColumnSynonyms::default(),
            empty_tokens: vec![String::new(), "VIDE".to_string()],
            site_prefix_len: 5,
            delimiter: None,
            scoring: ScoringMode::default(),
            tiers: TierScheme::default(),
            unknown_types: UnknownTypePolicy::default(),
        }
    }
}

impl AuditConfig {
    /// Parses, normalizes and validates a JSON configuration document.
    pub fn from_json(bytes: &[u8]) -> Result<Self, AuditError> {
        let config: AuditConfig = serde_json::from_slice(bytes)
            .map_err(|e| AuditError::InvalidConfiguration(e.to_string()))?;
        config.prepared()
    }

    /// Loads the configuration from a local path or an `http(s)` URL.
    pub async fn load(source: &str) -> Result<Self> {
        let bytes = load_bytes(source)
            .await
            .with_context(|| format!("failed to load configuration from '{source}'"))?;
        let config = Self::from_json(&bytes)?;
        debug!(
            source,
            equipment_types = config.expected.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Normalizes table keys and synonyms, then validates the result.
    pub fn prepared(mut self) -> Result<Self, AuditError> {
        self.expected = self.expected.normalized()?;
        self.columns = self.columns.normalized();
        self.empty_tokens = self
            .empty_tokens
            .into_iter()
            .map(|t| t.trim().to_string())
            .collect();
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AuditError> {
        self.expected.validate()?;

        if self.site_prefix_len == 0 {
            return Err(AuditError::InvalidConfiguration(
                "site_prefix_len must be at least 1".into(),
            ));
        }

        if self.columns.location.is_empty() {
            return Err(AuditError::InvalidConfiguration(
                "at least one location column name is required".into(),
            ));
        }

        if let Some(d) = self.delimiter {
            if !d.is_ascii() {
                return Err(AuditError::InvalidConfiguration(format!(
                    "delimiter '{d}' must be a single ASCII character"
                )));
            }
        }

        Ok(())
    }

    /// `true` when `value` is one of the configured empty sentinels.
    pub fn is_empty_token(&self, value: &str) -> bool {
        let value = value.trim();
        self.empty_tokens.iter().any(|t| t == value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_gmao_conventions() {
        let config = AuditConfig::default();
        assert_eq!(config.site_prefix_len, 5);
        assert!(config.is_empty_token(""));
        assert!(config.is_empty_token("  VIDE "));
        assert!(!config.is_empty_token("vide"));
        assert_eq!(config.scoring, ScoringMode::PerRecord);
        assert_eq!(config.tiers, TierScheme::Weighted);
    }

    #[test]
    fn test_from_json_normalizes_keys_and_synonyms() {
        let json = br#"{
            "expected": { " TRANSFO HT ": 8 },
            "columns": { "location": ["  Emplacement\n"] }
        }"#;
        let config = AuditConfig::from_json(json).unwrap();

        assert_eq!(config.expected.get("TRANSFO_HT"), Some(8));
        assert_eq!(config.columns.location, vec!["emplacement".to_string()]);
        // unspecified synonym groups keep their defaults
        assert!(config.columns.ignored.contains(&"asdu".to_string()));
    }

    #[test]
    fn test_zero_expected_count_is_rejected() {
        let err = AuditConfig::from_json(br#"{ "expected": { "A": 0 } }"#).unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_colliding_equipment_types_are_rejected() {
        let json = br#"{ "expected": { "TRANSFO HT": 3, "TRANSFO_HT": 4 } }"#;
        let err = AuditConfig::from_json(json).unwrap_err();

        assert_eq!(err.kind(), "invalid_configuration");
        assert!(err.to_string().contains("TRANSFO_HT"));

        let err = AuditConfig::from_json(br#"{ "expected": { "DISJ": 3, " DISJ ": 3 } }"#)
            .unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_site_prefix_is_rejected() {
        let err = AuditConfig::from_json(br#"{ "site_prefix_len": 0 }"#).unwrap_err();
        assert!(matches!(err, AuditError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_malformed_json_is_invalid_configuration() {
        let err = AuditConfig::from_json(b"{ not json").unwrap_err();
        assert_eq!(err.kind(), "invalid_configuration");
    }

    #[test]
    fn test_unknown_type_defaults_to_zero() {
        let table = ExpectedAttributeTable::from_pairs([("A", 3)]);
        assert_eq!(table.expected_for("A"), 3);
        assert_eq!(table.expected_for("B"), 0);

        let gaps = table.gaps(["A", "B", "C"]);
        assert_eq!(
            gaps.into_iter().collect::<Vec<_>>(),
            vec!["B".to_string(), "C".to_string()]
        );
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let path = format!(
            "{}/gmao_completeness_config_test.json",
            std::env::temp_dir().display()
        );
        std::fs::write(&path, br#"{ "expected": { "DISJ": 4 }, "tiers": "legacy" }"#).unwrap();

        let config = AuditConfig::load(&path).await.unwrap();
        assert_eq!(config.expected.expected_for("DISJ"), 4);
        assert_eq!(config.tiers, TierScheme::Legacy);

        std::fs::remove_file(&path).unwrap();
    }
}
