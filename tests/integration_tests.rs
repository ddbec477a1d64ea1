use gmao_completeness::audit::pipeline::run_audit;
use gmao_completeness::audit::tier::Tier;
use gmao_completeness::audit::types::TierScheme;
use gmao_completeness::config::AuditConfig;
use gmao_completeness::output::{REPORT_FILE, read_report, write_report};
use gmao_completeness::report::CompletenessReport;
use gmao_completeness::source::DirectoryCatalog;
use std::sync::Arc;

const FIXTURES: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

async fn load_config() -> AuditConfig {
    AuditConfig::load(&format!("{FIXTURES}/audit.json"))
        .await
        .expect("Failed to load fixture config")
}

async fn audit(config: AuditConfig) -> CompletenessReport {
    let catalog = Arc::new(DirectoryCatalog::new(format!("{FIXTURES}/donnees")));
    run_audit(catalog, Arc::new(config), 2)
        .await
        .expect("Audit failed")
}

fn rate_and_tier(report: &CompletenessReport, site: &str) -> (f64, Tier) {
    let score = report
        .completeness_for_site(site)
        .unwrap_or_else(|| panic!("no score for {site}"));
    (score.rate_percent, score.tier)
}

#[tokio::test]
async fn test_full_pipeline() {
    let report = audit(load_config().await).await;

    assert_eq!(report.diagnostics.accepted_sources, 2);
    assert_eq!(report.diagnostics.skipped_sources.len(), 1);
    assert_eq!(report.diagnostics.skipped_sources[0].file, "SECTIONNEUR.csv");
    assert_eq!(
        report.diagnostics.dropped_records.get("DISJONCTEUR.csv"),
        Some(&1)
    );
    assert!(report.diagnostics.configuration_gaps.is_empty());

    assert_eq!(report.detail.len(), 4);
    assert_eq!(
        report.sites().collect::<Vec<_>>(),
        vec!["PST01", "PST02", "PST03", "PST04"]
    );

    assert_eq!(rate_and_tier(&report, "PST01"), (77.8, Tier::Critical));
    assert_eq!(rate_and_tier(&report, "PST02"), (83.3, Tier::Critical));
    assert_eq!(rate_and_tier(&report, "PST03"), (100.0, Tier::Excellent));
    assert_eq!(rate_and_tier(&report, "PST04"), (91.7, Tier::Correct));

    let pst04 = report.completeness_for_site("PST04").unwrap();
    assert_eq!(pst04.total_expected, 12);
    assert_eq!(pst04.total_missing, 1);
}

#[tokio::test]
async fn test_normalized_headers_reach_the_detail() {
    let report = audit(load_config().await).await;

    let pst02 = report.synthesis_for_site("PST02").unwrap();
    assert_eq!(pst02.missing_attributes, vec!["DISJONCTEUR_pouvoir de coupure"]);
    assert_eq!(pst02.equipment_types, vec!["DISJONCTEUR"]);

    // structural columns never show up as missing
    assert!(report.detail.iter().all(|e| {
        !e.attribute.ends_with("_asdu")
            && !e.attribute.ends_with("_nom poste reseau")
            && !e.attribute.ends_with("_emplacement")
    }));
}

#[tokio::test]
async fn test_missing_for_site() {
    let report = audit(load_config().await).await;

    let groups = report.missing_for_site("PST01");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].equipment_type, "TRANSFOHT");
    assert_eq!(groups[0].label, "PST01A02");
    assert_eq!(
        groups[0].missing_attributes,
        vec!["TRANSFOHT_marque", "TRANSFOHT_tension"]
    );

    let groups = report.missing_for_site("PST02");
    assert_eq!(groups[0].label, "D-201");

    assert!(report.missing_for_site("PST03").is_empty());
}

#[tokio::test]
async fn test_legacy_tiers() {
    let mut config = load_config().await;
    config.tiers = TierScheme::Legacy;
    let report = audit(config).await;

    assert_eq!(rate_and_tier(&report, "PST01"), (77.8, Tier::Correct));
    assert_eq!(rate_and_tier(&report, "PST04"), (91.7, Tier::Excellent));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let first = audit(load_config().await).await;
    let second = audit(load_config().await).await;
    assert!(first.same_content(&second));

    for score in &first.completeness {
        assert!((0.0..=100.0).contains(&score.rate_percent));
    }
}

#[tokio::test]
async fn test_written_report_answers_queries() {
    let report = audit(load_config().await).await;
    let dir = std::env::temp_dir().join("gmao_completeness_integration_report");
    let _ = std::fs::remove_dir_all(&dir);

    write_report(&dir, &report).unwrap();
    let restored = read_report(&dir.join(REPORT_FILE)).unwrap();

    assert!(restored.same_content(&report));
    assert_eq!(
        restored.completeness_for_site("PST04").map(|s| s.tier),
        Some(Tier::Correct)
    );

    std::fs::remove_dir_all(&dir).unwrap();
}

#[tokio::test]
async fn test_missing_table_defaults_to_complete() {
    let report = audit(AuditConfig::default()).await;

    assert_eq!(
        report.diagnostics.configuration_gaps,
        vec!["DISJONCTEUR", "TRANSFOHT"]
    );
    assert!(report
        .completeness
        .iter()
        .all(|s| s.total_expected == 0 && s.rate_percent == 100.0));
}
