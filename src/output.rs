//! Report persistence: JSON artifact plus three CSV tables.
//!
//! Table headers follow the French column names used by the GMAO teams.

use anyhow::{Context, Result};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::report::CompletenessReport;

pub const REPORT_FILE: &str = "rapport.json";
pub const DETAIL_FILE: &str = "detail.csv";
pub const SYNTHESIS_FILE: &str = "synthese.csv";
pub const COMPLETENESS_FILE: &str = "completude.csv";

const DETAIL_HEADERS: &[&str] = &[
    "Poste",
    "Attribut manquant",
    "Équipement",
    "Emplacement",
    "Identifiant",
];
const SYNTHESIS_HEADERS: &[&str] = &["Poste", "Attributs manquants", "Équipements"];
const COMPLETENESS_HEADERS: &[&str] = &[
    "Poste",
    "Attributs attendus",
    "Attributs manquants",
    "Taux de complétude (%)",
    "Niveau",
    "Couleur",
];

/// Writes rows under an explicit header, so empty tables still carry one.
pub fn write_table<W, R>(writer: W, headers: &[&str], rows: impl IntoIterator<Item = R>) -> Result<()>
where
    W: Write,
    R: Serialize,
{
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_detail<W: Write>(writer: W, report: &CompletenessReport) -> Result<()> {
    write_table(
        writer,
        DETAIL_HEADERS,
        report.detail.iter().map(|e| {
            (
                &e.site,
                &e.attribute,
                &e.equipment_type,
                &e.location,
                &e.label,
            )
        }),
    )
}

pub fn write_synthesis<W: Write>(writer: W, report: &CompletenessReport) -> Result<()> {
    write_table(
        writer,
        SYNTHESIS_HEADERS,
        report.synthesis.iter().map(|s| {
            (
                &s.site,
                s.attributes_display(),
                s.equipment_types_display(),
            )
        }),
    )
}

pub fn write_completeness<W: Write>(writer: W, report: &CompletenessReport) -> Result<()> {
    write_table(
        writer,
        COMPLETENESS_HEADERS,
        report.completeness.iter().map(|c| {
            (
                &c.site,
                c.total_expected,
                c.total_missing,
                c.rate_percent,
                c.tier.label(),
                c.tier.color(),
            )
        }),
    )
}

/// Writes the JSON artifact and the three tables into `dir`, creating it if
/// needed. Returns the written paths.
#[tracing::instrument(skip(report), fields(dir = %dir.display()))]
pub fn write_report(dir: &Path, report: &CompletenessReport) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("cannot create output directory '{}'", dir.display()))?;

    let json_path = dir.join(REPORT_FILE);
    let json = serde_json::to_vec_pretty(report)?;
    fs::write(&json_path, json)?;

    let detail_path = dir.join(DETAIL_FILE);
    write_detail(File::create(&detail_path)?, report)?;

    let synthesis_path = dir.join(SYNTHESIS_FILE);
    write_synthesis(File::create(&synthesis_path)?, report)?;

    let completeness_path = dir.join(COMPLETENESS_FILE);
    write_completeness(File::create(&completeness_path)?, report)?;

    let paths = vec![json_path, detail_path, synthesis_path, completeness_path];
    debug!(files = paths.len(), "Report written");
    Ok(paths)
}

/// Loads a previously written JSON artifact.
pub fn read_report(path: &Path) -> Result<CompletenessReport> {
    let content = fs::read(path)
        .with_context(|| format!("cannot read report '{}'", path.display()))?;
    Ok(serde_json::from_slice(&content)?)
}

/// Logs the per-tier breakdown and every diagnostic of the run.
pub fn log_summary(report: &CompletenessReport) {
    for (tier, count) in report.tier_counts() {
        info!(tier = %tier, sites = count, "Tier breakdown");
    }
    for skipped in &report.diagnostics.skipped_sources {
        warn!(file = %skipped.file, kind = %skipped.kind, "{}", skipped.message);
    }
    for (file, count) in &report.diagnostics.dropped_records {
        warn!(file = %file, dropped_records = count, "Rows without location");
    }
    if !report.diagnostics.configuration_gaps.is_empty() {
        warn!(
            types = %report.diagnostics.configuration_gaps.join(", "),
            "Equipment types without expected attribute count"
        );
    }
}
