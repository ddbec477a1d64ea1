use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{Instrument, info, warn};

use crate::audit::aggregate::AuditAccumulator;
use crate::audit::extract::ExtractedDataset;
use crate::config::AuditConfig;
use crate::error::AuditError;
use crate::parser::{RawDataset, parse_dataset};
use crate::report::CompletenessReport;
use crate::source::{SourceCatalog, SourceFile};

/// Extracts one dataset into its own accumulator. A rejected dataset becomes
/// a skip entry instead of an error.
pub fn accumulate(dataset: &RawDataset, config: &AuditConfig) -> AuditAccumulator {
    match ExtractedDataset::extract(dataset, config) {
        Ok(extracted) => AuditAccumulator::from_dataset(&extracted),
        Err(e) => {
            warn!(file = %dataset.file_name, error = %e, "Dataset skipped");
            AuditAccumulator::from_skipped(&dataset.file_name, &e)
        }
    }
}

/// Parses and extracts raw bytes of one source.
pub fn accumulate_bytes(file_name: &str, bytes: &[u8], config: &AuditConfig) -> AuditAccumulator {
    let delimiter = config.delimiter.map(|c| c as u8);
    match parse_dataset(file_name, bytes, delimiter) {
        Ok(dataset) => accumulate(&dataset, config),
        Err(e) => {
            warn!(file = file_name, error = %e, "Source skipped");
            AuditAccumulator::from_skipped(file_name, &e)
        }
    }
}

/// Turns the merged accumulator into a report.
///
/// # Errors
///
/// [`AuditError::NoDataAvailable`] when no dataset was accepted.
pub fn finalize(
    accumulator: AuditAccumulator,
    config: &AuditConfig,
) -> Result<CompletenessReport, AuditError> {
    if accumulator.accepted_sources() == 0 {
        return Err(AuditError::NoDataAvailable);
    }

    let report = CompletenessReport::assemble(accumulator.finish(), config);

    if report.is_empty_result() {
        info!("No missing attribute detected");
    }
    info!(
        sites = report.completeness.len(),
        missing = report.detail.len(),
        accepted = report.diagnostics.accepted_sources,
        skipped = report.diagnostics.skipped_sources.len(),
        dropped_records = report.diagnostics.total_dropped_records(),
        "Audit complete"
    );

    Ok(report)
}

/// Runs the whole audit over in-memory datasets.
pub fn audit_datasets<I>(datasets: I, config: &AuditConfig) -> Result<CompletenessReport, AuditError>
where
    I: IntoIterator<Item = RawDataset>,
{
    let accumulator = datasets
        .into_iter()
        .map(|dataset| accumulate(&dataset, config))
        .fold(AuditAccumulator::new(), AuditAccumulator::merge);

    finalize(accumulator, config)
}

/// Reads and extracts every source of `catalog` concurrently, then merges the
/// per-source accumulators.
///
/// At most `concurrency` sources are in flight; parsing runs on the blocking
/// pool.
#[tracing::instrument(skip(catalog, config))]
pub async fn run_audit(
    catalog: Arc<dyn SourceCatalog>,
    config: Arc<AuditConfig>,
    concurrency: usize,
) -> anyhow::Result<CompletenessReport> {
    let sources = catalog.list_sources().await?;
    info!(source_count = sources.len(), "Sources ready for processing");

    if sources.is_empty() {
        return Err(AuditError::NoDataAvailable.into());
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(sources.len());

    for source in sources {
        let sem = semaphore.clone();
        let catalog = catalog.clone();
        let config = config.clone();

        let span = tracing::info_span!(
            "process_source",
            file = %source.name,
            equipment_type = %source.equipment_type(),
        );

        tasks.push(tokio::spawn(
            async move {
                let _permit = sem.acquire_owned().await?;
                process_source(catalog.as_ref(), source, config).await
            }
            .instrument(span),
        ));
    }

    let mut accumulator = AuditAccumulator::new();
    for task in tasks {
        accumulator = accumulator.merge(task.await??);
    }

    Ok(finalize(accumulator, &config)?)
}

async fn process_source(
    catalog: &dyn SourceCatalog,
    source: SourceFile,
    config: Arc<AuditConfig>,
) -> anyhow::Result<AuditAccumulator> {
    let bytes = match catalog.read(&source).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let error = AuditError::SourceUnreadable {
                file: source.name.clone(),
                reason: format!("{e:#}"),
            };
            warn!(error = %error, "Source skipped");
            return Ok(AuditAccumulator::from_skipped(&source.name, &error));
        }
    };

    let accumulator =
        tokio::task::spawn_blocking(move || accumulate_bytes(&source.name, &bytes, &config))
            .await?;
    Ok(accumulator)
}
