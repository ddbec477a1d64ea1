//! Error taxonomy for the completeness audit.
//!
//! Only [`AuditError::NoDataAvailable`] and [`AuditError::InvalidConfiguration`]
//! abort a run. The per-source variants are caught by the pipeline and turned
//! into [`crate::audit::types::SkippedSource`] entries.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    /// The source could not be opened or parsed as a table.
    #[error("source '{file}' is unreadable: {reason}")]
    SourceUnreadable { file: String, reason: String },

    /// No header matched any of the configured location synonyms.
    #[error("source '{file}' has no location column (looked for: {candidates})")]
    MissingRequiredColumn { file: String, candidates: String },

    /// Every source was unreadable or rejected.
    #[error("no readable source dataset available")]
    NoDataAvailable,

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl AuditError {
    /// Short machine-friendly label used in diagnostics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AuditError::SourceUnreadable { .. } => "source_unreadable",
            AuditError::MissingRequiredColumn { .. } => "missing_required_column",
            AuditError::NoDataAvailable => "no_data_available",
            AuditError::InvalidConfiguration(_) => "invalid_configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels() {
        let err = AuditError::MissingRequiredColumn {
            file: "DISJ.csv".into(),
            candidates: "emplacement".into(),
        };
        assert_eq!(err.kind(), "missing_required_column");
        assert_eq!(AuditError::NoDataAvailable.kind(), "no_data_available");
    }

    #[test]
    fn test_display_names_the_file() {
        let err = AuditError::SourceUnreadable {
            file: "TRANSFOHT.csv".into(),
            reason: "bad header".into(),
        };
        assert_eq!(
            err.to_string(),
            "source 'TRANSFOHT.csv' is unreadable: bad header"
        );
    }
}
