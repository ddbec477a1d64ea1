use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{SourceCatalog, SourceFile};
use crate::parser::SPREADSHEET_EXTENSIONS;

const EXTENSIONS: &[&str] = &["csv", "tsv"];

/// Reads every `.csv` / `.tsv` file directly under `root`.
///
/// Spreadsheet workbooks are listed too so the audit reports them as
/// unreadable instead of ignoring them. Office lock files (`~$NAME.csv`),
/// hidden files and names that are not valid UTF-8 are skipped.
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn accepts(name: &str) -> bool {
        if name.starts_with("~$") || name.starts_with('.') {
            return false;
        }
        Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                EXTENSIONS
                    .iter()
                    .chain(SPREADSHEET_EXTENSIONS)
                    .any(|x| ext.eq_ignore_ascii_case(x))
            })
    }
}

#[async_trait]
impl SourceCatalog for DirectoryCatalog {
    async fn list_sources(&self) -> Result<Vec<SourceFile>> {
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("cannot list source directory '{}'", self.root.display()))?;

        let mut sources = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(
                    path = %entry.path().display(),
                    "Skipping source with non UTF-8 file name"
                );
                continue;
            };
            if Self::accepts(&name) {
                sources.push(SourceFile::new(name, entry.path()));
            }
        }

        sources.sort();
        debug!(root = %self.root.display(), count = sources.len(), "Sources listed");
        Ok(sources)
    }

    async fn read(&self, source: &SourceFile) -> Result<Vec<u8>> {
        tokio::fs::read(&source.path)
            .await
            .with_context(|| format!("cannot read '{}'", source.path.display()))
    }
}
