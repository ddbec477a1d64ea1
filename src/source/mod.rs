//! Equipment table sources.
//!
//! [`SourceCatalog`] lists and reads the tables of one run.
//! [`DirectoryCatalog`] implements it over a local export directory.

mod directory;

pub use directory::DirectoryCatalog;

use anyhow::Result;
use std::path::PathBuf;

use crate::audit::normalize::equipment_type_from_file_name;

/// One equipment table available to the run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceFile {
    /// File name including extension, e.g. `TRANSFOHT.csv`.
    pub name: String,
    pub path: PathBuf,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn equipment_type(&self) -> String {
        equipment_type_from_file_name(&self.name)
    }
}

/// Abstraction over where equipment tables come from.
#[async_trait::async_trait]
pub trait SourceCatalog: Send + Sync {
    /// Returns every table of the run, sorted by name.
    async fn list_sources(&self) -> Result<Vec<SourceFile>>;

    /// Returns the raw bytes of one table.
    async fn read(&self, source: &SourceFile) -> Result<Vec<u8>>;
}
