use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{GeometryRecord, RecordError};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to read geometry tables from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed geometry tables: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid row {index} in table '{table}': {source}")]
    InvalidRecord {
        table: &'static str,
        index: usize,
        #[source]
        source: RecordError,
    },
}

/// Read access to a design's exportable geometry.
///
/// Both collections are ordered; exporters must preserve that order.
pub trait GeometrySource {
    /// Filled regions ("poly" table).
    fn filled_regions(&self) -> &[GeometryRecord];
    /// Stroked paths ("path" table).
    fn paths(&self) -> &[GeometryRecord];
}

/// In-memory geometry tables, loadable from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryTables {
    #[serde(default, alias = "poly")]
    pub filled_regions: Vec<GeometryRecord>,
    #[serde(default, alias = "path")]
    pub paths: Vec<GeometryRecord>,
}

impl GeometryTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&mut self, record: GeometryRecord) {
        self.filled_regions.push(record);
    }

    pub fn add_path(&mut self, record: GeometryRecord) {
        self.paths.push(record);
    }

    pub fn len(&self) -> usize {
        self.filled_regions.len() + self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Validate every row, reporting the first offending one.
    pub fn validate(&self) -> Result<(), SourceError> {
        let tables = [("poly", &self.filled_regions), ("path", &self.paths)];
        for (table, rows) in tables {
            for (index, row) in rows.iter().enumerate() {
                row.validate()
                    .map_err(|source| SourceError::InvalidRecord { table, index, source })?;
            }
        }
        Ok(())
    }

    // ── Serialization ────────────────────────────────────────────────

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse and validate tables from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        let tables: Self = serde_json::from_str(json)?;
        tables.validate()?;
        log::debug!(
            "Loaded {} filled regions and {} paths",
            tables.filled_regions.len(),
            tables.paths.len()
        );
        Ok(tables)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }
}

impl GeometrySource for GeometryTables {
    fn filled_regions(&self) -> &[GeometryRecord] {
        &self.filled_regions
    }

    fn paths(&self) -> &[GeometryRecord] {
        &self.paths
    }
}
