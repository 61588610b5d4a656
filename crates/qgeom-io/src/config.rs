use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::library::{Library, Timestamp};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read export options from {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed export options in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid export options: {0}")]
    Invalid(String),
}

/// What to do with records the encoder cannot represent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Skip unsupported records, report them, and export the rest.
    #[default]
    CollectAll,
    /// Abort the export at the first unsupported record.
    FailFast,
}

/// Settings for one GDS-II export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub library_name: String,
    pub top_cell: String,
    /// User unit in meters.
    pub unit: f64,
    /// Database unit in meters.
    pub precision: f64,
    pub error_policy: ErrorPolicy,
    pub timestamp: Timestamp,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            library_name: Library::DEFAULT_NAME.to_string(),
            top_cell: "TOP".to_string(),
            unit: Library::DEFAULT_UNIT,
            precision: Library::DEFAULT_PRECISION,
            error_policy: ErrorPolicy::default(),
            timestamp: Timestamp::default(),
        }
    }
}

impl ExportOptions {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let options: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.unit.is_finite() && self.unit > 0.0) {
            return Err(ConfigError::Invalid(format!("unit must be positive, got {}", self.unit)));
        }
        if !(self.precision.is_finite() && self.precision > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "precision must be positive, got {}",
                self.precision
            )));
        }
        if self.precision > self.unit {
            return Err(ConfigError::Invalid(format!(
                "precision {} is coarser than unit {}",
                self.precision, self.unit
            )));
        }
        if self.top_cell.is_empty() {
            return Err(ConfigError::Invalid("top cell name is empty".to_string()));
        }
        Ok(())
    }
}
