//! Session configuration, persisted as TOML.
//!
//! Every field has a default so a config file only needs the inputs that
//! differ; command-line flags override file values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::imagery::DEFAULT_PREFIX;

/// Inputs and output of one annotation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Pose dataset (delimited text with a header row).
    #[serde(default)]
    pub dataset: Option<PathBuf>,
    /// Newline-delimited person names.
    #[serde(default)]
    pub names: Option<PathBuf>,
    /// Zip archive of frame images.
    #[serde(default)]
    pub images: Option<PathBuf>,
    /// Where the labelled export is written.
    #[serde(default = "default_output")]
    pub output: PathBuf,
    /// Field delimiter for dataset and export.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Literal prefix of frame image names inside the archive.
    #[serde(default = "default_image_prefix")]
    pub image_prefix: String,
}

fn default_output() -> PathBuf {
    PathBuf::from("edited_skeletons.csv")
}
fn default_delimiter() -> char {
    ','
}
fn default_image_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dataset: None,
            names: None,
            images: None,
            output: default_output(),
            delimiter: default_delimiter(),
            image_prefix: default_image_prefix(),
        }
    }
}

impl SessionConfig {
    /// Load a config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<memory>".into(),
            message: e.to_string(),
        })
    }

    /// The delimiter as a single byte, as the CSV reader and writer expect.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(ConfigError::Parse {
                path: "delimiter".into(),
                message: format!("delimiter {:?} is not a single ASCII character", self.delimiter),
            })
        }
    }

    pub fn dataset_path(&self) -> Result<&Path, ConfigError> {
        self.dataset.as_deref().ok_or_else(|| ConfigError::MissingField {
            field: "dataset".into(),
        })
    }

    pub fn names_path(&self) -> Result<&Path, ConfigError> {
        self.names.as_deref().ok_or_else(|| ConfigError::MissingField {
            field: "names".into(),
        })
    }
}
