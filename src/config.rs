//! Pipeline Configuration
//! JSON-backed run settings with defaults for every field.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Settings for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub data_path: PathBuf,
    pub output_dir: PathBuf,
    /// Rows with a larger age are removed.
    pub max_age: f64,
    /// Share of each class that goes to the training set.
    pub train_fraction: f64,
    pub seed: u64,
    pub cv_folds: usize,
    /// L2 penalties tried by cross-validation.
    pub lambda_grid: Vec<f64>,
    pub n_trees: usize,
    /// Upper y limit of the loan amount box plots.
    pub loan_amount_clip: f64,
    pub render_plots: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("data/raw/loan_data.csv"),
            output_dir: PathBuf::from("output/plots"),
            max_age: 100.0,
            train_fraction: 0.8,
            seed: 42,
            cv_folds: 5,
            lambda_grid: vec![0.0, 1e-4, 1e-3, 1e-2, 1e-1],
            n_trees: 100,
            loan_amount_clip: 35_000.0,
            render_plots: true,
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return Err(ConfigError::Invalid {
                field: "train_fraction",
                reason: format!("{} is outside (0, 1)", self.train_fraction),
            });
        }
        if self.cv_folds < 2 {
            return Err(ConfigError::Invalid {
                field: "cv_folds",
                reason: format!("need at least 2 folds, got {}", self.cv_folds),
            });
        }
        if self.n_trees == 0 {
            return Err(ConfigError::Invalid {
                field: "n_trees",
                reason: "must be positive".to_string(),
            });
        }
        if self.lambda_grid.is_empty() {
            return Err(ConfigError::Invalid {
                field: "lambda_grid",
                reason: "must not be empty".to_string(),
            });
        }
        if let Some(bad) = self.lambda_grid.iter().find(|l| !(**l >= 0.0 && l.is_finite())) {
            return Err(ConfigError::Invalid {
                field: "lambda_grid",
                reason: format!("{bad} is not a non-negative number"),
            });
        }
        if !(self.max_age > 0.0) {
            return Err(ConfigError::Invalid {
                field: "max_age",
                reason: format!("{} is not positive", self.max_age),
            });
        }
        if !(self.loan_amount_clip > 0.0) {
            return Err(ConfigError::Invalid {
                field: "loan_amount_clip",
                reason: format!("{} is not positive", self.loan_amount_clip),
            });
        }
        Ok(())
    }
}
