//! Loan Approval Analysis
//!
//! Cleans the loan approval dataset, fits a cross-validated logistic
//! regression and a random forest, and reports accuracy, ROC/AUC and charts.

pub mod charts;
pub mod config;
pub mod data;
pub mod eval;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod stats;

pub use config::{ConfigError, PipelineConfig};
pub use pipeline::{ModelSummary, Pipeline, RunSummary};
