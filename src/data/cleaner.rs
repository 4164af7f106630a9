//! Data Cleaner Module
//! Age filtering, missing-row removal, categorical casting and target relabelling.

use crate::data::loader::missing_counts;
use crate::data::schema::{self, Factor, FEATURE_FACTORS};
use polars::prelude::*;
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum CleanError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Expected column '{column}' is missing")]
    MissingColumn { column: String },
    #[error("Column '{column}' holds unexpected level '{value}'")]
    UnexpectedLevel { column: String, value: String },
}

/// Cleaning parameters.
#[derive(Debug, Clone, Copy)]
pub struct CleanConfig {
    /// Ages above this are sentinel values, not real ages.
    pub max_age: f64,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self { max_age: 100.0 }
    }
}

/// Row count and per-column missing counts after one cleaning stage.
#[derive(Debug, Clone)]
pub struct StageSummary {
    pub stage: &'static str,
    pub rows: usize,
    pub columns: usize,
    pub missing: Vec<(String, usize)>,
}

impl StageSummary {
    fn of(stage: &'static str, df: &DataFrame) -> Self {
        Self {
            stage,
            rows: df.height(),
            columns: df.width(),
            missing: missing_counts(df),
        }
    }

    pub fn total_missing(&self) -> usize {
        self.missing.iter().map(|(_, n)| n).sum()
    }
}

/// Output of [`DataCleaner::clean`].
#[derive(Debug, Clone)]
pub struct CleanReport {
    pub frame: DataFrame,
    pub stages: Vec<StageSummary>,
}

/// Handles data cleaning operations.
pub struct DataCleaner;

impl DataCleaner {
    /// Run every cleaning step in order. An empty result is returned as-is.
    #[instrument(skip_all, fields(rows = df.height()))]
    pub fn clean(df: &DataFrame, config: &CleanConfig) -> Result<CleanReport, CleanError> {
        let mut stages = Vec::with_capacity(4);

        let df = Self::filter_age(df, config.max_age)?;
        stages.push(StageSummary::of("age filter", &df));

        let df = Self::drop_missing(&df)?;
        stages.push(StageSummary::of("drop missing", &df));

        let df = Self::cast_categoricals(&df)?;
        stages.push(StageSummary::of("categorical cast", &df));

        let df = Self::relabel_target(&df)?;
        stages.push(StageSummary::of("target relabel", &df));

        info!(rows = df.height(), cols = df.width(), "cleaning complete");
        Ok(CleanReport { frame: df, stages })
    }

    /// Keep rows with `age <= max_age`. Rows with a missing age are dropped.
    pub fn filter_age(df: &DataFrame, max_age: f64) -> Result<DataFrame, CleanError> {
        required_column(df, schema::AGE)?;
        let filtered = df
            .clone()
            .lazy()
            .filter(col(schema::AGE).cast(DataType::Float64).lt_eq(lit(max_age)))
            .collect()?;

        debug!(
            removed = df.height() - filtered.height(),
            max_age, "filtered invalid ages"
        );
        Ok(filtered)
    }

    /// Drop every row with a missing value in any column.
    pub fn drop_missing(df: &DataFrame) -> Result<DataFrame, CleanError> {
        let kept = df.drop_nulls::<String>(None)?;
        debug!(removed = df.height() - kept.height(), "dropped incomplete rows");
        Ok(kept)
    }

    /// Validate and cast the categorical feature columns; check the target's raw codes.
    pub fn cast_categoricals(df: &DataFrame) -> Result<DataFrame, CleanError> {
        let mut out = df.clone();
        for factor in &FEATURE_FACTORS {
            let column = required_column(&out, factor.column)?.clone();
            validate_levels(&column, factor)?;
            let categorical = column.cast(&categorical_dtype())?;
            out.with_column(categorical)?;
        }
        status_codes(&out)?;
        Ok(out)
    }

    /// Rename target codes `0 -> Rejected`, `1 -> Approved` and make it categorical.
    pub fn relabel_target(df: &DataFrame) -> Result<DataFrame, CleanError> {
        let labels: Vec<&str> = status_codes(df)?
            .into_iter()
            .map(schema::status_label)
            .collect();

        let relabelled = Column::new(schema::LOAN_STATUS.into(), labels)
            .cast(&categorical_dtype())?;

        let mut out = df.clone();
        out.with_column(relabelled)?;
        Ok(out)
    }
}

fn categorical_dtype() -> DataType {
    DataType::Categorical(None, CategoricalOrdering::Physical)
}

fn required_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, CleanError> {
    df.column(name).map_err(|_| CleanError::MissingColumn {
        column: name.to_string(),
    })
}

fn validate_levels(column: &Column, factor: &Factor) -> Result<(), CleanError> {
    let as_text = column.cast(&DataType::String)?;
    for value in as_text.str()?.into_iter().flatten() {
        if factor.level_index(value).is_none() {
            return Err(CleanError::UnexpectedLevel {
                column: factor.column.to_string(),
                value: value.to_string(),
            });
        }
    }
    Ok(())
}

/// Raw 0/1 target codes as class indices.
fn status_codes(df: &DataFrame) -> Result<Vec<usize>, CleanError> {
    let raw = required_column(df, schema::LOAN_STATUS)?;
    let codes = raw.cast(&DataType::Float64)?;
    codes
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| match value {
            Some(v) if v == 0.0 => Ok(0),
            Some(v) if v == 1.0 => Ok(1),
            other => Err(CleanError::UnexpectedLevel {
                column: schema::LOAN_STATUS.to_string(),
                value: other.map_or_else(
                    || format!("<missing at row {row}>"),
                    |v| v.to_string(),
                ),
            }),
        })
        .collect()
}

/// Class indices (0 = Rejected, 1 = Approved) of a cleaned frame.
pub fn status_classes(df: &DataFrame) -> Result<Vec<usize>, CleanError> {
    let column = required_column(df, schema::LOAN_STATUS)?.cast(&DataType::String)?;
    column
        .str()?
        .into_iter()
        .map(|value| {
            let value = value.unwrap_or_default();
            schema::STATUS_FACTOR
                .level_index(value)
                .ok_or_else(|| CleanError::UnexpectedLevel {
                    column: schema::LOAN_STATUS.to_string(),
                    value: value.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(ages: &[Option<f64>], statuses: &[i64], intents: &[&str]) -> DataFrame {
        let n = ages.len();
        DataFrame::new(vec![
            Column::new(schema::AGE.into(), ages.to_vec()),
            Column::new(schema::GENDER.into(), vec!["female"; n]),
            Column::new(schema::EDUCATION.into(), vec!["Master"; n]),
            Column::new(schema::HOME_OWNERSHIP.into(), vec!["RENT"; n]),
            Column::new(schema::LOAN_INTENT.into(), intents.to_vec()),
            Column::new(schema::PRIOR_DEFAULTS.into(), vec!["No"; n]),
            Column::new(schema::LOAN_STATUS.into(), statuses.to_vec()),
        ])
        .unwrap()
    }

    #[test]
    fn age_filter_drops_sentinels_and_missing() {
        let df = frame(
            &[Some(30.0), Some(144.0), None, Some(100.0)],
            &[0, 1, 0, 1],
            &["MEDICAL"; 4],
        );
        let out = DataCleaner::filter_age(&df, 100.0).unwrap();
        assert_eq!(out.height(), 2);
        let ages: Vec<Option<f64>> = out
            .column(schema::AGE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ages, vec![Some(30.0), Some(100.0)]);
    }

    #[test]
    fn integer_ages_are_filtered_too() {
        let df = DataFrame::new(vec![
            Column::new(schema::AGE.into(), vec![Some(22i64), Some(123), None, Some(64)]),
            Column::new(schema::LOAN_STATUS.into(), vec![0i64, 1, 0, 1]),
        ])
        .unwrap();
        let out = DataCleaner::filter_age(&df, 100.0).unwrap();
        let statuses: Vec<Option<i64>> = out
            .column(schema::LOAN_STATUS)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(statuses, vec![Some(0), Some(1)]);
    }

    #[test]
    fn drop_missing_removes_any_incomplete_row() {
        let df = DataFrame::new(vec![
            Column::new("a".into(), vec![Some(1.0), None, Some(3.0)]),
            Column::new("b".into(), vec![Some("x"), Some("y"), None]),
        ])
        .unwrap();
        let out = DataCleaner::drop_missing(&df).unwrap();
        assert_eq!(out.height(), 1);
        assert_eq!(out.column("a").unwrap().f64().unwrap().get(0), Some(1.0));
        assert_eq!(missing_counts(&out).iter().map(|(_, n)| n).sum::<usize>(), 0);
    }

    #[test]
    fn relabel_preserves_row_mapping() {
        let df = frame(&[Some(25.0); 3], &[1, 0, 1], &["VENTURE"; 3]);
        let report = DataCleaner::clean(&df, &CleanConfig::default()).unwrap();
        assert_eq!(status_classes(&report.frame).unwrap(), vec![1, 0, 1]);
        assert!(matches!(
            report.frame.column(schema::LOAN_STATUS).unwrap().dtype(),
            DataType::Categorical(..)
        ));
        assert_eq!(report.stages.len(), 4);
    }

    #[test]
    fn unknown_level_fails_the_cast() {
        let df = frame(&[Some(25.0); 2], &[0, 1], &["MEDICAL", "GAMBLING"]);
        let err = DataCleaner::cast_categoricals(&df).unwrap_err();
        assert!(matches!(
            err,
            CleanError::UnexpectedLevel { ref value, .. } if value == "GAMBLING"
        ));
    }

    #[test]
    fn unknown_target_code_fails() {
        let df = frame(&[Some(25.0); 2], &[0, 2], &["MEDICAL"; 2]);
        assert!(DataCleaner::cast_categoricals(&df).is_err());
    }

    #[test]
    fn missing_column_is_reported() {
        let df = DataFrame::new(vec![Column::new("other".into(), vec![1.0])]).unwrap();
        let err = DataCleaner::filter_age(&df, 100.0).unwrap_err();
        assert!(matches!(err, CleanError::MissingColumn { .. }));
    }

    #[test]
    fn empty_result_propagates() {
        let df = frame(&[Some(120.0), Some(130.0)], &[0, 1], &["MEDICAL"; 2]);
        let report = DataCleaner::clean(&df, &CleanConfig::default()).unwrap();
        assert_eq!(report.frame.height(), 0);
    }
}
