//! Statistics Calculator Module
//! Descriptive statistics per loan status and box-plot summaries.

use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;

use crate::data::schema;

/// Statistics for a single group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupStats {
    pub group_name: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub variance: f64,
    pub p95: f64,
    pub p05: f64,
}

impl Default for GroupStats {
    fn default() -> Self {
        Self {
            group_name: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            variance: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
        }
    }
}

/// One numeric column summarized for every loan status.
#[derive(Debug, Clone, Serialize)]
pub struct ColumnStats {
    pub column: String,
    /// In `Rejected`, `Approved` order.
    pub group_stats: Vec<GroupStats>,
}

/// Tukey box: quartiles plus whiskers at the most extreme points within 1.5 IQR.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxStats {
    pub lower_whisker: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub upper_whisker: f64,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> GroupStats {
        let n = values.len();
        if n == 0 {
            return GroupStats::default();
        }

        let sorted = Self::sorted(values);

        let mean = values.iter().sum::<f64>() / n as f64;
        let median = Self::percentile(&sorted, 50.0);

        let variance = if n > 1 {
            values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };

        GroupStats {
            group_name: String::new(),
            count: n,
            mean,
            median,
            std: variance.sqrt(),
            variance,
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Box-plot summary, `None` for an empty slice.
    pub fn box_stats(values: &[f64]) -> Option<BoxStats> {
        if values.is_empty() {
            return None;
        }
        let sorted = Self::sorted(values);
        let q1 = Self::percentile(&sorted, 25.0);
        let median = Self::percentile(&sorted, 50.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let (lo_fence, hi_fence) = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

        let lower_whisker = sorted
            .iter()
            .copied()
            .find(|&v| v >= lo_fence)
            .unwrap_or(q1);
        let upper_whisker = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= hi_fence)
            .unwrap_or(q3);

        Some(BoxStats {
            lower_whisker,
            q1,
            median,
            q3,
            upper_whisker,
        })
    }

    /// Non-null values of `column` for rows whose status is `status`.
    pub fn get_values_for_status(
        df: &DataFrame,
        column: &str,
        status: &str,
    ) -> PolarsResult<Vec<f64>> {
        let filtered = df
            .clone()
            .lazy()
            .filter(
                col(schema::LOAN_STATUS)
                    .cast(DataType::String)
                    .eq(lit(status)),
            )
            .select([col(column).cast(DataType::Float64)])
            .collect()?;

        Ok(filtered
            .column(column)?
            .f64()?
            .into_iter()
            .flatten()
            .collect())
    }

    /// Statistics for every status level of one column.
    pub fn compute_column_stats(df: &DataFrame, column: &str) -> PolarsResult<ColumnStats> {
        let group_stats = schema::STATUS_LEVELS
            .iter()
            .map(|&status| {
                let values = Self::get_values_for_status(df, column, status)?;
                let mut gs = Self::compute_descriptive_stats(&values);
                gs.group_name = status.to_string();
                Ok(gs)
            })
            .collect::<PolarsResult<Vec<_>>>()?;

        Ok(ColumnStats {
            column: column.to_string(),
            group_stats,
        })
    }

    /// Compute statistics for all numeric columns in parallel.
    pub fn compute_all_stats_parallel(df: &DataFrame) -> PolarsResult<Vec<ColumnStats>> {
        let present: Vec<&str> = schema::NUMERIC_COLUMNS
            .iter()
            .copied()
            .filter(|name| df.column(name).is_ok())
            .collect();

        // Use rayon for parallel computation
        present
            .par_iter()
            .map(|column| Self::compute_column_stats(df, column))
            .collect()
    }

    fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        sorted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptive_stats_of_small_sample() {
        let stats = StatsCalculator::compute_descriptive_stats(&[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(stats.count, 4);
        assert!((stats.mean - 2.5).abs() < 1e-12);
        assert!((stats.median - 2.5).abs() < 1e-12);
        assert!((stats.variance - 5.0 / 3.0).abs() < 1e-12);
        assert!((stats.p05 - 1.15).abs() < 1e-12);
        assert!((stats.p95 - 3.85).abs() < 1e-12);
    }

    #[test]
    fn empty_sample_is_nan() {
        let stats = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn box_whiskers_stop_at_fences() {
        let mut values: Vec<f64> = (1..=9).map(f64::from).collect();
        values.push(100.0);
        let b = StatsCalculator::box_stats(&values).unwrap();
        assert!((b.q1 - 3.25).abs() < 1e-12);
        assert!((b.median - 5.5).abs() < 1e-12);
        assert!((b.q3 - 7.75).abs() < 1e-12);
        assert!((b.lower_whisker - 1.0).abs() < 1e-12);
        assert!((b.upper_whisker - 9.0).abs() < 1e-12);
        assert!(StatsCalculator::box_stats(&[]).is_none());
    }

    #[test]
    fn per_status_stats_split_rows() {
        let cat = DataType::Categorical(None, CategoricalOrdering::Physical);
        let df = DataFrame::new(vec![
            Column::new(schema::INCOME.into(), vec![10.0, 20.0, 30.0, 50.0]),
            Column::new(
                schema::LOAN_STATUS.into(),
                vec!["Rejected", "Approved", "Rejected", "Approved"],
            )
            .cast(&cat)
            .unwrap(),
        ])
        .unwrap();

        let all = StatsCalculator::compute_all_stats_parallel(&df).unwrap();
        assert_eq!(all.len(), 1);
        let groups = &all[0].group_stats;
        assert_eq!(groups[0].group_name, "Rejected");
        assert!((groups[0].mean - 20.0).abs() < 1e-12);
        assert_eq!(groups[1].group_name, "Approved");
        assert!((groups[1].mean - 35.0).abs() < 1e-12);
    }
}
