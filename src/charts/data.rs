//! Chart Data
//! Series extracted from the cleaned frame, ready for rendering.

use polars::prelude::*;

use crate::data::schema;
use crate::stats::{BoxStats, StatsCalculator};

/// One box of a box plot.
#[derive(Debug, Clone)]
pub struct BoxGroup {
    pub label: String,
    /// `None` when the group has no rows.
    pub stats: Option<BoxStats>,
    /// Values beyond the whiskers.
    pub outliers: Vec<f64>,
}

impl BoxGroup {
    pub fn new(label: impl Into<String>, values: &[f64]) -> Self {
        let stats = StatsCalculator::box_stats(values);
        let outliers = stats.map_or_else(Vec::new, |b| {
            values
                .iter()
                .copied()
                .filter(|&v| v < b.lower_whisker || v > b.upper_whisker)
                .collect()
        });
        Self {
            label: label.into(),
            stats,
            outliers,
        }
    }
}

/// A panel of box plots sharing one y axis.
#[derive(Debug, Clone)]
pub struct Facet {
    pub title: String,
    pub boxes: Vec<BoxGroup>,
}

/// Everything the data-driven charts need.
#[derive(Debug, Clone)]
pub struct ChartData {
    /// Rows per loan status, in class order.
    pub status_counts: Vec<(String, usize)>,
    /// Loan amount by intent, one facet per loan status.
    pub amount_facets: Vec<Facet>,
    /// `(credit_score, loan_int_rate)` per loan status.
    pub score_vs_rate: Vec<(String, Vec<(f64, f64)>)>,
}

impl ChartData {
    pub fn from_frame(df: &DataFrame) -> PolarsResult<Self> {
        let status_col = df.column(schema::LOAN_STATUS)?.cast(&DataType::String)?;
        let intent_col = df.column(schema::LOAN_INTENT)?.cast(&DataType::String)?;
        let amount_col = df.column(schema::LOAN_AMOUNT)?.cast(&DataType::Float64)?;
        let score_col = df.column(schema::CREDIT_SCORE)?.cast(&DataType::Float64)?;
        let rate_col = df.column(schema::INTEREST_RATE)?.cast(&DataType::Float64)?;

        let status = status_col.str()?;
        let intent = intent_col.str()?;
        let amount = amount_col.f64()?;
        let score = score_col.f64()?;
        let rate = rate_col.f64()?;

        let intents = schema::factor_for(schema::LOAN_INTENT).map_or(&[][..], |f| f.levels);
        let n_status = schema::STATUS_LEVELS.len();

        let mut counts = vec![0usize; n_status];
        let mut amounts = vec![vec![Vec::new(); intents.len()]; n_status];
        let mut scatter = vec![Vec::new(); n_status];

        for row in 0..df.height() {
            let Some(s) = status
                .get(row)
                .and_then(|v| schema::STATUS_FACTOR.level_index(v))
            else {
                continue;
            };
            counts[s] += 1;

            let level = intent
                .get(row)
                .and_then(|v| intents.iter().position(|l| *l == v));
            if let (Some(i), Some(a)) = (level, amount.get(row)) {
                amounts[s][i].push(a);
            }
            if let (Some(x), Some(y)) = (score.get(row), rate.get(row)) {
                scatter[s].push((x, y));
            }
        }

        let status_counts = schema::STATUS_LEVELS
            .iter()
            .zip(counts)
            .map(|(name, count)| (name.to_string(), count))
            .collect();

        let amount_facets = schema::STATUS_LEVELS
            .iter()
            .zip(amounts)
            .map(|(name, by_intent)| Facet {
                title: name.to_string(),
                boxes: intents
                    .iter()
                    .zip(by_intent)
                    .map(|(intent, values)| BoxGroup::new(*intent, &values))
                    .collect(),
            })
            .collect();

        let score_vs_rate = schema::STATUS_LEVELS
            .iter()
            .zip(scatter)
            .map(|(name, points)| (name.to_string(), points))
            .collect();

        Ok(Self {
            status_counts,
            amount_facets,
            score_vs_rate,
        })
    }
}
