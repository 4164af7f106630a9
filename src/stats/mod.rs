//! Stats module - Descriptive statistics

mod calculator;

pub use calculator::{BoxStats, ColumnStats, GroupStats, StatsCalculator};
