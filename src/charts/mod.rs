//! Charts module - Chart rendering

mod data;
mod renderer;

pub use data::{BoxGroup, ChartData, Facet};
pub use renderer::{
    ChartError, StaticChartRenderer, FEATURE_IMPORTANCE_FILE, LOAN_AMOUNT_FILE, ROC_CURVE_FILE,
    SCORE_VS_RATE_FILE, STATUS_DISTRIBUTION_FILE,
};
