use polars::prelude::PolarsError;

/// Errors from feature extraction and model fitting.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Returned when a frame column cannot be read as features.
    #[error("failed to read feature column")]
    Polars(#[from] PolarsError),

    /// Returned when a column is neither numeric nor a known categorical.
    #[error("column '{column}' is neither numeric nor a known categorical")]
    UnsupportedColumn {
        /// Name of the offending column.
        column: String,
    },

    /// Returned when a categorical cell is outside its level set.
    #[error("column '{column}' holds unexpected level '{value}'")]
    UnexpectedLevel {
        /// Name of the categorical column.
        column: String,
        /// The unknown value.
        value: String,
    },

    /// Returned when the training set has zero rows.
    #[error("training set has zero rows")]
    EmptyDataset,

    /// Returned when the training labels contain fewer than two classes.
    #[error("training labels contain {n_classes} distinct class(es), need 2")]
    SingleClass {
        /// Number of distinct classes observed.
        n_classes: usize,
    },

    /// Returned when a feature value is NaN or infinite.
    #[error("non-finite value at row {row}, feature '{feature}'")]
    NonFiniteValue {
        /// Row position inside the design matrix.
        row: usize,
        /// Feature name.
        feature: String,
    },

    /// Returned when a feature column has zero variance on the training rows.
    #[error("feature '{feature}' is constant on the training rows")]
    ConstantFeature {
        /// Feature name.
        feature: String,
    },

    /// Returned when the IRLS normal equations cannot be solved.
    #[error("design matrix is singular (IRLS iteration {iteration})")]
    SingularDesign {
        /// Zero-based IRLS iteration that failed.
        iteration: usize,
    },

    /// Returned when a class has fewer rows than cross-validation folds.
    #[error("class {class} has only {count} rows, need at least {n_folds} for {n_folds}-fold CV")]
    TooFewSamplesForFolds {
        /// The class index.
        class: usize,
        /// Rows of that class.
        count: usize,
        /// Requested fold count.
        n_folds: usize,
    },

    /// Returned when a configuration value is out of range.
    #[error("invalid model parameter: {0}")]
    InvalidParameter(String),

    /// Returned when prediction input has the wrong width.
    #[error("prediction input has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// Width the model was fitted on.
        expected: usize,
        /// Width supplied.
        got: usize,
    },
}
