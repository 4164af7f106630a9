mod cross_validation;
mod design;
mod error;
mod forest;
mod linalg;
mod logistic;
mod tree;

pub use cross_validation::{CvLogistic, LambdaScore, LogisticCv};
pub use design::{DesignMatrix, Encoding, FeatureTable};
pub use error::ModelError;
pub use forest::{RandomForest, RandomForestConfig, RankedFeature};
pub use linalg::cholesky_solve;
pub use logistic::{binomial_deviance, FittedLogistic, LogisticRegression};
pub use tree::{gini, DecisionTree};
