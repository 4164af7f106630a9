//! Feature extraction from the cleaned frame into numeric design matrices.

use ndarray::Array2;
use polars::prelude::*;
use tracing::debug;

use crate::data::is_numeric;
use crate::data::schema::{self, Factor};
use crate::model::error::ModelError;

/// How categorical columns become numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Treatment contrasts: one indicator per non-reference level.
    Dummy,
    /// The level's index within its level set.
    LevelCode,
}

/// Features and labels for a subset of rows.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    /// `x[[row, feature]]`
    pub x: Array2<f64>,
    /// Class indices, 0 = Rejected, 1 = Approved.
    pub y: Vec<usize>,
    pub feature_names: Vec<String>,
}

impl DesignMatrix {
    pub fn n_rows(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }
}

/// Column-major numeric view of every feature column of a cleaned frame.
///
/// Built once, then sliced per partition so train and test share the
/// same columns.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    names: Vec<String>,
    columns: Vec<Vec<f64>>,
    labels: Vec<usize>,
}

impl FeatureTable {
    /// Every column except the target is a feature.
    pub fn from_frame(df: &DataFrame, encoding: Encoding) -> Result<Self, ModelError> {
        let mut names = Vec::new();
        let mut columns = Vec::new();

        for column in df.get_columns() {
            let name = column.name().as_str();
            if name == schema::LOAN_STATUS {
                continue;
            }

            if let Some(factor) = schema::factor_for(name) {
                let codes = level_codes(column, factor)?;
                match encoding {
                    Encoding::LevelCode => {
                        names.push(name.to_string());
                        columns.push(codes.iter().map(|&c| c as f64).collect());
                    }
                    Encoding::Dummy => {
                        // The first observed level is the reference.
                        for level_idx in observed_levels(&codes, factor).into_iter().skip(1) {
                            names.push(format!("{name}{}", factor.levels[level_idx]));
                            columns.push(
                                codes
                                    .iter()
                                    .map(|&c| if c == level_idx { 1.0 } else { 0.0 })
                                    .collect(),
                            );
                        }
                    }
                }
            } else if is_numeric(column.dtype()) {
                let values = column.cast(&DataType::Float64)?;
                names.push(name.to_string());
                columns.push(
                    values
                        .f64()?
                        .into_iter()
                        .map(|v| v.unwrap_or(f64::NAN))
                        .collect(),
                );
            } else {
                return Err(ModelError::UnsupportedColumn {
                    column: name.to_string(),
                });
            }
        }

        let status = df.column(schema::LOAN_STATUS)?;
        let labels = level_codes(status, &schema::STATUS_FACTOR)?;

        debug!(n_features = names.len(), ?encoding, "feature table built");
        Ok(Self {
            names,
            columns,
            labels,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.names
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Gather the given rows into a dense design matrix.
    pub fn rows(&self, rows: &[usize]) -> DesignMatrix {
        let x = Array2::from_shape_fn((rows.len(), self.columns.len()), |(i, j)| {
            self.columns[j][rows[i]]
        });
        let y = rows.iter().map(|&r| self.labels[r]).collect();
        DesignMatrix {
            x,
            y,
            feature_names: self.names.clone(),
        }
    }
}

/// Indices of the levels that occur at least once, in level order.
fn observed_levels(codes: &[usize], factor: &Factor) -> Vec<usize> {
    let mut seen = vec![false; factor.levels.len()];
    for &code in codes {
        seen[code] = true;
    }
    (0..seen.len()).filter(|&idx| seen[idx]).collect()
}

fn level_codes(column: &Column, factor: &Factor) -> Result<Vec<usize>, ModelError> {
    let as_text = column.cast(&DataType::String)?;
    as_text
        .str()?
        .into_iter()
        .map(|value| {
            let value = value.unwrap_or_default();
            factor
                .level_index(value)
                .ok_or_else(|| ModelError::UnexpectedLevel {
                    column: factor.column.to_string(),
                    value: value.to_string(),
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaned_frame() -> DataFrame {
        let cat = DataType::Categorical(None, CategoricalOrdering::Physical);
        DataFrame::new(vec![
            Column::new(schema::AGE.into(), vec![25.0, 40.0, 33.0]),
            Column::new(schema::HOME_OWNERSHIP.into(), vec!["RENT", "MORTGAGE", "OWN"])
                .cast(&cat)
                .unwrap(),
            Column::new(schema::LOAN_STATUS.into(), vec!["Approved", "Rejected", "Approved"])
                .cast(&cat)
                .unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn dummy_encoding_drops_reference_level() {
        let table = FeatureTable::from_frame(&cleaned_frame(), Encoding::Dummy).unwrap();
        assert_eq!(
            table.feature_names(),
            &[
                "person_age",
                "person_home_ownershipOWN",
                "person_home_ownershipRENT"
            ]
        );
        let design = table.rows(&[0, 1, 2]);
        assert_eq!(design.x.row(0).to_vec(), vec![25.0, 0.0, 1.0]);
        assert_eq!(design.x.row(1).to_vec(), vec![40.0, 0.0, 0.0]);
        assert_eq!(design.y, vec![1, 0, 1]);
    }

    #[test]
    fn unobserved_levels_get_no_dummy_column() {
        let cat = DataType::Categorical(None, CategoricalOrdering::Physical);
        let df = DataFrame::new(vec![
            Column::new(schema::HOME_OWNERSHIP.into(), vec!["RENT", "OWN", "RENT", "OWN"])
                .cast(&cat)
                .unwrap(),
            Column::new(
                schema::LOAN_STATUS.into(),
                vec!["Approved", "Rejected", "Rejected", "Approved"],
            )
            .cast(&cat)
            .unwrap(),
        ])
        .unwrap();

        let table = FeatureTable::from_frame(&df, Encoding::Dummy).unwrap();
        assert_eq!(table.feature_names(), &["person_home_ownershipRENT"]);

        // Every subset keeps the columns chosen from the full frame.
        let design = table.rows(&[1, 3]);
        assert_eq!(design.n_features(), 1);
        assert_eq!(design.x.column(0).to_vec(), vec![0.0, 0.0]);
    }

    #[test]
    fn level_codes_keep_one_column_per_factor() {
        let table = FeatureTable::from_frame(&cleaned_frame(), Encoding::LevelCode).unwrap();
        assert_eq!(table.feature_names().len(), 2);
        let design = table.rows(&[2, 0]);
        assert_eq!(design.x.row(0).to_vec(), vec![33.0, 2.0]);
        assert_eq!(design.x.row(1).to_vec(), vec![25.0, 3.0]);
        assert_eq!(design.y, vec![1, 1]);
    }

    #[test]
    fn text_columns_outside_schema_are_rejected() {
        let df = DataFrame::new(vec![
            Column::new("notes".into(), vec!["a"]),
            Column::new(schema::LOAN_STATUS.into(), vec!["Approved"]),
        ])
        .unwrap();
        let err = FeatureTable::from_frame(&df, Encoding::Dummy).unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedColumn { .. }));
    }
}
