//! CSV Data Loader Module
//! Handles CSV file loading and missing-value accounting using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Data file not found: {}", path.display())]
    FileNotFound { path: PathBuf },
    #[error("Failed to load CSV {}: {source}", path.display())]
    CsvError {
        path: PathBuf,
        #[source]
        source: PolarsError,
    },
}

/// Literal the dataset uses for missing cells (empty cells are missing too).
const NA_TOKEN: &str = "NA";

/// A freshly loaded table plus the path it came from.
#[derive(Debug, Clone)]
pub struct LoadedTable {
    df: DataFrame,
    file_path: PathBuf,
}

impl LoadedTable {
    /// (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.df.shape()
    }

    /// Per-column missing-value counts, in column order.
    pub fn missing_counts(&self) -> Vec<(String, usize)> {
        missing_counts(&self.df)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Per-column missing-value counts for any frame.
pub fn missing_counts(df: &DataFrame) -> Vec<(String, usize)> {
    df.get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count()))
        .collect()
}

/// Handles CSV file loading with Polars.
pub struct DataLoader {
    file_path: PathBuf,
}

impl DataLoader {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    /// Load the CSV file. Malformed rows are an error, not skipped.
    #[instrument(skip(self), fields(path = %self.file_path.display()))]
    pub fn load_csv(&self) -> Result<LoadedTable, LoaderError> {
        if !self.file_path.is_file() {
            return Err(LoaderError::FileNotFound {
                path: self.file_path.clone(),
            });
        }

        let to_csv_error = |source: PolarsError| LoaderError::CsvError {
            path: self.file_path.clone(),
            source,
        };

        let df = LazyCsvReader::new(&self.file_path)
            .with_has_header(true)
            .with_infer_schema_length(Some(10000))
            .with_null_values(Some(NullValues::AllColumnsSingle(NA_TOKEN.into())))
            .finish()
            .map_err(to_csv_error)?
            .collect()
            .map_err(to_csv_error)?;

        let (rows, cols) = df.shape();
        info!(rows, cols, "loaded CSV");
        debug!(columns = ?df.get_column_names(), "column names");

        Ok(LoadedTable {
            df,
            file_path: self.file_path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn missing_file_is_reported() {
        let err = DataLoader::new("does/not/exist.csv").load_csv().unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound { .. }));
    }

    #[test]
    fn counts_na_and_empty_cells_as_missing() {
        let file = write_csv("a,b,c\n1,x,2.5\nNA,y,\n3,,1.0\n");
        let table = DataLoader::new(file.path()).load_csv().unwrap();

        assert_eq!(table.shape(), (3, 3));
        let missing = table.missing_counts();
        assert_eq!(
            missing,
            vec![
                ("a".to_string(), 1),
                ("b".to_string(), 1),
                ("c".to_string(), 1)
            ]
        );
    }

    #[test]
    fn numeric_columns_are_detected() {
        let file = write_csv("age,name,score\n30,ann,1.5\n40,bob,2.5\n");
        let table = DataLoader::new(file.path()).load_csv().unwrap();
        let numeric: Vec<String> = table
            .frame()
            .get_columns()
            .iter()
            .filter(|col| is_numeric(col.dtype()))
            .map(|col| col.name().to_string())
            .collect();
        assert_eq!(numeric, vec!["age", "score"]);
    }
}
