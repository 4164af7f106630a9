//! Data module - CSV loading, cleaning and partitioning

mod cleaner;
mod loader;
pub mod schema;
mod splitter;

pub use cleaner::{status_classes, CleanConfig, CleanError, CleanReport, DataCleaner, StageSummary};
pub(crate) use loader::is_numeric;
pub use loader::{missing_counts, DataLoader, LoadedTable, LoaderError};
pub use splitter::{Partition, SplitError, StratifiedSplitter, Subset};
