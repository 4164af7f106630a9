//! End-to-end run: load, clean, split, fit both models, evaluate, render.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::charts::{ChartData, StaticChartRenderer};
use crate::config::PipelineConfig;
use crate::data::{schema, status_classes, CleanConfig, DataCleaner, DataLoader, StratifiedSplitter, Subset};
use crate::eval::{ClassMetrics, ConfusionMatrix, RocCurve};
use crate::model::{Encoding, FeatureTable, LambdaScore, LogisticCv, RandomForestConfig, RankedFeature};
use crate::report;
use crate::stats::StatsCalculator;

pub const METRICS_FILE: &str = "metrics.json";

/// Test-set performance of one classifier.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub class_metrics: Vec<ClassMetrics>,
}

impl ModelSummary {
    fn new(confusion: ConfusionMatrix) -> Self {
        Self {
            accuracy: confusion.accuracy(),
            class_metrics: confusion.class_metrics(),
            confusion,
        }
    }
}

/// Everything a run produced, also written as `metrics.json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub raw_rows: usize,
    pub raw_columns: usize,
    pub cleaned_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub train_class_counts: Vec<usize>,
    pub test_class_counts: Vec<usize>,
    pub cv_scores: Vec<LambdaScore>,
    pub best_lambda: f64,
    pub coefficients: Vec<(String, f64)>,
    pub logistic: ModelSummary,
    pub forest: ModelSummary,
    pub auc: f64,
    pub importances: Vec<RankedFeature>,
    pub chart_paths: Vec<PathBuf>,
    pub metrics_path: PathBuf,
}

pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate().context("invalid pipeline configuration")?;
        Ok(Self { config })
    }

    #[instrument(skip_all, fields(data = %self.config.data_path.display()))]
    pub fn run(&self) -> Result<RunSummary> {
        let config = &self.config;

        // 1. Load
        let loaded = DataLoader::new(&config.data_path)
            .load_csv()
            .context("failed to load loan data")?;
        let (raw_rows, raw_columns) = loaded.shape();
        println!("Loaded {}", loaded.file_path().display());
        report::print_dimensions("raw data", raw_rows, raw_columns);
        report::print_missing(&loaded.missing_counts());

        // 2. Clean
        let cleaned = DataCleaner::clean(
            loaded.frame(),
            &CleanConfig {
                max_age: config.max_age,
            },
        )
        .context("failed to clean loan data")?;
        report::print_cleaning(&cleaned.stages);
        let frame = cleaned.frame;

        let column_stats = StatsCalculator::compute_all_stats_parallel(&frame)
            .context("failed to compute descriptive statistics")?;
        report::print_column_stats(&column_stats);

        // 3. Split
        let labels = status_classes(&frame).context("failed to read loan status")?;
        let partition = StratifiedSplitter::new(config.train_fraction)
            .context("invalid train fraction")?
            .with_seed(config.seed)
            .split(&labels);
        let n_classes = schema::STATUS_LEVELS.len();
        let train_class_counts = partition.class_counts(Subset::Train, &labels, n_classes);
        let test_class_counts = partition.class_counts(Subset::Test, &labels, n_classes);
        report::print_split(
            partition.train.len(),
            partition.test.len(),
            &train_class_counts,
            &test_class_counts,
        );

        // 4. Logistic regression
        let dummies = FeatureTable::from_frame(&frame, Encoding::Dummy)
            .context("failed to build logistic design matrix")?;
        let train = dummies.rows(&partition.train);
        let test = dummies.rows(&partition.test);

        let cv = LogisticCv::new(config.cv_folds, config.lambda_grid.clone())
            .context("invalid cross-validation settings")?
            .with_seed(config.seed)
            .fit(&train)
            .context("logistic regression fit failed")?;
        report::print_cv(&cv);

        let predicted = cv
            .model
            .predict(&test.x)
            .context("logistic regression prediction failed")?;
        let logistic_cm = ConfusionMatrix::from_labels(&test.y, &predicted, &schema::STATUS_LEVELS)
            .context("failed to score logistic regression")?;
        report::print_confusion("Logistic Regression", &logistic_cm);

        // 5. Random forest
        let codes = FeatureTable::from_frame(&frame, Encoding::LevelCode)
            .context("failed to build random forest design matrix")?;
        let train = codes.rows(&partition.train);
        let test = codes.rows(&partition.test);

        let forest = RandomForestConfig::new(config.n_trees)
            .with_seed(config.seed)
            .fit(&train)
            .context("random forest fit failed")?;
        let predicted = forest
            .predict(&test.x)
            .context("random forest prediction failed")?;
        let forest_cm = ConfusionMatrix::from_labels(&test.y, &predicted, &schema::STATUS_LEVELS)
            .context("failed to score random forest")?;
        report::print_confusion("Random Forest", &forest_cm);

        let scores = forest
            .predict_proba(&test.x)
            .context("random forest probability prediction failed")?;
        let roc = RocCurve::compute(&scores.to_vec(), &test.y, 1)
            .context("failed to compute ROC curve")?;
        report::print_roc(&roc);

        let importances = forest.feature_importances();
        report::print_importances(&importances);

        // 6. Charts
        let chart_paths = if config.render_plots {
            let chart_data =
                ChartData::from_frame(&frame).context("failed to prepare chart data")?;
            StaticChartRenderer::render_all(
                &config.output_dir,
                &chart_data,
                config.loan_amount_clip,
                &importances,
                &roc,
            )
            .context("failed to render charts")?
        } else {
            info!("chart rendering disabled");
            Vec::new()
        };

        // 7. Metrics
        let summary = RunSummary {
            raw_rows,
            raw_columns,
            cleaned_rows: frame.height(),
            train_rows: partition.train.len(),
            test_rows: partition.test.len(),
            train_class_counts,
            test_class_counts,
            cv_scores: cv.scores.clone(),
            best_lambda: cv.best_lambda,
            coefficients: cv.model.coefficients(),
            logistic: ModelSummary::new(logistic_cm),
            forest: ModelSummary::new(forest_cm),
            auc: roc.auc(),
            importances,
            chart_paths,
            metrics_path: config.output_dir.join(METRICS_FILE),
        };
        write_metrics(&summary)?;

        info!(
            logistic_accuracy = summary.logistic.accuracy,
            forest_accuracy = summary.forest.accuracy,
            auc = summary.auc,
            "pipeline complete"
        );
        Ok(summary)
    }
}

fn write_metrics(summary: &RunSummary) -> Result<()> {
    let path = &summary.metrics_path;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(summary).context("failed to serialize metrics")?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    println!("Metrics written to {}", path.display());
    Ok(())
}
