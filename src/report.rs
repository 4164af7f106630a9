//! Console Report
//! Human-readable summaries printed to stdout as the pipeline runs.

use crate::data::{schema, StageSummary};
use crate::eval::{ConfusionMatrix, RocCurve};
use crate::model::{CvLogistic, RankedFeature};
use crate::stats::ColumnStats;

/// Number of importances printed.
const TOP_FEATURES: usize = 10;

fn heading(title: &str) {
    println!();
    println!("=== {title} ===");
}

pub fn print_dimensions(label: &str, rows: usize, columns: usize) {
    println!("{label:<22} {rows:>8} rows x {columns} columns");
}

/// Only columns with at least one missing value are listed.
pub fn print_missing(missing: &[(String, usize)]) {
    let with_gaps: Vec<_> = missing.iter().filter(|(_, n)| *n > 0).collect();
    if with_gaps.is_empty() {
        println!("  no missing values");
        return;
    }
    for (column, n) in with_gaps {
        println!("  {column:<32} {n:>6} missing");
    }
}

pub fn print_cleaning(stages: &[StageSummary]) {
    heading("Cleaning");
    for stage in stages {
        println!("{}", stage_line(stage));
        print_missing(&stage.missing);
    }
}

fn stage_line(stage: &StageSummary) -> String {
    format!(
        "{:<22} {:>8} rows x {} columns, {} missing values",
        format!("after {}", stage.stage),
        stage.rows,
        stage.columns,
        stage.total_missing()
    )
}

pub fn print_column_stats(stats: &[ColumnStats]) {
    heading("Numeric Summary by Loan Status");
    println!(
        "{:<28} {:<9} {:>6} {:>12} {:>12} {:>12} {:>12} {:>12}",
        "column", "status", "n", "mean", "median", "std", "p05", "p95"
    );
    for column in stats {
        for g in &column.group_stats {
            println!(
                "{:<28} {:<9} {:>6} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                column.column, g.group_name, g.count, g.mean, g.median, g.std, g.p05, g.p95
            );
        }
    }
}

pub fn print_split(train: usize, test: usize, train_counts: &[usize], test_counts: &[usize]) {
    heading("Train/Test Split");
    println!("training set: {train} rows");
    println!("test set:     {test} rows");
    for (class, name) in schema::STATUS_LEVELS.iter().enumerate() {
        println!(
            "  {name:<9} train {:>6}  test {:>6}",
            train_counts.get(class).copied().unwrap_or(0),
            test_counts.get(class).copied().unwrap_or(0)
        );
    }
}

pub fn print_cv(cv: &CvLogistic) {
    heading(&format!("Logistic Regression ({}-fold CV)", cv.n_folds));
    println!("{:>10} {:>14} {:>14}", "lambda", "deviance", "accuracy");
    for score in &cv.scores {
        let marker = if score.lambda == cv.best_lambda { " *" } else { "" };
        println!(
            "{:>10.4} {:>14.6} {:>14.4}{marker}",
            score.lambda, score.mean_deviance, score.mean_accuracy
        );
    }
    println!("selected lambda: {}", cv.best_lambda);
    println!(
        "IRLS iterations: {} (converged: {})",
        cv.model.iterations(),
        cv.model.converged()
    );
}

pub fn print_confusion(model: &str, cm: &ConfusionMatrix) {
    heading(&format!("{model} Confusion Matrix"));
    print!("{cm}");
    for m in cm.class_metrics() {
        println!(
            "  {:<9} precision {:.4}  recall {:.4}  specificity {:.4}  f1 {:.4}",
            m.class, m.precision, m.recall, m.specificity, m.f1
        );
    }
    println!("{model} Accuracy: {:.2}%", cm.accuracy() * 100.0);
}

pub fn print_roc(roc: &RocCurve) {
    println!("Random Forest AUC: {:.4}", roc.auc());
}

pub fn print_importances(importances: &[RankedFeature]) {
    heading("Random Forest Feature Importance");
    for feature in importances.iter().take(TOP_FEATURES) {
        println!(
            "{:>3}. {:<32} {:.4}",
            feature.rank, feature.name, feature.importance
        );
    }
}
