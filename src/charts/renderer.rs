//! Static Chart Renderer
//! Writes the analysis charts as SVG files.
//!
//! Charts:
//! 1. Loan status distribution (bar chart)
//! 2. Loan amount by intent, one panel per status (box plots)
//! 3. Credit score vs interest rate, colored by status (scatter)
//! 4. Random forest feature importance (horizontal bars)
//! 5. ROC curve of the random forest

use std::path::{Path, PathBuf};

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::{debug, info, instrument};

use crate::charts::{ChartData, Facet};
use crate::eval::RocCurve;
use crate::model::RankedFeature;

pub const STATUS_DISTRIBUTION_FILE: &str = "loan_status_distribution.svg";
pub const LOAN_AMOUNT_FILE: &str = "loan_amount_by_intent.svg";
pub const SCORE_VS_RATE_FILE: &str = "credit_score_vs_interest_rate.svg";
pub const FEATURE_IMPORTANCE_FILE: &str = "feature_importance.svg";
pub const ROC_CURVE_FILE: &str = "roc_curve.svg";

// Colors
const BLUE: RGBColor = RGBColor(91, 155, 213); // Rejected
const ORANGE: RGBColor = RGBColor(237, 125, 49); // Approved
const GREEN: RGBColor = RGBColor(112, 173, 71);
const GRAY: RGBColor = RGBColor(170, 170, 170);

const SIZE: (u32, u32) = (1000, 700);
const WIDE: (u32, u32) = (1400, 700);

type DrawResult = Result<(), DrawingAreaErrorKind<std::io::Error>>;

/// Errors raised while writing charts.
#[derive(Debug, thiserror::Error)]
pub enum ChartError {
    #[error("failed to create chart directory {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to draw {path}: {message}")]
    Draw { path: PathBuf, message: String },

    #[error("no data to plot for the {chart} chart")]
    NoData { chart: &'static str },
}

impl ChartError {
    fn draw(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Draw {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}

fn status_color(class: usize) -> RGBColor {
    match class {
        0 => BLUE,
        _ => ORANGE,
    }
}

fn segment_label(value: &SegmentValue<u32>, names: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) => names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    /// Render every chart into `out_dir`, creating it when needed.
    #[instrument(skip_all, fields(out_dir = %out_dir.display()))]
    pub fn render_all(
        out_dir: &Path,
        data: &ChartData,
        amount_clip: f64,
        importances: &[RankedFeature],
        roc: &RocCurve,
    ) -> Result<Vec<PathBuf>, ChartError> {
        std::fs::create_dir_all(out_dir).map_err(|source| ChartError::Io {
            path: out_dir.to_path_buf(),
            source,
        })?;

        let paths: Vec<PathBuf> = [
            STATUS_DISTRIBUTION_FILE,
            LOAN_AMOUNT_FILE,
            SCORE_VS_RATE_FILE,
            FEATURE_IMPORTANCE_FILE,
            ROC_CURVE_FILE,
        ]
        .iter()
        .map(|name| out_dir.join(name))
        .collect();

        Self::status_distribution(&paths[0], &data.status_counts)?;
        Self::loan_amount_by_intent(&paths[1], &data.amount_facets, amount_clip)?;
        Self::score_vs_rate(&paths[2], &data.score_vs_rate)?;
        Self::feature_importance(&paths[3], importances)?;
        Self::roc_curve(&paths[4], roc)?;

        info!(n_charts = paths.len(), "charts written");
        Ok(paths)
    }

    pub fn status_distribution(path: &Path, counts: &[(String, usize)]) -> Result<(), ChartError> {
        if counts.is_empty() {
            return Err(ChartError::NoData {
                chart: "status distribution",
            });
        }
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        Self::draw_status_distribution(&root, counts).map_err(|e| ChartError::draw(path, e))?;
        root.present().map_err(|e| ChartError::draw(path, e))?;
        debug!(path = %path.display(), "status distribution written");
        Ok(())
    }

    fn draw_status_distribution(
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        counts: &[(String, usize)],
    ) -> DrawResult {
        root.fill(&WHITE)?;

        let names: Vec<String> = counts.iter().map(|(name, _)| name.clone()).collect();
        let max = counts.iter().map(|(_, c)| *c).max().unwrap_or(0) as u32;
        let n = counts.len() as u32;

        let mut chart = ChartBuilder::on(root)
            .caption("Distribution of Loan Status", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d((0u32..n).into_segmented(), 0u32..(max + max / 10 + 1))?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(counts.len())
            .x_label_formatter(&|v| segment_label(v, &names))
            .x_desc("Loan Status")
            .y_desc("Count")
            .draw()?;

        chart.draw_series(counts.iter().enumerate().map(|(i, (_, count))| {
            let i = i as u32;
            let mut bar = Rectangle::new(
                [
                    (SegmentValue::Exact(i), 0),
                    (SegmentValue::Exact(i + 1), *count as u32),
                ],
                status_color(i as usize).filled(),
            );
            bar.set_margin(0, 0, 60, 60);
            bar
        }))?;

        Ok(())
    }

    /// Box plots of loan amount per intent. Values are clamped to `[0, clip]`
    /// for display; the quartiles come from the unclipped data.
    pub fn loan_amount_by_intent(path: &Path, facets: &[Facet], clip: f64) -> Result<(), ChartError> {
        if facets.is_empty() || facets.iter().all(|f| f.boxes.is_empty()) {
            return Err(ChartError::NoData {
                chart: "loan amount",
            });
        }
        let root = SVGBackend::new(path, WIDE).into_drawing_area();
        Self::draw_loan_amount(&root, facets, clip).map_err(|e| ChartError::draw(path, e))?;
        root.present().map_err(|e| ChartError::draw(path, e))?;
        debug!(path = %path.display(), "loan amount box plots written");
        Ok(())
    }

    fn draw_loan_amount(
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        facets: &[Facet],
        clip: f64,
    ) -> DrawResult {
        root.fill(&WHITE)?;
        let root = root.titled("Loan Amount by Intent and Loan Status", ("sans-serif", 24))?;
        let panels = root.split_evenly((1, facets.len()));
        let clamp = |v: f64| v.clamp(0.0, clip);

        for (facet_idx, (panel, facet)) in panels.iter().zip(facets).enumerate() {
            let names: Vec<String> = facet.boxes.iter().map(|b| b.label.clone()).collect();
            let n = facet.boxes.len() as u32;
            let color = status_color(facet_idx);

            let mut chart = ChartBuilder::on(panel)
                .caption(&facet.title, ("sans-serif", 18))
                .margin(10)
                .x_label_area_size(130)
                .y_label_area_size(70)
                .build_cartesian_2d((0u32..n).into_segmented(), 0f64..clip)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .x_labels(facet.boxes.len())
                .x_label_formatter(&|v| segment_label(v, &names))
                .x_label_style(
                    ("sans-serif", 12)
                        .into_font()
                        .transform(FontTransform::Rotate90),
                )
                .y_desc("Loan Amount")
                .y_label_formatter(&|v| format!("{v:.0}"))
                .draw()?;

            for (i, group) in facet.boxes.iter().enumerate() {
                let Some(b) = group.stats else {
                    continue;
                };
                let i = i as u32;
                let center = SegmentValue::CenterOf(i);

                // Whiskers
                chart.draw_series([
                    PathElement::new(
                        vec![(center.clone(), clamp(b.lower_whisker)), (center.clone(), clamp(b.q1))],
                        BLACK.stroke_width(1),
                    ),
                    PathElement::new(
                        vec![(center.clone(), clamp(b.q3)), (center, clamp(b.upper_whisker))],
                        BLACK.stroke_width(1),
                    ),
                ])?;

                // Box
                let corners = [
                    (SegmentValue::Exact(i), clamp(b.q1)),
                    (SegmentValue::Exact(i + 1), clamp(b.q3)),
                ];
                let mut fill = Rectangle::new(corners.clone(), color.mix(0.6).filled());
                fill.set_margin(0, 0, 18, 18);
                let mut outline = Rectangle::new(corners, BLACK.stroke_width(1));
                outline.set_margin(0, 0, 18, 18);
                let mut median = Rectangle::new(
                    [
                        (SegmentValue::Exact(i), clamp(b.median)),
                        (SegmentValue::Exact(i + 1), clamp(b.median)),
                    ],
                    BLACK.stroke_width(2),
                );
                median.set_margin(0, 0, 18, 18);
                chart.draw_series([fill, outline, median])?;

                chart.draw_series(group.outliers.iter().map(|&v| {
                    Circle::new((SegmentValue::CenterOf(i), clamp(v)), 2, BLACK.filled())
                }))?;
            }
        }

        Ok(())
    }

    pub fn score_vs_rate(path: &Path, series: &[(String, Vec<(f64, f64)>)]) -> Result<(), ChartError> {
        let all = series.iter().flat_map(|(_, points)| points.iter());
        let (mut x0, mut x1, mut y0, mut y1) = (
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
        );
        for &(x, y) in all {
            x0 = x0.min(x);
            x1 = x1.max(x);
            y0 = y0.min(y);
            y1 = y1.max(y);
        }
        if !(x0.is_finite() && y0.is_finite()) {
            return Err(ChartError::NoData {
                chart: "credit score vs interest rate",
            });
        }
        let pad_x = ((x1 - x0) * 0.05).max(1.0);
        let pad_y = ((y1 - y0) * 0.05).max(0.5);
        let bounds = ((x0 - pad_x)..(x1 + pad_x), (y0 - pad_y)..(y1 + pad_y));

        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        Self::draw_score_vs_rate(&root, series, bounds).map_err(|e| ChartError::draw(path, e))?;
        root.present().map_err(|e| ChartError::draw(path, e))?;
        debug!(path = %path.display(), "scatter written");
        Ok(())
    }

    fn draw_score_vs_rate(
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        series: &[(String, Vec<(f64, f64)>)],
        (x_range, y_range): (std::ops::Range<f64>, std::ops::Range<f64>),
    ) -> DrawResult {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption("Credit Score vs Interest Rate", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(x_range, y_range)?;

        chart
            .configure_mesh()
            .x_desc("Credit Score")
            .y_desc("Interest Rate (%)")
            .x_label_formatter(&|v| format!("{v:.0}"))
            .draw()?;

        for (class, (name, points)) in series.iter().enumerate() {
            let color = status_color(class);
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&p| Circle::new(p, 2, color.mix(0.5).filled())),
                )?
                .label(name.as_str())
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;

        Ok(())
    }

    pub fn feature_importance(path: &Path, importances: &[RankedFeature]) -> Result<(), ChartError> {
        if importances.is_empty() {
            return Err(ChartError::NoData {
                chart: "feature importance",
            });
        }
        let root = SVGBackend::new(path, SIZE).into_drawing_area();
        Self::draw_feature_importance(&root, importances).map_err(|e| ChartError::draw(path, e))?;
        root.present().map_err(|e| ChartError::draw(path, e))?;
        debug!(path = %path.display(), "feature importance written");
        Ok(())
    }

    fn draw_feature_importance(
        root: &DrawingArea<SVGBackend<'_>, Shift>,
        importances: &[RankedFeature],
    ) -> DrawResult {
        root.fill(&WHITE)?;

        // Most important feature on top.
        let names: Vec<String> = importances.iter().rev().map(|f| f.name.clone()).collect();
        let n = importances.len() as u32;
        let max = importances
            .iter()
            .map(|f| f.importance)
            .fold(0.0f64, f64::max)
            .max(1e-9);

        let mut chart = ChartBuilder::on(root)
            .caption("Random Forest Feature Importance (Gini)", ("sans-serif", 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(230)
            .build_cartesian_2d(0f64..max * 1.1, (0u32..n).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(importances.len())
            .y_label_formatter(&|v| segment_label(v, &names))
            .x_desc("Mean Decrease in Gini (normalized)")
            .draw()?;

        chart.draw_series(importances.iter().rev().enumerate().map(|(pos, feature)| {
            let pos = pos as u32;
            let mut bar = Rectangle::new(
                [
                    (0.0, SegmentValue::Exact(pos)),
                    (feature.importance, SegmentValue::Exact(pos + 1)),
                ],
                GREEN.filled(),
            );
            bar.set_margin(3, 3, 0, 0);
            bar
        }))?;

        Ok(())
    }

    pub fn roc_curve(path: &Path, roc: &RocCurve) -> Result<(), ChartError> {
        if roc.points().is_empty() {
            return Err(ChartError::NoData { chart: "ROC" });
        }
        let root = SVGBackend::new(path, (800, 800)).into_drawing_area();
        Self::draw_roc(&root, roc).map_err(|e| ChartError::draw(path, e))?;
        root.present().map_err(|e| ChartError::draw(path, e))?;
        debug!(path = %path.display(), "ROC curve written");
        Ok(())
    }

    fn draw_roc(root: &DrawingArea<SVGBackend<'_>, Shift>, roc: &RocCurve) -> DrawResult {
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(root)
            .caption(
                format!("ROC Curve - Random Forest (AUC = {:.4})", roc.auc()),
                ("sans-serif", 22),
            )
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(60)
            .build_cartesian_2d(0f64..1f64, 0f64..1f64)?;

        chart
            .configure_mesh()
            .x_desc("False Positive Rate (1 - Specificity)")
            .y_desc("True Positive Rate (Sensitivity)")
            .draw()?;

        chart.draw_series(LineSeries::new(vec![(0.0, 0.0), (1.0, 1.0)], &GRAY))?;
        chart.draw_series(LineSeries::new(
            roc.points().iter().map(|p| (p.fpr, p.tpr)),
            ORANGE.stroke_width(2),
        ))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::BoxGroup;

    fn sample_facets() -> Vec<Facet> {
        ["Rejected", "Approved"]
            .iter()
            .map(|title| Facet {
                title: title.to_string(),
                boxes: vec![
                    BoxGroup::new("MEDICAL", &[1000.0, 5000.0, 9000.0, 40000.0]),
                    BoxGroup::new("VENTURE", &[]),
                ],
            })
            .collect()
    }

    #[test]
    fn writes_every_chart() {
        let dir = tempfile::tempdir().unwrap();
        let data = ChartData {
            status_counts: vec![("Rejected".into(), 70), ("Approved".into(), 30)],
            amount_facets: sample_facets(),
            score_vs_rate: vec![
                ("Rejected".into(), vec![(600.0, 11.0), (640.0, 10.5)]),
                ("Approved".into(), vec![(580.0, 15.0)]),
            ],
        };
        let importances = vec![
            RankedFeature {
                name: "loan_int_rate".into(),
                importance: 0.7,
                rank: 1,
            },
            RankedFeature {
                name: "person_income".into(),
                importance: 0.3,
                rank: 2,
            },
        ];
        let roc = RocCurve::compute(&[0.9, 0.4, 0.3, 0.1], &[1, 0, 1, 0], 1).unwrap();

        let out = dir.path().join("plots");
        let paths =
            StaticChartRenderer::render_all(&out, &data, 35_000.0, &importances, &roc).unwrap();

        assert_eq!(paths.len(), 5);
        for path in &paths {
            let svg = std::fs::read_to_string(path).unwrap();
            assert!(svg.contains("<svg"), "{} is not an SVG", path.display());
        }
        let amount_svg = std::fs::read_to_string(out.join(LOAN_AMOUNT_FILE)).unwrap();
        assert!(amount_svg.contains("<circle"), "outlier points missing");
        let roc_svg = std::fs::read_to_string(out.join(ROC_CURVE_FILE)).unwrap();
        assert!(roc_svg.contains("AUC = 0.7500"));
    }

    #[test]
    fn empty_inputs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = StaticChartRenderer::feature_importance(&dir.path().join("x.svg"), &[]).unwrap_err();
        assert!(matches!(err, ChartError::NoData { .. }));
        let err = StaticChartRenderer::score_vs_rate(&dir.path().join("y.svg"), &[]).unwrap_err();
        assert!(matches!(err, ChartError::NoData { .. }));
    }
}
