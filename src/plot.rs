use std::fmt::Display;
use std::path::Path;

use plotters::prelude::*;
use tracing::info;

use crate::error::CutoffError;
use crate::threshold_sweep::ThresholdReport;

fn plot_error<E: Display>(path: &Path) -> impl Fn(E) -> CutoffError + '_ {
    move |e| CutoffError::Plot {
        path: path.to_path_buf(),
        reason: e.to_string(),
    }
}

/// Draws precision and recall against threshold (left) and the
/// precision-recall curve (right) into a PNG. Undefined points are skipped.
pub fn draw_precision_recall(path: &Path, reports: &[ThresholdReport]) -> Result<(), CutoffError> {
    let root = BitMapBackend::new(path, (1280, 560)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error(path))?;
    let (left, right) = root.split_horizontally(640);

    let t_min = reports.iter().map(|r| r.threshold).fold(0.0, f64::min);
    let t_max = reports.iter().map(|r| r.threshold).fold(1.0, f64::max);

    let mut by_threshold = ChartBuilder::on(&left)
        .caption("Precision and recall by threshold", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(t_min..t_max, 0.0..1.05)
        .map_err(plot_error(path))?;
    by_threshold
        .configure_mesh()
        .x_desc("Threshold")
        .y_desc("Rate")
        .y_label_formatter(&|value| format!("{value:.2}"))
        .draw()
        .map_err(plot_error(path))?;

    by_threshold
        .draw_series(LineSeries::new(
            reports
                .iter()
                .filter_map(|r| r.precision.map(|p| (r.threshold, p))),
            &BLUE,
        ))
        .map_err(plot_error(path))?
        .label("precision")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    by_threshold
        .draw_series(LineSeries::new(
            reports
                .iter()
                .filter_map(|r| r.recall.map(|recall| (r.threshold, recall))),
            &RED,
        ))
        .map_err(plot_error(path))?
        .label("recall")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));
    by_threshold
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error(path))?;

    let curve: Vec<(f64, f64)> = reports
        .iter()
        .filter_map(|r| Some((r.recall?, r.precision?)))
        .collect();

    let mut pr = ChartBuilder::on(&right)
        .caption("Precision vs recall", ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.01, 0.0..1.05)
        .map_err(plot_error(path))?;
    pr.configure_mesh()
        .x_desc("Recall")
        .y_desc("Precision")
        .x_label_formatter(&|value| format!("{value:.2}"))
        .y_label_formatter(&|value| format!("{value:.2}"))
        .draw()
        .map_err(plot_error(path))?;
    pr.draw_series(LineSeries::new(curve.iter().copied(), &BLUE))
        .map_err(plot_error(path))?;
    pr.draw_series(
        curve
            .iter()
            .map(|&(recall, precision)| Circle::new((recall, precision), 3, BLUE.filled())),
    )
    .map_err(plot_error(path))?;

    root.present().map_err(plot_error(path))?;
    info!(path = %path.display(), "wrote precision-recall plot");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Label;
    use crate::threshold_sweep::{linspace, sweep};

    fn curve() -> Vec<ThresholdReport> {
        let probabilities = [0.9, 0.8, 0.6, 0.4, 0.3, 0.1];
        let labels = [
            Label::Positive,
            Label::Positive,
            Label::Negative,
            Label::Positive,
            Label::Negative,
            Label::Negative,
        ];
        sweep(&probabilities, &labels, &linspace(0.0, 1.0, 11).unwrap()).unwrap()
    }

    #[test]
    fn unwritable_path_is_a_plot_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("precision_recall.png");
        let err = draw_precision_recall(&path, &curve()).unwrap_err();
        match err {
            CutoffError::Plot { path: reported, .. } => assert_eq!(reported, path),
            other => panic!("expected a plot error, got {other:?}"),
        }
    }

    // Needs a system sans-serif font for the captions.
    #[test]
    #[ignore]
    fn renders_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("precision_recall.png");
        draw_precision_recall(&path, &curve()).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
