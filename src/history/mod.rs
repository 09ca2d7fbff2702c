use crate::render::{LabelFont, Viewer, WindowViewer};
use crate::{io, Error, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub mod chart;

pub use chart::{LineChart, Series};

pub const LOSS: &str = "loss";
pub const VAL_LOSS: &str = "val_loss";
pub const ACCURACY: &str = "accuracy";
pub const VAL_ACCURACY: &str = "val_accuracy";
pub const LEARNING_RATES: &str = "learning_rates";

const CHART_FONT_SIZE: f32 = 12.0;

/// Per-epoch metrics of a training run, e.g.
/// `{"loss": [..], "val_loss": [..], "learning_rates": [..]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(BTreeMap<String, Vec<f64>>);

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        io::read_json(path)
    }

    pub fn insert(&mut self, metric: impl Into<String>, values: Vec<f64>) -> Option<Vec<f64>> {
        self.0.insert(metric.into(), values)
    }

    pub fn get(&self, metric: &str) -> Option<&[f64]> {
        self.0.get(metric).map(Vec::as_slice)
    }

    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains_key(metric)
    }

    pub fn epochs(&self) -> usize {
        self.get(LOSS).map_or(0, <[f64]>::len)
    }

    /// `loss` and `val_loss` are required, and every metric must cover the
    /// same, non-zero number of epochs.
    pub fn validate(&self) -> Result<()> {
        for required in [LOSS, VAL_LOSS] {
            if !self.contains(required) {
                return Err(Error::invalid(format!("history has no '{required}' metric")));
            }
        }
        let epochs = self.epochs();
        if epochs == 0 {
            return Err(Error::invalid("history has no epochs"));
        }
        if let Some((metric, values)) = self.0.iter().find(|(_, v)| v.len() != epochs) {
            return Err(Error::invalid(format!(
                "'{metric}' has {} values, expected {epochs}",
                values.len()
            )));
        }
        Ok(())
    }

    fn series<'a>(&'a self, metrics: &[(&str, &'a str)]) -> Vec<Series<'a>> {
        metrics
            .iter()
            .filter_map(|&(metric, label)| {
                self.get(metric).map(|values| Series {
                    label: Some(label),
                    values,
                })
            })
            .collect()
    }

    fn charts(&self) -> Vec<(ChartKind, LineChart<'_>)> {
        let mut charts = vec![(
            ChartKind::Loss,
            LineChart {
                title: "Losses",
                x_label: "Epoch",
                y_label: "Loss",
                series: self.series(&[(LOSS, "Train loss"), (VAL_LOSS, "Validation loss")]),
            },
        )];
        if self.contains(ACCURACY) {
            charts.push((
                ChartKind::Accuracy,
                LineChart {
                    title: "Accuracy",
                    x_label: "Epoch",
                    y_label: "Accuracy",
                    series: self.series(&[(ACCURACY, "Train accuracy"), (VAL_ACCURACY, "Validation accuracy")]),
                },
            ));
        }
        if let Some(values) = self.get(LEARNING_RATES) {
            charts.push((
                ChartKind::LearningRate,
                LineChart {
                    title: "Learning rate schedule",
                    x_label: "Epoch",
                    y_label: "Learning rate",
                    series: vec![Series { label: None, values }],
                },
            ));
        }
        charts
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<f64>)> for History {
    fn from_iter<I: IntoIterator<Item = (K, Vec<f64>)>>(iter: I) -> Self {
        History(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    Loss,
    Accuracy,
    LearningRate,
}

impl ChartKind {
    pub fn file_name(self) -> &'static str {
        match self {
            ChartKind::Loss => "loss.png",
            ChartKind::Accuracy => "accuracy.png",
            ChartKind::LearningRate => "lr_schedule.png",
        }
    }

    pub fn window_title(self) -> &'static str {
        match self {
            ChartKind::Loss => "loss",
            ChartKind::Accuracy => "accuracy",
            ChartKind::LearningRate => "learning rate",
        }
    }
}

/// Plot the loss curves, plus accuracy and learning-rate charts when those
/// metrics were recorded. Charts go to `<output_dir>/<chart>.png` and/or a
/// window. Nothing happens if neither is requested.
pub fn plot_history(history: &History, output_dir: Option<&Path>, show: bool) -> Result<Vec<ChartKind>> {
    if output_dir.is_none() && !show {
        return Ok(Vec::new());
    }
    let font = LabelFont::discover(None, CHART_FONT_SIZE)?;
    let mut window = WindowViewer::default();
    let viewer: Option<&mut dyn Viewer> = if show { Some(&mut window) } else { None };
    plot_history_with(history, output_dir, viewer, &font)
}

/// [`plot_history`] with an explicit viewer and font.
pub fn plot_history_with(
    history: &History,
    output_dir: Option<&Path>,
    mut viewer: Option<&mut dyn Viewer>,
    font: &LabelFont,
) -> Result<Vec<ChartKind>> {
    if output_dir.is_none() && viewer.is_none() {
        return Ok(Vec::new());
    }
    history.validate()?;

    let mut produced = Vec::new();
    for (kind, chart) in history.charts() {
        let image = chart.render(font);
        debug!("rendered {:?} chart over {} epochs", kind, history.epochs());
        if let Some(dir) = output_dir {
            io::save_image(&image, dir.join(kind.file_name()))?;
        }
        if let Some(viewer) = viewer.as_deref_mut() {
            viewer.show(kind.window_title(), &image)?;
        }
        produced.push(kind);
    }
    Ok(produced)
}

/// Load a JSON history and display its charts without saving them.
pub fn plot_history_from_path(path: impl AsRef<Path>) -> Result<Vec<ChartKind>> {
    let history = History::from_json_file(path)?;
    plot_history(&history, None, true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::render::RecordingViewer;

    fn losses() -> History {
        [(LOSS, vec![0.9, 0.5, 0.3]), (VAL_LOSS, vec![1.0, 0.7, 0.6])]
            .into_iter()
            .collect()
    }

    fn shown(history: &History) -> Vec<ChartKind> {
        let mut viewer = RecordingViewer::default();
        let font = LabelFont::Bitmap { scale: 1 };
        let charts = plot_history_with(history, None, Some(&mut viewer), &font).unwrap();
        assert_eq!(viewer.len(), charts.len());
        charts
    }

    #[test]
    fn one_chart_per_recorded_metric_group() {
        let mut history = losses();
        assert_eq!(shown(&history), [ChartKind::Loss]);

        history.insert(ACCURACY, vec![0.5, 0.7, 0.8]);
        assert_eq!(shown(&history), [ChartKind::Loss, ChartKind::Accuracy]);

        history.insert(LEARNING_RATES, vec![1e-3, 5e-4, 1e-4]);
        assert_eq!(
            shown(&history),
            [ChartKind::Loss, ChartKind::Accuracy, ChartKind::LearningRate]
        );
    }

    #[test]
    fn nothing_requested_is_a_no_op() {
        // validation is skipped too
        let charts = plot_history(&History::new(), None, false).unwrap();
        assert!(charts.is_empty());
    }

    #[test]
    fn saves_fixed_file_names() {
        let tmp = tempfile::tempdir().unwrap();
        let mut history = losses();
        history.insert(LEARNING_RATES, vec![0.1, 0.05, 0.01]);

        let font = LabelFont::Bitmap { scale: 1 };
        let charts = plot_history_with(&history, Some(tmp.path()), None, &font).unwrap();
        assert_eq!(charts, [ChartKind::Loss, ChartKind::LearningRate]);
        assert!(tmp.path().join("loss.png").is_file());
        assert!(tmp.path().join("lr_schedule.png").is_file());
        assert!(!tmp.path().join("accuracy.png").exists());
    }

    #[test]
    fn uneven_or_incomplete_history_is_rejected() {
        let mut history = losses();
        history.insert(ACCURACY, vec![0.5]);
        assert!(matches!(history.validate(), Err(Error::InvalidInput(_))));

        let only_loss: History = [(LOSS, vec![1.0])].into_iter().collect();
        assert!(matches!(only_loss.validate(), Err(Error::InvalidInput(_))));

        let empty: History = [(LOSS, vec![]), (VAL_LOSS, vec![])].into_iter().collect();
        assert!(empty.validate().is_err());
    }

    #[test]
    fn reads_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, r#"{"loss": [1.0, 0.5], "val_loss": [1.2, 0.9], "accuracy": [0.4, 0.6]}"#).unwrap();

        let history = History::from_json_file(&path).unwrap();
        assert_eq!(history.epochs(), 2);
        assert_eq!(history.get(ACCURACY), Some(&[0.4, 0.6][..]));
        assert!(History::from_json_file(tmp.path().join("missing.json")).is_err());
    }
}
