use super::{boxes_from_records, AnnotationField, BoundingBox, LabelNames};
use crate::{io, Result};
use std::collections::HashMap;
use std::path::PathBuf;

/// Source of dataset label names and per-image annotations.
pub trait DatasetMetadata {
    fn label_names(&self, dataset: &str) -> Result<LabelNames>;

    /// `image file name → boxes` for one split of a dataset.
    fn annotations(&self, dataset: &str, split: &str) -> Result<HashMap<String, Vec<BoundingBox>>>;
}

/// Dataset metadata stored as JSON files:
///
/// ```text
/// <root>/<dataset>/labels.json                 {"0": "person", ...}
/// <root>/<dataset>/<split>/annotations.json    {"img.jpg": [[x0, y0, x1, y1, label], ...]}
/// ```
#[derive(Debug, Clone)]
pub struct JsonDatasetMetadata {
    root: PathBuf,
}

impl JsonDatasetMetadata {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetMetadata for JsonDatasetMetadata {
    fn label_names(&self, dataset: &str) -> Result<LabelNames> {
        LabelNames::from_json_file(self.root.join(dataset).join("labels.json"))
    }

    fn annotations(&self, dataset: &str, split: &str) -> Result<HashMap<String, Vec<BoundingBox>>> {
        let path = self.root.join(dataset).join(split).join("annotations.json");
        let records: HashMap<String, Vec<Vec<AnnotationField>>> = io::read_json(&path)?;
        records
            .into_iter()
            .map(|(image, boxes)| {
                let context = format!("{}: {image}", path.display());
                Ok((image, boxes_from_records(&boxes, &context)?))
            })
            .collect()
    }
}
