use crate::{io, Error, Result};
use serde::Deserialize;
use std::fmt;
use std::path::Path;

pub mod label;
pub mod metadata;

pub use label::LabelNames;
pub use metadata::{DatasetMetadata, JsonDatasetMetadata};

/// Key into a [`LabelNames`] map. Numeric class ids are stored in their
/// decimal form so `7` and `"7"` address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(String);

impl LabelId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        LabelId(s.to_string())
    }
}

impl From<String> for LabelId {
    fn from(s: String) -> Self {
        LabelId(s)
    }
}

impl From<u32> for LabelId {
    fn from(id: u32) -> Self {
        LabelId(id.to_string())
    }
}

impl From<usize> for LabelId {
    fn from(id: usize) -> Self {
        LabelId(id.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub label: LabelId,
}

impl BoundingBox {
    pub fn new(x_min: f32, y_min: f32, x_max: f32, y_max: f32, label: impl Into<LabelId>) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
            label: label.into(),
        }
    }

    /// All-zero placeholder used to pad fixed-size annotation arrays.
    pub fn is_sentinel(&self) -> bool {
        self.coords().iter().all(|&v| v == 0.0)
    }

    pub fn coords(&self) -> [f32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// Copy moved right by `dx` (only the x fields change). Sentinels stay
    /// sentinels.
    pub fn shifted_x(&self, dx: f32) -> Self {
        if self.is_sentinel() {
            return self.clone();
        }
        Self {
            x_min: self.x_min + dx,
            x_max: self.x_max + dx,
            ..self.clone()
        }
    }

    /// `(x_min, y_min, x_max, y_max)` → `(y_min, x_min, y_max, x_max)`.
    pub fn swapped_axes(&self) -> Self {
        Self {
            x_min: self.y_min,
            y_min: self.x_min,
            x_max: self.y_max,
            y_max: self.x_max,
            label: self.label.clone(),
        }
    }

    /// Normalized → pixel coordinates, multiplying by `[W, H, W, H]` and
    /// truncating toward zero.
    pub fn scaled(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        let scale = |v: f32, dim: f64| (v as f64 * dim).trunc() as f32;
        Self {
            x_min: scale(self.x_min, w),
            y_min: scale(self.y_min, h),
            x_max: scale(self.x_max, w),
            y_max: scale(self.y_max, h),
            label: self.label.clone(),
        }
    }

    /// Boundary conversion from a loosely typed record
    /// `[x_min, y_min, x_max, y_max, label]`.
    pub fn from_fields(fields: &[AnnotationField]) -> Result<Self> {
        let [x_min, y_min, x_max, y_max, label] = fields else {
            return Err(Error::malformed(format!(
                "expected 5 fields [x_min, y_min, x_max, y_max, label], got {}",
                fields.len()
            )));
        };
        let coord = |field: &AnnotationField, name: &str| match field {
            AnnotationField::Number(v) => Ok(*v as f32),
            AnnotationField::Text(s) => Err(Error::malformed(format!(
                "{name} must be a number, got \"{s}\""
            ))),
        };
        let label = match label {
            AnnotationField::Number(v) => label_from_number(*v)?,
            AnnotationField::Text(s) => LabelId::from(s.as_str()),
        };
        Ok(Self {
            x_min: coord(x_min, "x_min")?,
            y_min: coord(y_min, "y_min")?,
            x_max: coord(x_max, "x_max")?,
            y_max: coord(y_max, "y_max")?,
            label,
        })
    }
}

impl TryFrom<&[f64]> for BoundingBox {
    type Error = Error;

    fn try_from(fields: &[f64]) -> Result<Self> {
        let fields: Vec<_> = fields.iter().copied().map(AnnotationField::Number).collect();
        Self::from_fields(&fields)
    }
}

fn label_from_number(v: f64) -> Result<LabelId> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 {
        Ok(LabelId::from(format!("{}", v as u64)))
    } else {
        Err(Error::malformed(format!("label id must be a non-negative integer, got {v}")))
    }
}

/// One cell of an on-disk annotation record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnnotationField {
    Number(f64),
    Text(String),
}

pub(crate) fn boxes_from_records(records: &[Vec<AnnotationField>], context: &str) -> Result<Vec<BoundingBox>> {
    records
        .iter()
        .enumerate()
        .map(|(index, fields)| {
            BoundingBox::from_fields(fields).map_err(|e| match e {
                Error::MalformedAnnotation(msg) => {
                    Error::malformed(format!("{context}, box {index}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

/// Read a JSON array of `[x_min, y_min, x_max, y_max, label]` records.
pub fn read_boxes(path: impl AsRef<Path>) -> Result<Vec<BoundingBox>> {
    let path = path.as_ref();
    let records: Vec<Vec<AnnotationField>> = io::read_json(path)?;
    boxes_from_records(&records, &path.display().to_string())
}
