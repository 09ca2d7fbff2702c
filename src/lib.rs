pub mod annotation;
pub mod error;
pub mod history;
pub mod io;
pub mod render;
pub mod settings;

pub use annotation::{read_boxes, BoundingBox, DatasetMetadata, JsonDatasetMetadata, LabelId, LabelNames};
pub use error::{Error, Result};
pub use history::{plot_history, plot_history_from_path, ChartKind, History};
pub use render::{assign_colors, NormalizedOptions, Renderer};
pub use settings::RenderConfig;
