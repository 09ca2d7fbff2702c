use std::path::{Path, PathBuf};
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Wrong cardinality or mismatched companion inputs.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A box with missing fields or a label id without a display name.
    #[error("malformed annotation: {0}")]
    MalformedAnnotation(String),

    #[error("cannot access '{}': {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: BoxedSource,
    },

    #[error("display window failed: {0}")]
    Display(String),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: impl Into<BoxedSource>) -> Self {
        Error::IoFailure {
            path: path.as_ref().to_path_buf(),
            source: source.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedAnnotation(msg.into())
    }
}
