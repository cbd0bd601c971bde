use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("No extractable text: {0}")]
    NoExtractableText(String),

    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Storage failed: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures raised by an external collaborator (retrieval,
    /// generation or storage), as opposed to configuration or input errors.
    pub fn is_collaborator(&self) -> bool {
        matches!(self, Error::Retrieval(_) | Error::Generation(_) | Error::Storage(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
