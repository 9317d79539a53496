use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocGraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Unsupported language for {0}")]
    UnsupportedLanguage(PathBuf),

    #[error("Graph error: {0}")]
    Graph(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("No generation providers configured")]
    NoProviders,

    #[error("Project root is not readable: {0}")]
    UnreadableRoot(PathBuf),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, DocGraphError>;
