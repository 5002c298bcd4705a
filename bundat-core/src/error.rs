use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundatError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Corrupted data: {0}")]
    Corruption(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, BundatError>;
