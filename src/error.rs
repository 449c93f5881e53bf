use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Multipart error: {0}")]
    Multipart(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path segment for {field}: {value:?}")]
    InvalidSegment { field: &'static str, value: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
