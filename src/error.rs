use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetSalesError {
    #[error("Invalid record {index}: field '{field}': {message}")]
    DataFormat {
        index: usize,
        field: &'static str,
        message: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[cfg(feature = "remote")]
    #[error("Remote fetch error: {0}")]
    Remote(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, NetSalesError>;
