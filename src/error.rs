use thiserror::Error;

#[derive(Error, Debug)]
pub enum LatencyError {
    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Output error: {0}")]
    Output(String),
}

pub type LatencyResult<T> = std::result::Result<T, LatencyError>;
