use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    #[error("precondition failed: {0}")]
    Precondition(String),
    #[error("estimator has not been trained")]
    NotTrained,
}

pub type Result<T> = std::result::Result<T, Error>;
