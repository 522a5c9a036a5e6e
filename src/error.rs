use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DoraLensError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("GET {path} failed with status {status}")]
    Http { path: String, status: StatusCode },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DoraLensError>;
