use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("{flag} must be a finite number")]
    NotFinite { flag: &'static str },

    #[error("{flag} must be {requirement}")]
    OutOfRange {
        flag: &'static str,
        requirement: &'static str,
    },

    #[error("--search-max must be greater than --search-min")]
    EmptySearchBracket,

    #[error("Invalid request payload: {0}")]
    Payload(String),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Args(#[from] clap::Error),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("failed to encode projection: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}
