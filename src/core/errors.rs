use thiserror::Error;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{provider} provider error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl AiError {
    pub fn provider<E: std::fmt::Display>(provider: &'static str, err: E) -> Self {
        AiError::Provider {
            provider,
            message: err.to_string(),
        }
    }
}
