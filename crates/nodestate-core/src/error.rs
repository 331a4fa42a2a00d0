#![forbid(unsafe_code)]

use thiserror::Error;

pub type Result<T> = std::result::Result<T, NodeStateError>;

#[derive(Debug, Error)]
pub enum NodeStateError {
    #[error("no graph client provided in this context")]
    MissingClient,

    #[error("field `{field}` holds an unsupported {kind} value")]
    UnsupportedValue { field: String, kind: &'static str },

    #[error("payload must be an object, got {kind}")]
    NotAnObject { kind: &'static str },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid configuration: {message}")]
    Config { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeStateError {
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error means the binding was used outside a provider.
    #[must_use]
    pub fn is_missing_client(&self) -> bool {
        matches!(self, Self::MissingClient)
    }
}
