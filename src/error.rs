use std::io;

use thiserror::Error;

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring, training or persisting a model
#[derive(Debug, Error)]
pub enum Error {
    /// A component specification could not be turned into an object, e.g. a
    /// wrong number of arguments or an unknown type name.
    #[error("{class}: {message}")]
    Config { class: String, message: String },

    /// A parameter value failed validation
    #[error("{0}")]
    InvalidParameter(String),

    /// A model file could not be parsed
    #[error("invalid model file: {0}")]
    InvalidModel(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn config<C: Into<String>, M: Into<String>>(class: C, message: M) -> Self {
        Error::Config {
            class: class.into(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_parameter<M: Into<String>>(message: M) -> Self {
        Error::InvalidParameter(message.into())
    }
}
