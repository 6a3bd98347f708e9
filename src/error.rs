use std::fmt;

use crate::bot::responder::ResponderError;
use crate::config::ConfigError;
use crate::scanner::source::SourceError;

/// Top-level error for startup and the update loop.
#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Source(SourceError),
    Responder(ResponderError),
    Auth(String),
    Io(std::io::Error),
    Other(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(e) => write!(f, "{}", e),
            AppError::Source(e) => write!(f, "Source error: {}", e),
            AppError::Responder(e) => write!(f, "{}", e),
            AppError::Auth(msg) => write!(f, "Auth error: {}", msg),
            AppError::Io(e) => write!(f, "IO error: {}", e),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

impl From<SourceError> for AppError {
    fn from(e: SourceError) -> Self {
        AppError::Source(e)
    }
}

impl From<ResponderError> for AppError {
    fn from(e: ResponderError) -> Self {
        AppError::Responder(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::Other(s)
    }
}
