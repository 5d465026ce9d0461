//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, XML, JSON, TOML and frame-cache errors, and provides
//! semantic variants for argument validation and configuration failures.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Frame cache error: {0}")]
    Cache(#[from] crate::io::cache::CacheError),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No prior section for variable parameter `{param}`")]
    MissingPrior { param: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Malformed LIGO_LW document: {0}")]
    Document(String),

    #[error("External error: {0}")]
    External(String),
}

impl Error {
    pub fn external<E: std::fmt::Display>(e: E) -> Self {
        Error::External(e.to_string())
    }

    pub fn invalid(arg: &'static str, value: impl Into<String>) -> Self {
        Error::InvalidArgument {
            arg,
            value: value.into(),
        }
    }
}
