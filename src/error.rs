//! Error types for pathlimit.

use thiserror::Error;

/// Main error type for pathlimit operations.
#[derive(Error, Debug)]
pub enum PathlimitError {
    /// The window string holds no `<digits><unit>` literal.
    #[error(
        "Rate limit window {window:?} was not provided or was not properly formatted, \
         must be of the form ([0-9]+(s|m|d|h))"
    )]
    MalformedWindow { window: String },

    /// The window literal evaluates to zero seconds.
    #[error("Rate limit window {window:?} must be at least one second")]
    ZeroWindow { window: String },

    /// The window literal does not fit in 64 bits once converted to seconds.
    #[error("Rate limit window {window:?} is too large")]
    WindowOverflow { window: String },

    /// The path pattern is not a valid regular expression.
    #[error("Rate limit path pattern {pattern:?} is not a valid regular expression: {source}")]
    MalformedPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A rule in a rule set failed validation.
    #[error("Rate limit rule #{index} is invalid: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: Box<PathlimitError>,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for PathlimitError {
    fn from(err: config::ConfigError) -> Self {
        PathlimitError::Config(err.to_string())
    }
}

/// Result type alias for pathlimit operations.
pub type Result<T> = std::result::Result<T, PathlimitError>;
