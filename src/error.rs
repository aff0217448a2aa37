// File: ./src/error.rs
//! Error types for calendar evaluation and mail dispatch.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecurrenceError {
    #[error("Invalid RRULE: {0}")]
    InvalidRule(String),

    #[error("Expansion error: {0}")]
    Expansion(String),
}

/// A calendar file that parsed but does not describe usable components.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Parse: {0}")]
    Parse(String),

    #[error("{component} without {property}")]
    MissingProperty {
        component: &'static str,
        property: &'static str,
    },

    #[error("Invalid {property} value '{value}'")]
    InvalidDate {
        property: &'static str,
        value: String,
    },

    #[error("Invalid TRIGGER: {0}")]
    InvalidTrigger(String),

    #[error(transparent)]
    Recurrence(#[from] RecurrenceError),
}

#[derive(Error, Debug)]
pub enum WindowError {
    #[error("the minutes ahead \"{0}\" must be positive!")]
    NonPositive(i64),

    #[error("the minutes ahead \"{0}\" is out of range!")]
    OutOfRange(i64),
}

/// Why a single calendar file was skipped.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("cannot open: {0}")]
    Access(#[source] std::io::Error),

    #[error("cannot read: {0}")]
    Read(#[source] std::io::Error),

    #[error("not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl FileError {
    /// Access problems and content problems are counted separately.
    pub fn is_access(&self) -> bool {
        matches!(self, FileError::Access(_))
    }
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("invalid recipient '{address}': {reason}")]
    InvalidRecipient { address: String, reason: String },

    #[error("cannot build message: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("transport: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// Bad command-line input; the run stops before any file is read.
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("the directory \"{0}\" does not exist or is not a directory!")]
    NotADirectory(String),

    #[error("the minutes ahead \"{0}\" is not an integer!")]
    NotAnInteger(String),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error("the mail port \"{0}\" is not a valid port!")]
    InvalidPort(String),

    #[error("the from address \"{address}\" is invalid: {reason}")]
    InvalidSender { address: String, reason: String },
}
