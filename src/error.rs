//! Error taxonomy
//!
//! Every failure a command can hit is one variant of [`CliError`]. None of
//! them are retried; the dispatcher turns them into an exit code and a single
//! message on stderr.

use thiserror::Error;

/// Exit code for a successful invocation
pub const EXIT_OK: i32 = 0;
/// Exit code for any failure (not found, validation, HTTP error)
pub const EXIT_FAILURE: i32 = 1;
/// Exit code when the user declined a confirmation prompt
pub const EXIT_ABORTED: i32 = 9;

#[derive(Debug, Error)]
pub enum CliError {
    /// Non-interactive prompting hit a required field with no value
    #[error("missing required option: {field}")]
    MissingRequiredField { field: String },

    /// A supplied value is not one of the available options
    #[error("invalid value '{value}' for option {field}; expected one of: {}", expected.join(", "))]
    InvalidChoice {
        field: String,
        value: String,
        expected: Vec<String>,
    },

    /// A required select field resolved to an empty option list
    #[error("no options available for required option {field}")]
    NoChoicesAvailable { field: String },

    #[error("{kind} not found for '{query}'")]
    NotFound { kind: String, query: String },

    #[error("{count} {kind} found matching '{query}', use the id instead")]
    Ambiguous {
        kind: String,
        query: String,
        count: usize,
    },

    #[error("specify at least one option to update")]
    EmptyUpdatePayload,

    /// Non-2xx response, passed through as the server reported it
    #[error("{message} (HTTP {status})")]
    RestError {
        status: u16,
        message: String,
        body: Option<serde_json::Value>,
    },

    #[error("aborted by user")]
    Aborted,

    #[error("{resource} requires a parent {parent} (use --parent)")]
    MissingParent { resource: String, parent: String },

    #[error("{resource} does not support {verb}")]
    Unsupported { resource: String, verb: String },

    #[error("{0}")]
    Usage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Aborted => EXIT_ABORTED,
            _ => EXIT_FAILURE,
        }
    }

    /// HTTP status carried by the error, if it came from the server
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::RestError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        Self::Other(anyhow::Error::new(err).context("Failed to process JSON"))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Other(err.into())
    }
}

/// Result of one command invocation: an exit code plus an optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: i32,
    pub message: Option<String>,
}

impl Outcome {
    pub fn success() -> Self {
        Self {
            exit_code: EXIT_OK,
            message: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_OK
    }
}

impl From<&CliError> for Outcome {
    fn from(err: &CliError) -> Self {
        Self {
            exit_code: err.exit_code(),
            message: Some(err.to_string()),
        }
    }
}
