//! Error types for routesh.
//!
//! Every error here is recoverable: the dispatch loop prints it and reads
//! the next line. The `Display` text of the parse and validation errors is
//! the exact diagnostic line shown to the user.

use std::io;
use std::path::PathBuf;

/// Parameter validation failures.
///
/// `index` is the zero-based argument position the diagnostic points at.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// Fewer arguments than required parameters.
    #[error("% Incomplete command found at '^' position.")]
    Incomplete { index: usize },

    /// More arguments than declared parameters.
    #[error("% Too many parameters found at '^' position.")]
    TooMany { index: usize },

    /// An argument does not match its parameter kind.
    #[error("% Wrong parameter found at '^' position.")]
    WrongType { index: usize },
}

impl ValidationError {
    /// Argument position the error refers to.
    pub fn index(&self) -> usize {
        match self {
            Self::Incomplete { index } | Self::TooMany { index } | Self::WrongType { index } => {
                *index
            },
        }
    }
}

/// Line resolution failures, carrying the caret column in the input line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The first token does not name a command in the current view.
    #[error("% Unrecognized command found at '^' position.")]
    Unrecognized { column: usize },

    /// The command was found but its arguments failed validation.
    #[error("{source}")]
    Invalid {
        column: usize,
        source: ValidationError,
    },
}

impl ParseError {
    /// Byte column in the input line where the caret belongs.
    pub fn column(&self) -> usize {
        match self {
            Self::Unrecognized { column } | Self::Invalid { column, .. } => *column,
        }
    }
}

/// Plugin lifecycle failures.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("invalid plugin descriptor {}: {reason}", .path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("plugin already loaded: {0}")]
    DuplicatePlugin(String),

    #[error("too many plugins loaded (limit {0})")]
    CapacityExceeded(usize),

    #[error("failed to load plugin library {reference}: {reason}")]
    LoadFailed { reference: String, reason: String },

    #[error("plugin library {0} does not export a registration entry point")]
    MissingRegistrationEntry(String),

    #[error("plugin library {reference} was built for plugin API v{found}, host speaks v{expected}")]
    IncompatibleApi {
        reference: String,
        found: u32,
        expected: u32,
    },

    #[error("plugin registration failed for {reference} (status {status})")]
    RegistrationFailed { reference: String, status: i32 },

    #[error("failed to initialize plugin {name} (status {status})")]
    InitFailed { name: String, status: i32 },

    #[error("failed to get commands from plugin {name} (status {status})")]
    CommandEnumerationFailed { name: String, status: i32 },

    #[error("plugin not found: {0}")]
    NotFound(String),

    #[error("cannot read plugin directory {}: {reason}", .path.display())]
    DirectoryUnreadable { path: PathBuf, reason: String },
}

/// Errors produced by the routesh shell.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("% Command \"{name}\" already exists in {view} view")]
    DuplicateName { name: String, view: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("% Insufficient privilege for {0} view")]
    InsufficientPrivilege(String),

    #[error("% Invalid view: {0}")]
    InvalidView(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ShellError>;
