use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Raised while building the form from the option model.
///
/// These are fatal at startup: a form that cannot be built is never served.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error(
        "no title found: set the command name or provide `title` in the form configuration"
    )]
    MissingTitle,

    #[error(
        "option `{option}` is a counted flag but declares type `{declared}`; counts are always integers"
    )]
    CountTypeMismatch { option: String, declared: String },

    #[error("option `{option}` uses an unsupported argument action `{action}`")]
    UnsupportedAction { option: String, action: String },

    #[error("two options resolve to the same field name `{0}`")]
    DuplicateName(String),

    #[error(
        "no destination option found: declare one of `outpath`, `outdir`, `outfile` or set `destination_option`"
    )]
    NoDestination,

    #[error("destination option `{0}` is not declared by the command")]
    UnknownDestination(String),

    #[error("failed to read form configuration {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid form configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Raised while invoking the underlying library function.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("`{0}` is not an option of this command")]
    UnknownArgument(String),

    #[error("`{name}` expects a count, got `{value}`")]
    InvalidCount { name: String, value: String },

    #[error("{0}")]
    Parse(String),

    #[error("{0}")]
    Failed(String),
}

/// Raised while handling one form submission.
///
/// Nothing partial is kept: the request either produced its keyword mapping
/// and a successful call, or it fails as a whole.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("failed to prepare request workspace {path}: {source}")]
    Workspace { path: PathBuf, source: io::Error },

    #[error("uploaded file name `{0}` has no usable characters")]
    InvalidFileName(String),

    #[error("failed to save upload {path}: {source}")]
    Upload { path: PathBuf, source: io::Error },

    #[error("failed to read output directory {path}: {source}")]
    Output { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("malformed form submission: {0}")]
    Malformed(String),

    #[error("submission task failed: {0}")]
    Task(String),
}

/// Raised while packaging the results of a previous submission.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("`{0}` is not a workspace reference")]
    InvalidReference(String),

    #[error("workspace `{0}` produced no output files")]
    Empty(String),

    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to write results archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("export task failed: {0}")]
    Task(String),
}
