//! Error types shared by the store, the dispatcher and the web helpers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::command::UNKNOWN_HELP;
use crate::storage::{Folder, FOLDER_NAMES};

/// Everything a submitted command can fail with.
///
/// Each variant renders as the text that follows `Error: ` on the terminal.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Folder must be one of: {}", FOLDER_NAMES.join(", "))]
    InvalidFolder(String),

    /// `move` names two folders and reports them together.
    #[error("Folders must be one of: {}", FOLDER_NAMES.join(", "))]
    InvalidFolders,

    #[error("'{name}' not found in '{folder}'")]
    NotFound { name: String, folder: Folder },

    #[error("'{0}' not found in any folder.")]
    NotFoundAnywhere(String),

    #[error("'{name}' already exists in '{folder}'")]
    Conflict { name: String, folder: Folder },

    #[error("{0}")]
    Usage(String),

    #[error("'{0}' is not a valid file name")]
    InvalidName(String),

    #[error("{context} ({source})")]
    Transport { context: String, source: WebError },

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("{0}")]
    Io(io::Error),

    #[error("{}", UNKNOWN_HELP)]
    UnknownCommand(String),
}

impl CommandError {
    pub fn usage(form: &str) -> Self {
        CommandError::Usage(format!("Usage: {form}"))
    }

    pub fn transport(context: impl Into<String>, source: WebError) -> Self {
        CommandError::Transport {
            context: context.into(),
            source,
        }
    }
}

impl From<io::Error> for CommandError {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::PermissionDenied => CommandError::Permission(e.to_string()),
            _ => CommandError::Io(e),
        }
    }
}

/// Failures of the outbound HTTP helpers.
#[derive(Debug, Error)]
pub enum WebError {
    #[error("failed to create HTTP client: {0}")]
    Client(String),

    #[error("invalid URL '{0}'")]
    BadUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("Status code: {0}")]
    Status(u16),

    #[error("failed to save result: {0}")]
    Write(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("could not determine a storage directory; set FILER_ROOT")]
    NoStorageRoot,
}

pub type Result<T> = std::result::Result<T, CommandError>;
