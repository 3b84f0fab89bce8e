//! Append-only transcript of everything printed to the terminal.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

pub const HISTORY_FILE: &str = "history.log";

#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The log living at `<root>/history.log`.
    pub fn in_root(root: &Path) -> Self {
        Self::new(root.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record. The file is opened and closed on every call.
    pub fn append(&self, text: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{text}")
    }

    /// Previous transcript with surrounding whitespace trimmed; empty if there is none.
    pub fn load(&self) -> io::Result<String> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(content.trim().to_string()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(e),
        }
    }

    pub fn clear(&self) -> io::Result<()> {
        File::create(&self.path)?;
        debug!(path = %self.path.display(), "history truncated");
        Ok(())
    }
}
