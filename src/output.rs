use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

/// Where a finished transcript goes, decided by the trigger key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Append to the persistent notes file
    Notes,
    /// Replace the system clipboard contents
    Clipboard,
}

/// Delivery errors
#[derive(Debug, Error)]
pub enum OutputError {
    /// Failed to append to the notes file
    #[error("failed to append to notes file {path}: {source}")]
    Notes {
        /// Notes file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Clipboard could not be opened or written
    #[error("clipboard unavailable: {0}")]
    Clipboard(String),
}

/// Routes a transcript to its destination
#[cfg_attr(test, mockall::automock)]
pub trait OutputRouter: Send + Sync {
    /// Deliver `text` according to `mode`
    ///
    /// # Errors
    /// Returns error if the destination cannot be written
    fn deliver(&self, text: &str, mode: OutputMode) -> Result<(), OutputError>;
}

/// Production router: flat notes file plus the system clipboard
pub struct DesktopRouter {
    notes_path: PathBuf,
}

impl DesktopRouter {
    #[must_use]
    pub fn new(notes_path: PathBuf) -> Self {
        Self { notes_path }
    }

    fn append_notes(&self, text: &str) -> Result<(), OutputError> {
        append_to_file(&self.notes_path, text).map_err(|source| OutputError::Notes {
            path: self.notes_path.clone(),
            source,
        })
    }
}

impl OutputRouter for DesktopRouter {
    fn deliver(&self, text: &str, mode: OutputMode) -> Result<(), OutputError> {
        match mode {
            OutputMode::Notes => {
                self.append_notes(text)?;
                info!(path = %self.notes_path.display(), text_len = text.len(), "appended to notes");
            }
            OutputMode::Clipboard => {
                let mut clipboard = arboard::Clipboard::new()
                    .map_err(|e| OutputError::Clipboard(e.to_string()))?;
                clipboard
                    .set_text(text.to_owned())
                    .map_err(|e| OutputError::Clipboard(e.to_string()))?;
                info!(text_len = text.len(), "copied to clipboard");
            }
        }
        Ok(())
    }
}

/// Each entry is separated from the previous one by a blank line
fn append_to_file(path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(format!("\n\n{text}").as_bytes())
}
