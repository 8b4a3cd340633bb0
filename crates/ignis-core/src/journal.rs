//! Append-only deployment journal.
//!
//! The journal is the single source of truth for a deployment. Records are
//! JSON Lines: one [`JournalMessage`] per line, appended and flushed before
//! the engine acts on the transition the record describes. A process killed
//! mid-run can therefore always be resumed by replaying the file.
//!
//! A partial trailing line (the tail of an interrupted append) is dropped
//! with a warning on read. Any other malformed content is reported as
//! [`CorruptJournalError`] rather than silently skipped.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tracing::warn;

use crate::messages::JournalMessage;

/// The journal cannot be interpreted as a valid record sequence.
#[derive(Debug, Clone)]
pub struct CorruptJournalError {
    pub reason: String,
}

impl CorruptJournalError {
    pub fn new(reason: impl Into<String>) -> Self {
        CorruptJournalError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CorruptJournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "corrupt journal: {}", self.reason)
    }
}

impl std::error::Error for CorruptJournalError {}

/// Durable, ordered record store for one deployment.
pub trait Journal: Send + Sync {
    /// Persist one record. The record must be durable before this returns.
    fn append(&self, message: &JournalMessage) -> Result<()>;

    /// Every record in append order.
    fn read_all(&self) -> Result<Vec<JournalMessage>>;
}

/// JSON Lines journal backed by a single file.
///
/// The file is opened in append mode for every write and flushed per
/// record, so concurrent futures interleave whole lines only.
pub struct FileJournal {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileJournal {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Journal for FileJournal {
    fn append(&self, message: &JournalMessage) -> Result<()> {
        let mut line = serde_json::to_string(message).context("serialize journal record")?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open journal {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("append to journal {}", self.path.display()))?;
        file.flush()?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<JournalMessage>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("read journal {}", self.path.display()))?;

        let mut messages = Vec::new();
        for (index, chunk) in content.split_inclusive('\n').enumerate() {
            let terminated = chunk.ends_with('\n');
            let line = chunk.trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                return Err(CorruptJournalError::new(format!(
                    "blank line {} in {}",
                    index + 1,
                    self.path.display()
                ))
                .into());
            }
            match serde_json::from_str::<JournalMessage>(line) {
                Ok(message) => messages.push(message),
                Err(err) if !terminated => {
                    // Tail of an append cut short by a crash. The record never
                    // took effect, so dropping it is safe.
                    warn!(
                        journal = %self.path.display(),
                        line = index + 1,
                        "dropping partial trailing journal record: {err}"
                    );
                    break;
                }
                Err(err) => {
                    return Err(CorruptJournalError::new(format!(
                        "unreadable record at line {} in {}: {}",
                        index + 1,
                        self.path.display(),
                        err
                    ))
                    .into());
                }
            }
        }
        Ok(messages)
    }
}

/// In-memory journal for tests and dry runs.
#[derive(Default)]
pub struct MemoryJournal {
    messages: Mutex<Vec<JournalMessage>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Journal for MemoryJournal {
    fn append(&self, message: &JournalMessage) -> Result<()> {
        self.messages.lock().push(message.clone());
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<JournalMessage>> {
        Ok(self.messages.lock().clone())
    }
}
