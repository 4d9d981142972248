//! On-disk persistence of the frontier
//!
//! The progress directory holds two newline-delimited lists:
//! - `history.txt`: completed URLs (order irrelevant)
//! - `queue.txt`: pending URLs (line order is dequeue order)
//!
//! Each list is written to a temporary file, flushed to disk and renamed over
//! the previous one, so a crash mid-save never leaves a truncated list behind.

use crate::frontier::{is_storable, FrontierError, FrontierResult, FrontierSnapshot};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// File name of the completed-URL list
pub const HISTORY_FILE: &str = "history.txt";

/// File name of the pending-URL list
pub const QUEUE_FILE: &str = "queue.txt";

/// Progress directory backing a [`Frontier`](crate::frontier::Frontier)
#[derive(Debug, Clone)]
pub struct ProgressStore {
    dir: PathBuf,
}

impl ProgressStore {
    /// Creates a store rooted at the given directory
    ///
    /// The directory does not need to exist yet; it is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the progress directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of `queue.txt`
    pub fn queue_path(&self) -> PathBuf {
        self.dir.join(QUEUE_FILE)
    }

    /// Returns the path of `history.txt`
    pub fn history_path(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE)
    }

    /// Loads both lists
    ///
    /// A missing file counts as an empty list. Blank lines are ignored. Any
    /// other malformed line aborts the load: resuming from a damaged queue
    /// would silently lose or invent work.
    ///
    /// # Returns
    ///
    /// * `Ok(FrontierSnapshot)` - The persisted pending queue and history
    /// * `Err(FrontierError)` - A file could not be read or is corrupt
    pub fn load(&self) -> FrontierResult<FrontierSnapshot> {
        let completed = read_list(&self.history_path())?;
        let pending = read_list(&self.queue_path())?;

        tracing::debug!(
            "Loaded progress from {}: {} pending, {} completed",
            self.dir.display(),
            pending.len(),
            completed.len()
        );

        Ok(FrontierSnapshot { pending, completed })
    }

    /// Overwrites both lists with the given snapshot
    ///
    /// History is replaced before the queue. If the process dies between the
    /// two renames, a URL can at worst appear in both lists (and is skipped
    /// when dequeued), never in neither.
    pub fn save(&self, snapshot: &FrontierSnapshot) -> FrontierResult<()> {
        fs::create_dir_all(&self.dir).map_err(|source| FrontierError::Io {
            path: self.dir.clone(),
            source,
        })?;

        write_list(&self.history_path(), &snapshot.completed)?;
        write_list(&self.queue_path(), &snapshot.pending)?;

        tracing::debug!(
            "Saved progress to {}: {} pending, {} completed",
            self.dir.display(),
            snapshot.pending.len(),
            snapshot.completed.len()
        );

        Ok(())
    }

    /// Deletes both lists, if present
    pub fn clear(&self) -> FrontierResult<()> {
        for path in [self.history_path(), self.queue_path()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(FrontierError::Io { path, source }),
            }
        }
        Ok(())
    }
}

/// Reads one newline-delimited list
fn read_list(path: &Path) -> FrontierResult<Vec<String>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(FrontierError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    parse_list(path, &content)
}

/// Splits file content into entries, validating each line
fn parse_list(path: &Path, content: &str) -> FrontierResult<Vec<String>> {
    let mut entries = Vec::new();

    for (index, line) in content.lines().enumerate() {
        if line.is_empty() {
            continue;
        }

        if !is_storable(line) {
            return Err(FrontierError::Corrupt {
                path: path.to_path_buf(),
                line: index + 1,
                reason: format!("invalid entry {:?}", line),
            });
        }

        entries.push(line.to_string());
    }

    Ok(entries)
}

/// Atomically replaces a list file
fn write_list(path: &Path, entries: &[String]) -> FrontierResult<()> {
    let tmp_path = path.with_extension("txt.tmp");
    let io_err = |source| FrontierError::Io {
        path: tmp_path.clone(),
        source,
    };

    let file = File::create(&tmp_path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    for entry in entries {
        writeln!(writer, "{}", entry).map_err(io_err)?;
    }

    let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    file.sync_all().map_err(io_err)?;
    drop(file);

    fs::rename(&tmp_path, path).map_err(|source| FrontierError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
