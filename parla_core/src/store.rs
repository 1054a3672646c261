//! JSON persistence for error records, progress history and question files.
//!
//! Every file is a single JSON array. Reads take a shared lock and never
//! fail: a missing file is empty, a corrupt file is logged and treated as
//! empty, and malformed entries inside an otherwise valid array are skipped.
//! Writes rewrite the whole file through a locked temp file and an atomic
//! rename. Entries that could not be parsed are written back untouched.

use crate::{ErrorRecord, Error, QuestionRecord, Result, SessionStats};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const ERRORS_FILE: &str = "errors.json";
const PROGRESS_FILE: &str = "progress.json";
const LOCAL_QUESTIONS_FILE: &str = "local_questions.json";
const LEVELS_DIR: &str = "levels";

/// Gateway to everything parla keeps on disk under one data directory
#[derive(Clone, Debug)]
pub struct Store {
    data_dir: PathBuf,
}

/// Counts reported by [`Store::clean_errors`]
///
/// `before` and `after` count readable records. Unreadable entries are
/// never removed and are counted in `unreadable`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CleanReport {
    pub before: usize,
    pub after: usize,
    pub unreadable: usize,
}

/// One element of a stored array
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Entry<T> {
    Parsed(T),
    /// Kept verbatim so rewrites do not lose it
    Unparsed(serde_json::Value),
}

impl<T> Entry<T> {
    fn parsed(&self) -> Option<&T> {
        match self {
            Entry::Parsed(item) => Some(item),
            Entry::Unparsed(_) => None,
        }
    }
}

fn parsed_count<T>(entries: &[Entry<T>]) -> usize {
    entries.iter().filter(|e| e.parsed().is_some()).count()
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn errors_path(&self) -> PathBuf {
        self.data_dir.join(ERRORS_FILE)
    }

    pub fn progress_path(&self) -> PathBuf {
        self.data_dir.join(PROGRESS_FILE)
    }

    pub fn local_questions_path(&self) -> PathBuf {
        self.data_dir.join(LOCAL_QUESTIONS_FILE)
    }

    pub fn levels_dir(&self) -> PathBuf {
        self.data_dir.join(LEVELS_DIR)
    }

    // ------------------------------------------------------------------------
    // Error list
    // ------------------------------------------------------------------------

    /// Load the persisted error list (empty on a missing or corrupt file)
    pub fn load_errors(&self) -> Vec<ErrorRecord> {
        read_json_list(&self.errors_path())
    }

    /// Replace the record with the same question text, or append it
    pub fn upsert_error(&self, record: &ErrorRecord) -> Result<()> {
        let path = self.errors_path();
        let mut errors = read_entries::<ErrorRecord>(&path);

        let existing = errors.iter_mut().find_map(|entry| match entry {
            Entry::Parsed(e) if e.question == record.question => Some(e),
            _ => None,
        });
        match existing {
            Some(existing) => *existing = record.clone(),
            None => errors.push(Entry::Parsed(record.clone())),
        }

        write_json_list(&path, &errors)?;
        tracing::debug!("Stored error record for {:?}", record.headline());
        Ok(())
    }

    /// Remove the record for `question`. Returns whether one was removed.
    pub fn remove_error(&self, question: &str) -> Result<bool> {
        let path = self.errors_path();
        let mut errors = read_entries::<ErrorRecord>(&path);
        let before = errors.len();
        errors.retain(|entry| entry.parsed().map_or(true, |e| e.question != question));

        if errors.len() == before {
            return Ok(false);
        }

        write_json_list(&path, &errors)?;
        tracing::debug!("Removed error record for {:?}", question);
        Ok(true)
    }

    /// Drop error records whose explanation contains any of `markers`.
    ///
    /// Returns `None` when there is no error file.
    pub fn clean_errors(&self, markers: &[&str]) -> Result<Option<CleanReport>> {
        let path = self.errors_path();
        if !path.exists() {
            return Ok(None);
        }

        let mut errors = read_entries::<ErrorRecord>(&path);
        let before = parsed_count(&errors);
        errors.retain(|entry| {
            entry
                .parsed()
                .map_or(true, |e| !markers.iter().any(|m| e.explanation.contains(m)))
        });
        let after = parsed_count(&errors);
        let unreadable = errors.len() - after;

        write_json_list(&path, &errors)?;
        tracing::info!("Cleaned error list: {} -> {} entries", before, after);
        Ok(Some(CleanReport {
            before,
            after,
            unreadable,
        }))
    }

    // ------------------------------------------------------------------------
    // Progress history
    // ------------------------------------------------------------------------

    pub fn load_progress(&self) -> Vec<SessionStats> {
        read_json_list(&self.progress_path())
    }

    /// Append one session summary to the history
    pub fn append_progress(&self, stats: &SessionStats) -> Result<()> {
        let path = self.progress_path();
        let mut history = read_entries::<SessionStats>(&path);
        history.push(Entry::Parsed(stats.clone()));
        write_json_list(&path, &history)?;
        tracing::debug!("Appended session stats ({} entries)", history.len());
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Question files (read-only)
    // ------------------------------------------------------------------------

    /// Fallback pool used when the remote provider keeps failing
    pub fn load_local_questions(&self) -> Vec<QuestionRecord> {
        read_json_list(&self.local_questions_path())
    }

    /// Questions from `levels/<name>`; empty when missing or unreadable
    pub fn load_level_questions(&self, name: &str) -> Vec<QuestionRecord> {
        if name.is_empty() || name.contains(&['/', '\\'][..]) || name.contains("..") {
            tracing::warn!("Refusing to load level file {:?}", name);
            return Vec::new();
        }
        read_json_list(&self.levels_dir().join(name))
    }
}

/// Read a JSON array leniently, dropping entries that do not parse
fn read_json_list<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    read_entries(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Entry::Parsed(item) => Some(item),
            Entry::Unparsed(_) => None,
        })
        .collect()
}

/// Read a JSON array, keeping entries that do not parse as raw values
fn read_entries<T: DeserializeOwned>(path: &Path) -> Vec<Entry<T>> {
    if !path.exists() {
        tracing::debug!("No file at {:?}, treating as empty", path);
        return Vec::new();
    }

    let contents = match read_locked(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::warn!("Failed to read {:?}: {}. Treating as empty.", path, e);
            return Vec::new();
        }
    };

    let values = match serde_json::from_str::<Vec<serde_json::Value>>(&contents) {
        Ok(values) => values,
        Err(e) => {
            tracing::warn!("Failed to parse {:?}: {}. Treating as empty.", path, e);
            return Vec::new();
        }
    };

    let entries: Vec<Entry<T>> = values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match T::deserialize(&value) {
            Ok(item) => Entry::Parsed(item),
            Err(e) => {
                tracing::warn!("Unreadable entry {} in {:?}: {}", idx, path, e);
                Entry::Unparsed(value)
            }
        })
        .collect();

    tracing::debug!(
        "Loaded {}/{} entries from {:?}",
        parsed_count(&entries),
        entries.len(),
        path
    );
    entries
}

fn read_locked(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    file.lock_shared()?;

    let mut contents = String::new();
    std::io::BufReader::new(&file).read_to_string(&mut contents)?;
    file.unlock()?;

    Ok(contents)
}

/// Atomically replace `path` with `items` as a pretty-printed JSON array
fn write_json_list<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let parent = path.parent().ok_or_else(|| {
        Error::Other(format!("{} has no parent directory", path.display()))
    })?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;

    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        serde_json::to_writer_pretty(&mut writer, items)?;
        writer.flush()?;
    }

    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
