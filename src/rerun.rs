//! Failed-target rerun list.
//!
//! Every run overwrites a plain-text file in the system temp dir with the
//! ids of the targets that failed, one per line. `--rerun` reads it back
//! and resolves those ids as if the user had typed them.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug)]
pub struct RerunFile {
    path: PathBuf,
}

impl RerunFile {
    pub fn new() -> Self {
        Self {
            path: std::env::temp_dir().join("dowse.txt"),
        }
    }

    /// Back the list with an explicit file instead of the temp-dir default.
    pub fn at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ids back, skipping blanks and collapsing duplicates while
    /// preserving first-seen order.
    pub fn read(&self) -> Result<Vec<String>, Error> {
        let text =
            fs::read_to_string(&self.path).map_err(|e| Error::RerunRead(self.path.clone(), e))?;
        let mut seen: HashSet<&str> = HashSet::new();
        let mut ids: Vec<String> = Vec::new();
        for line in text.lines() {
            let line = line.trim();
            if !line.is_empty() && seen.insert(line) {
                ids.push(line.to_string());
            }
        }
        Ok(ids)
    }

    /// Overwrite the list with this run's failures. A clean run writes an
    /// empty file, so a later `--rerun` has nothing to replay.
    pub fn write(&self, ids: &[String]) -> Result<(), Error> {
        let mut text = String::with_capacity(ids.iter().map(|id| id.len() + 1).sum());
        for id in ids {
            text.push_str(id);
            text.push('\n');
        }
        fs::write(&self.path, text).map_err(|e| Error::RerunWrite(self.path.clone(), e))
    }
}

impl Default for RerunFile {
    fn default() -> Self {
        Self::new()
    }
}
