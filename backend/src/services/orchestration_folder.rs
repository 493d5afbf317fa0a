//! The folder shared with the telescope driver.
//!
//! The driver is an external process; the only contract is the file layout:
//! pending instruction files sit in the root, processed ones land in `done/`
//! and failed ones in `done/Errors/`. Everything the monitor and the
//! execute-plan path need goes through [`OrchestrationFolder`] so that both
//! can run against [`MemoryFolder`] in tests.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::api::PriorReports;
use crate::services::instructions::OrchestrationName;

pub const DONE_DIR: &str = "done";
pub const ERRORS_DIR: &str = "Errors";

/// Liveness sentinel dropped by the driver.
pub const HANDSHAKE: &str = "HANDSHAKE";

pub trait OrchestrationFolder: Send + Sync {
    /// Names of the regular files in the folder root, dotfiles included.
    fn list_pending(&self) -> io::Result<Vec<String>>;

    fn remove_pending(&self, file: &str) -> io::Result<()>;

    fn write_instruction(&self, file: &str, contents: &str) -> io::Result<()>;

    /// Reports in `done/` for the given plan.
    fn list_done(&self, name: &OrchestrationName) -> io::Result<Vec<String>>;

    /// Reports in `done/Errors/` for the given plan.
    fn list_errors(&self, name: &OrchestrationName) -> io::Result<Vec<String>>;

    fn read_done(&self, file: &str) -> io::Result<String>;

    /// Both report listings for the given plan.
    fn reports(&self, name: &OrchestrationName) -> io::Result<PriorReports> {
        Ok(PriorReports {
            done: self.list_done(name)?,
            errors: self.list_errors(name)?,
        })
    }
}

// =============================================================================
// Directory-backed implementation
// =============================================================================

#[derive(Debug, Clone)]
pub struct FsFolder {
    root: PathBuf,
}

impl FsFolder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn done_dir(&self) -> PathBuf {
        self.root.join(DONE_DIR)
    }

    fn errors_dir(&self) -> PathBuf {
        self.root.join(DONE_DIR).join(ERRORS_DIR)
    }
}

/// Regular files of `dir`, sorted. A missing directory is empty.
fn files_in(dir: &Path) -> io::Result<Vec<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names)
}

impl OrchestrationFolder for FsFolder {
    fn list_pending(&self) -> io::Result<Vec<String>> {
        files_in(&self.root)
    }

    fn remove_pending(&self, file: &str) -> io::Result<()> {
        fs::remove_file(self.root.join(file))
    }

    fn write_instruction(&self, file: &str, contents: &str) -> io::Result<()> {
        fs::write(self.root.join(file), contents)
    }

    fn list_done(&self, name: &OrchestrationName) -> io::Result<Vec<String>> {
        Ok(files_in(&self.done_dir())?
            .into_iter()
            .filter(|f| name.matches_report(f))
            .collect())
    }

    fn list_errors(&self, name: &OrchestrationName) -> io::Result<Vec<String>> {
        Ok(files_in(&self.errors_dir())?
            .into_iter()
            .filter(|f| name.matches_report(f))
            .collect())
    }

    fn read_done(&self, file: &str) -> io::Result<String> {
        fs::read_to_string(self.done_dir().join(file))
    }
}

// =============================================================================
// In-memory implementation
// =============================================================================

#[derive(Debug, Default)]
struct MemoryState {
    pending: BTreeMap<String, String>,
    done: BTreeMap<String, String>,
    errors: BTreeMap<String, String>,
}

/// Folder kept in memory. Clones share the same contents, so a test can hold
/// one handle as "the driver" while the code under test holds another.
#[derive(Debug, Clone, Default)]
pub struct MemoryFolder {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryFolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_pending(&self, file: &str, contents: &str) {
        self.state
            .lock()
            .pending
            .insert(file.to_string(), contents.to_string());
    }

    /// Remove a pending file as the driver does when it picks one up.
    pub fn take_pending(&self, file: &str) -> Option<String> {
        self.state.lock().pending.remove(file)
    }

    pub fn pending_contents(&self, file: &str) -> Option<String> {
        self.state.lock().pending.get(file).cloned()
    }

    pub fn put_done(&self, file: &str, contents: &str) {
        self.state
            .lock()
            .done
            .insert(file.to_string(), contents.to_string());
    }

    pub fn put_error(&self, file: &str, contents: &str) {
        self.state
            .lock()
            .errors
            .insert(file.to_string(), contents.to_string());
    }

    pub fn clear_pending(&self) {
        self.state.lock().pending.clear();
    }
}

impl OrchestrationFolder for MemoryFolder {
    fn list_pending(&self) -> io::Result<Vec<String>> {
        Ok(self.state.lock().pending.keys().cloned().collect())
    }

    fn remove_pending(&self, file: &str) -> io::Result<()> {
        self.state
            .lock()
            .pending
            .remove(file)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.to_string()))
    }

    fn write_instruction(&self, file: &str, contents: &str) -> io::Result<()> {
        self.put_pending(file, contents);
        Ok(())
    }

    fn list_done(&self, name: &OrchestrationName) -> io::Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .done
            .keys()
            .filter(|f| name.matches_report(f))
            .cloned()
            .collect())
    }

    fn list_errors(&self, name: &OrchestrationName) -> io::Result<Vec<String>> {
        Ok(self
            .state
            .lock()
            .errors
            .keys()
            .filter(|f| name.matches_report(f))
            .cloned()
            .collect())
    }

    fn read_done(&self, file: &str) -> io::Result<String> {
        self.state
            .lock()
            .done
            .get(file)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, file.to_string()))
    }
}
