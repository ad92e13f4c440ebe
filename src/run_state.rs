//! Run-state channel between the controller and the automation worker
//!
//! A single integer word carries the requested state. The controller is the
//! only writer; the worker and any display surfaces only read. Transitions are
//! never refused here: the worker decides what a request means from where it
//! currently is.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::constants::run_state::{PAUSED, RUNNING, STOPPED};
use crate::persistence::atomic_write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Stopped,
    Running,
    Paused,
}

impl RunState {
    pub fn as_raw(self) -> i32 {
        match self {
            RunState::Stopped => STOPPED,
            RunState::Running => RUNNING,
            RunState::Paused => PAUSED,
        }
    }

    /// Any other word value has no meaning
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            STOPPED => Some(RunState::Stopped),
            RUNNING => Some(RunState::Running),
            PAUSED => Some(RunState::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Stopped => "stopped",
            RunState::Running => "running",
            RunState::Paused => "paused",
        };
        f.write_str(name)
    }
}

/// Storage for the shared word
///
/// A store must be visible to every later load in its entirety.
pub trait WordCell: Send + Sync {
    /// `None` until something has been stored
    fn load(&self) -> Option<i32>;
    fn store(&self, value: i32) -> io::Result<()>;
}

const UNSET: i32 = i32::MIN;

/// In-process word for a controller and worker sharing one address space
#[derive(Debug, Clone)]
pub struct SharedWord {
    word: Arc<AtomicI32>,
}

impl Default for SharedWord {
    fn default() -> Self {
        Self {
            word: Arc::new(AtomicI32::new(UNSET)),
        }
    }
}

impl SharedWord {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WordCell for SharedWord {
    fn load(&self) -> Option<i32> {
        match self.word.load(Ordering::Acquire) {
            UNSET => None,
            value => Some(value),
        }
    }

    fn store(&self, value: i32) -> io::Result<()> {
        self.word.store(value, Ordering::Release);
        Ok(())
    }
}

/// Word kept in a 4-byte little-endian file, replaced atomically
#[derive(Debug, Clone)]
pub struct FileWord {
    path: PathBuf,
}

impl FileWord {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WordCell for FileWord {
    fn load(&self) -> Option<i32> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "Failed to read run-state word");
                return None;
            }
        };
        match <[u8; 4]>::try_from(bytes.as_slice()) {
            Ok(word) => Some(i32::from_le_bytes(word)),
            Err(_) => {
                warn!(path = %self.path.display(), len = bytes.len(), "Run-state word has wrong size");
                None
            }
        }
    }

    fn store(&self, value: i32) -> io::Result<()> {
        atomic_write(&self.path, &value.to_le_bytes())
    }
}

/// The one handle allowed to change the run state
///
/// Not `Clone`, and only built inside this crate (the controller context
/// owns it); other parties get a [`RunStateReader`].
///
/// ```compile_fail
/// use std::sync::Arc;
/// use fuzzy_control::run_state::{RunStateWriter, SharedWord};
///
/// let second = RunStateWriter::new(Arc::new(SharedWord::new()));
/// ```
pub struct RunStateWriter {
    cell: Arc<dyn WordCell>,
}

impl RunStateWriter {
    pub(crate) fn new(cell: Arc<dyn WordCell>) -> Self {
        Self { cell }
    }

    pub fn reader(&self) -> RunStateReader {
        RunStateReader {
            cell: Arc::clone(&self.cell),
        }
    }

    pub fn request_start(&self) -> io::Result<()> {
        self.request(RunState::Running)
    }

    pub fn request_stop(&self) -> io::Result<()> {
        self.request(RunState::Stopped)
    }

    /// Accepted from any state, including stopped
    pub fn request_pause(&self) -> io::Result<()> {
        self.request(RunState::Paused)
    }

    pub fn request_resume(&self) -> io::Result<()> {
        self.request(RunState::Running)
    }

    fn request(&self, state: RunState) -> io::Result<()> {
        self.cell.store(state.as_raw())?;
        info!(state = %state, "Run state requested");
        Ok(())
    }
}

#[derive(Clone)]
pub struct RunStateReader {
    cell: Arc<dyn WordCell>,
}

impl RunStateReader {
    pub fn new(cell: Arc<dyn WordCell>) -> Self {
        Self { cell }
    }

    /// Latest requested state; `None` if nothing meaningful was written
    pub fn current(&self) -> Option<RunState> {
        let raw = self.cell.load()?;
        let state = RunState::from_raw(raw);
        if state.is_none() {
            debug!(raw, "Ignoring unknown run-state word");
        }
        state
    }
}

/// Change detector for polling displays
pub struct RunStateWatcher {
    reader: RunStateReader,
    last: Option<RunState>,
}

impl RunStateWatcher {
    pub fn new(reader: RunStateReader) -> Self {
        Self { reader, last: None }
    }

    /// The state, if it differs from what the previous poll saw
    pub fn poll(&mut self) -> Option<RunState> {
        let current = self.reader.current()?;
        if self.last == Some(current) {
            return None;
        }
        self.last = Some(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn test_raw_values_are_fixed() {
        assert_eq!(RunState::Stopped.as_raw(), 0);
        assert_eq!(RunState::Running.as_raw(), 2);
        assert_eq!(RunState::Paused.as_raw(), 5);
        assert_eq!(RunState::from_raw(1), None);
        assert_eq!(RunState::from_raw(5), Some(RunState::Paused));
    }

    #[test]
    fn test_nothing_written_reads_none() {
        let writer = RunStateWriter::new(Arc::new(SharedWord::new()));
        assert_eq!(writer.reader().current(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let writer = RunStateWriter::new(Arc::new(SharedWord::new()));
        let reader = writer.reader();
        writer.request_start().unwrap();
        writer.request_stop().unwrap();
        assert_eq!(reader.current(), Some(RunState::Stopped));

        writer.request_pause().unwrap();
        assert_eq!(reader.current(), Some(RunState::Paused));
        writer.request_resume().unwrap();
        assert_eq!(reader.current(), Some(RunState::Running));
    }

    #[test]
    fn test_reader_on_other_thread_sees_write() {
        let writer = RunStateWriter::new(Arc::new(SharedWord::new()));
        let reader = writer.reader();
        writer.request_pause().unwrap();
        let seen = thread::spawn(move || reader.current()).join().unwrap();
        assert_eq!(seen, Some(RunState::Paused));
    }

    #[test]
    fn test_unknown_word_reads_none() {
        let cell = Arc::new(SharedWord::new());
        cell.store(7).unwrap();
        assert_eq!(RunStateReader::new(cell).current(), None);
    }

    #[test]
    fn test_file_word() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run_state");
        let cell = Arc::new(FileWord::new(&path));
        let writer = RunStateWriter::new(cell.clone());
        let reader = RunStateReader::new(Arc::new(FileWord::new(&path)));

        assert_eq!(reader.current(), None);
        writer.request_start().unwrap();
        assert_eq!(reader.current(), Some(RunState::Running));
        assert_eq!(fs::read(&path).unwrap(), 2i32.to_le_bytes());

        fs::write(&path, [1u8, 2, 3]).unwrap();
        assert_eq!(reader.current(), None);
    }

    #[test]
    fn test_readers_share_the_writers_cell() {
        let cell = Arc::new(SharedWord::new());
        let writer = RunStateWriter::new(cell.clone());
        let independent = RunStateReader::new(cell);
        writer.request_pause().unwrap();
        assert_eq!(independent.current(), writer.reader().current());
    }

    #[test]
    fn test_watcher_reports_changes_only() {
        let writer = RunStateWriter::new(Arc::new(SharedWord::new()));
        let mut watcher = RunStateWatcher::new(writer.reader());
        assert_eq!(watcher.poll(), None);

        writer.request_start().unwrap();
        assert_eq!(watcher.poll(), Some(RunState::Running));
        assert_eq!(watcher.poll(), None);

        writer.request_stop().unwrap();
        assert_eq!(watcher.poll(), Some(RunState::Stopped));
    }
}
