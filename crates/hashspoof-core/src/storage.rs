//! The single output slot candidates are written to.
//!
//! Every iteration overwrites the slot, only one candidate exists at a time.

use std::fs::{self, File};
use std::io::{BufReader, Cursor, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, warn};
use tempfile::NamedTempFile;

use crate::error::SpoofError;
use crate::result::Result;

/// Where candidates go before they are digested.
pub trait CandidateStore {
    /// replaces the current content of the slot with `bytes`
    fn persist(&mut self, bytes: &[u8]) -> Result<()>;

    /// reads back what the last `persist` stored
    fn open(&self) -> Result<Box<dyn Read + '_>>;

    /// drops whatever this store has written
    fn discard(&mut self) -> Result<()>;
}

/// How candidates reach the output path
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OutputStrategy {
    /// every candidate is written to the output path and digested from there
    #[default]
    EachAttempt,
    /// candidates stay in memory, only the winner is written
    OnMatch,
}

/// A file on disk, replaced atomically on every `persist`.
///
/// Bytes are written to a temporary file in the same directory and renamed
/// over the target, readers never see a half-written candidate.
/// `discard` only removes the target if this slot created it.
#[derive(Debug)]
pub struct FileSlot {
    target: PathBuf,
    written: bool,
    /// whether the target was there before the first `persist`
    preexisting: Option<bool>,
}

impl FileSlot {
    pub fn new(target: impl AsRef<Path>) -> Self {
        Self {
            target: target.as_ref().to_path_buf(),
            written: false,
            preexisting: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.target
    }

    fn directory(&self) -> &Path {
        match self.target.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}

impl CandidateStore for FileSlot {
    fn persist(&mut self, bytes: &[u8]) -> Result<()> {
        let write_error = |source: std::io::Error| {
            error!("Error writing candidate to {:?}: {source}", self.target);
            SpoofError::WriteError { source }
        };

        if self.preexisting.is_none() {
            let exists = self.target.try_exists().map_err(write_error)?;
            if exists {
                warn!("Overwriting existing file {:?}", self.target);
            }
            self.preexisting = Some(exists);
        }

        let mut tmp = NamedTempFile::new_in(self.directory()).map_err(write_error)?;
        tmp.write_all(bytes).map_err(write_error)?;
        tmp.flush().map_err(write_error)?;
        tmp.persist(&self.target)
            .map_err(|e| write_error(e.error))?;
        self.written = true;

        Ok(())
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        let file = File::open(&self.target).map_err(|source| {
            error!("Error reading back candidate {:?}: {source}", self.target);
            SpoofError::DigestIoError { source }
        })?;
        Ok(Box::new(BufReader::new(file)))
    }

    fn discard(&mut self) -> Result<()> {
        if !self.written {
            return Ok(());
        }
        if self.preexisting != Some(false) {
            warn!(
                "Keeping {:?}, it existed before the run and now holds an unmatched candidate",
                self.target
            );
            self.written = false;
            return Ok(());
        }
        match fs::remove_file(&self.target) {
            Ok(()) => {
                debug!("Removed unmatched candidate {:?}", self.target);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => return Err(SpoofError::WriteError { source }),
        }
        self.written = false;
        Ok(())
    }
}

/// Keeps the candidate in memory.
#[derive(Debug, Default)]
pub struct MemorySlot {
    bytes: Vec<u8>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// writes the held candidate to `target` through an atomic [`FileSlot`]
    pub fn commit_to(&self, target: impl AsRef<Path>) -> Result<FileSlot> {
        let mut slot = FileSlot::new(target);
        slot.persist(&self.bytes)?;
        Ok(slot)
    }
}

impl CandidateStore for MemorySlot {
    fn persist(&mut self, bytes: &[u8]) -> Result<()> {
        self.bytes.clear();
        self.bytes.extend_from_slice(bytes);
        Ok(())
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(self.bytes.as_slice())))
    }

    fn discard(&mut self) -> Result<()> {
        self.bytes.clear();
        Ok(())
    }
}
