//! Positioned file handle
//!
//! One open file of a module. Handles are owned by exactly one state and are
//! never shared, so positioned reads can seek the underlying file freely.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// How a handle was opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}

impl OpenMode {
    /// `ReadWrite` when the module is writable, `Read` otherwise
    pub fn for_writable(writable: bool) -> Self {
        if writable {
            OpenMode::ReadWrite
        } else {
            OpenMode::Read
        }
    }
}

/// An open, seekable view of a single module file
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
    mode: OpenMode,
    file: File,
}

impl FileHandle {
    /// Open an existing file; never creates one
    pub fn open(path: &Path, mode: OpenMode) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(mode == OpenMode::ReadWrite)
            .open(path)?;

        Ok(Self {
            path: path.to_path_buf(),
            mode,
            file,
        })
    }

    /// Read up to `len` bytes starting at `offset`
    ///
    /// A read that runs past the end of the file returns the bytes that were
    /// there rather than failing.
    pub fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>> {
        self.file.seek(SeekFrom::Start(offset))?;

        // `len` comes from on-disk index entries and may be garbage
        let mut buf = Vec::new();
        (&mut self.file).take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Write `data` at `offset`, extending the file if needed
    pub fn write_at(&mut self, offset: u64, data: &[u8]) -> Result<()> {
        if self.mode != OpenMode::ReadWrite {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{} is open read-only", self.path.display()),
            )
            .into());
        }
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    /// Current length in bytes
    pub fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Flush written data to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Flush pending writes and drop the descriptor
    pub(crate) fn close(mut self) -> Result<()> {
        if self.mode == OpenMode::ReadWrite {
            self.file.flush()?;
            self.file.sync_all()?;
        }
        Ok(())
    }
}
