//! Linked (dictionary-style) modules: one index + data pair, no testaments

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{OpenWarning, Result, StoreError};
use crate::handle::{FileHandle, OpenMode};
use crate::layout::{can_read, can_write, exists, incfile_path, linked_files, LinkedFiles};
use crate::module::{ModuleId, PathResolver};

use super::common::{close_slot, open_group, StateCore, WarningSink};
use super::{BackendState, ModuleState, Opened, StateKind};

/// Index + data handles of a linked module, plus a cached entry count
#[derive(Debug)]
pub struct RawLinkedState {
    core: StateCore,
    files: LinkedFiles,
    index: Option<FileHandle>,
    data: Option<FileHandle>,
    /// (entry size, count) of the last computation
    entry_count: Option<(u64, u64)>,
}

impl RawLinkedState {
    /// Shared by every linked layout; the caller decides writability
    pub(crate) fn build(
        module: &ModuleId,
        base: &Path,
        writable: impl FnOnce(&LinkedFiles) -> bool,
        sink: &mut WarningSink,
    ) -> Result<Self> {
        let files = linked_files(base);

        if !can_read(&files.data) {
            tracing::error!(module = %module, path = %files.data.display(), "data file not readable");
            return Err(StoreError::MissingData {
                module: module.clone(),
                path: files.data.clone(),
            });
        }

        let mut index = None;
        let mut data = None;

        if can_read(&files.index) {
            let mode = OpenMode::for_writable(writable(&files));
            let pair = [files.index.as_path(), files.data.as_path()];
            if let Some([idx, dat]) = open_group(pair, mode, sink) {
                index = Some(idx);
                data = Some(dat);
            }
        } else {
            sink.degraded(OpenWarning::MissingIndex {
                path: files.index.clone(),
            });
        }

        Ok(Self {
            core: StateCore::new(module),
            files,
            index,
            data,
            entry_count: None,
        })
    }

    pub fn index(&self) -> Option<&FileHandle> {
        self.index.as_ref()
    }

    pub fn index_mut(&mut self) -> Option<&mut FileHandle> {
        self.index.as_mut()
    }

    pub fn data(&self) -> Option<&FileHandle> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut FileHandle> {
        self.data.as_mut()
    }

    pub fn files(&self) -> &LinkedFiles {
        &self.files
    }

    /// Number of index entries of `entry_size` bytes
    ///
    /// Computed once per entry size; asking with another size recomputes.
    /// A module without an index has no entries.
    pub fn entry_count(&mut self, entry_size: u64) -> Result<u64> {
        if entry_size == 0 {
            return Err(StoreError::Config("entry size must be non-zero".to_string()));
        }
        if let Some((size, count)) = self.entry_count {
            if size == entry_size {
                return Ok(count);
            }
        }

        let Some(index) = self.index.as_ref() else {
            return Ok(0);
        };
        let count = index.len()? / entry_size;
        self.entry_count = Some((entry_size, count));
        Ok(count)
    }

    /// Replace the cached count after the owner appended entries
    pub fn set_entry_count(&mut self, entry_size: u64, count: u64) {
        self.entry_count = Some((entry_size, count));
    }
}

/// Both files present, readable and writable
pub(super) fn linked_writable(files: &LinkedFiles) -> bool {
    [&files.index, &files.data]
        .into_iter()
        .all(|path| can_read(path) && can_write(path))
}

impl ModuleState for RawLinkedState {
    const KIND: StateKind = StateKind::RawLinked;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let mut sink = WarningSink::new(meta.id());
        let state = Self::build(meta.id(), meta.data_path(), linked_writable, &mut sink)?;
        Ok(Opened {
            state,
            warnings: sink.finish(),
        })
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn is_writable(&self) -> bool {
        linked_writable(&self.files)
    }

    fn release_resources(&mut self) {
        close_slot(&mut self.index, &self.core.module);
        close_slot(&mut self.data, &self.core.module);
        self.entry_count = None;
        self.core.mark_released();
    }

    fn into_backend(self) -> BackendState {
        BackendState::RawLinked(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::RawLinked(state) => Ok(state),
            other => Err(other),
        }
    }
}

// =============================================================================
// RawFileLinkedState
// =============================================================================

/// A writable linked module with a "next free record" counter file
///
/// The counter file is only looked for when first needed, and its value is
/// read at most once until the owner replaces it.
#[derive(Debug)]
pub struct RawFileLinkedState {
    linked: RawLinkedState,
    incfile_candidate: PathBuf,
    incfile: Option<PathBuf>,
    incfile_value: Option<u32>,
    incfile_reads: u64,
}

impl RawFileLinkedState {
    pub fn linked(&self) -> &RawLinkedState {
        &self.linked
    }

    pub fn linked_mut(&mut self) -> &mut RawLinkedState {
        &mut self.linked
    }

    /// Location of the counter file, if it exists
    pub fn incfile_path(&mut self) -> Option<&Path> {
        if self.incfile.is_none() && exists(&self.incfile_candidate) {
            self.incfile = Some(self.incfile_candidate.clone());
        }
        self.incfile.as_deref()
    }

    /// Next free record index; `None` when there is no counter file
    pub fn incfile_value(&mut self) -> Result<Option<u32>> {
        if let Some(value) = self.incfile_value {
            return Ok(Some(value));
        }

        let Some(path) = self.incfile_path().map(Path::to_path_buf) else {
            return Ok(None);
        };

        self.incfile_reads += 1;
        let value = File::open(&path)?
            .read_u32::<LittleEndian>()
            .map_err(|e| match e.kind() {
                ErrorKind::UnexpectedEof => StoreError::IncFile {
                    path: path.clone(),
                    reason: "shorter than 4 bytes".to_string(),
                },
                _ => StoreError::Io(e),
            })?;

        self.incfile_value = Some(value);
        Ok(Some(value))
    }

    /// Replace the cached value without touching the file
    pub fn set_incfile_value(&mut self, value: u32) {
        self.incfile_value = Some(value);
    }

    /// Persist `value` to the counter file and cache it
    pub fn write_incfile(&mut self, value: u32) -> Result<()> {
        self.linked.core.ensure_open()?;

        let Some(path) = self.incfile_path().map(Path::to_path_buf) else {
            return Err(StoreError::IncFile {
                path: self.incfile_candidate.clone(),
                reason: "does not exist".to_string(),
            });
        };

        let mut file = OpenOptions::new().write(true).truncate(true).open(&path)?;
        file.write_u32::<LittleEndian>(value)?;
        file.flush()?;

        self.incfile_value = Some(value);
        Ok(())
    }

    /// Create the counter file with the initial value 1 if it is missing
    pub fn create_incfile(&mut self) -> Result<()> {
        self.linked.core.ensure_open()?;

        if self.incfile_path().is_none() {
            tracing::debug!(module = %self.linked.core.module, path = %self.incfile_candidate.display(), "creating incfile");
            File::create(&self.incfile_candidate)?;
            self.incfile = Some(self.incfile_candidate.clone());
            self.write_incfile(1)?;
        }
        Ok(())
    }

    /// How many times the counter file has actually been read
    pub fn incfile_reads(&self) -> u64 {
        self.incfile_reads
    }
}

/// Index and data must be writable; an existing counter file must be too
fn file_linked_writable(files: &LinkedFiles, incfile: &Path) -> bool {
    linked_writable(files) && (!exists(incfile) || can_write(incfile))
}

impl ModuleState for RawFileLinkedState {
    const KIND: StateKind = StateKind::RawFileLinked;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let base = meta.data_path();
        let incfile_candidate = incfile_path(base);
        let mut sink = WarningSink::new(meta.id());

        let linked = RawLinkedState::build(
            meta.id(),
            base,
            |files| file_linked_writable(files, &incfile_candidate),
            &mut sink,
        )?;

        Ok(Opened {
            state: RawFileLinkedState {
                linked,
                incfile_candidate,
                incfile: None,
                incfile_value: None,
                incfile_reads: 0,
            },
            warnings: sink.finish(),
        })
    }

    fn core(&self) -> &StateCore {
        &self.linked.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.linked.core
    }

    fn is_writable(&self) -> bool {
        file_linked_writable(&self.linked.files, &self.incfile_candidate)
    }

    fn release_resources(&mut self) {
        self.linked.release_resources();
        self.incfile = None;
        self.incfile_value = None;
    }

    fn into_backend(self) -> BackendState {
        BackendState::RawFileLinked(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::RawFileLinked(state) => Ok(state),
            other => Err(other),
        }
    }
}
