//! Uncompressed, testament-split verse modules

use std::path::Path;

use crate::error::{OpenWarning, Result, StoreError};
use crate::handle::{FileHandle, OpenMode};
use crate::layout::{can_read, can_write, raw_verse_files, RawVerseFiles, Testament};
use crate::module::PathResolver;

use super::common::{close_slot, open_group, StateCore, WarningSink};
use super::{BackendState, ModuleState, Opened, StateKind};

/// Index + text handles for the Old and New Testament
///
/// Either testament may be missing; at least one must have readable text.
#[derive(Debug)]
pub struct RawState {
    core: StateCore,
    files: [RawVerseFiles; 2],
    index: [Option<FileHandle>; 2],
    text: [Option<FileHandle>; 2],
}

impl RawState {
    pub fn index(&self, testament: Testament) -> Option<&FileHandle> {
        self.index[testament.slot()].as_ref()
    }

    pub fn index_mut(&mut self, testament: Testament) -> Option<&mut FileHandle> {
        self.index[testament.slot()].as_mut()
    }

    pub fn text(&self, testament: Testament) -> Option<&FileHandle> {
        self.text[testament.slot()].as_ref()
    }

    pub fn text_mut(&mut self, testament: Testament) -> Option<&mut FileHandle> {
        self.text[testament.slot()].as_mut()
    }

    /// Both handles of a testament at once, for index-then-text reads
    pub fn pair_mut(
        &mut self,
        testament: Testament,
    ) -> Option<(&mut FileHandle, &mut FileHandle)> {
        let slot = testament.slot();
        match (self.index[slot].as_mut(), self.text[slot].as_mut()) {
            (Some(index), Some(text)) => Some((index, text)),
            _ => None,
        }
    }

    pub fn index_path(&self, testament: Testament) -> &Path {
        &self.files[testament.slot()].index
    }

    pub fn text_path(&self, testament: Testament) -> &Path {
        &self.files[testament.slot()].text
    }

    /// True if the testament's handles are open
    pub fn has_testament(&self, testament: Testament) -> bool {
        let slot = testament.slot();
        self.index[slot].is_some() && self.text[slot].is_some()
    }
}

/// Every testament whose index is readable must have a writable index and a
/// writable text file; at least one testament must be present.
pub(crate) fn verse_files_writable(files: &[RawVerseFiles]) -> bool {
    let mut present = false;
    for pair in files {
        if can_read(&pair.index) {
            present = true;
            if !can_write(&pair.index) || !can_write(&pair.text) {
                return false;
            }
        }
    }
    present
}

impl ModuleState for RawState {
    const KIND: StateKind = StateKind::Raw;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let module = meta.id();
        let dir = meta.data_path();
        let files = [
            raw_verse_files(dir, Testament::Old),
            raw_verse_files(dir, Testament::New),
        ];

        let readable = [can_read(&files[0].text), can_read(&files[1].text)];
        if !readable.iter().any(|r| *r) {
            tracing::error!(module = %module, dir = %dir.display(), "no readable testament");
            return Err(StoreError::NoTestament {
                module: module.clone(),
            });
        }

        let mode = OpenMode::for_writable(verse_files_writable(&files));
        let mut sink = WarningSink::new(module);
        let mut index = [None, None];
        let mut text = [None, None];

        for testament in Testament::ALL {
            let slot = testament.slot();
            let pair = &files[slot];

            if !readable[slot] {
                sink.tolerated(OpenWarning::MissingTestament {
                    testament,
                    path: pair.text.clone(),
                });
                continue;
            }

            let paths = [pair.index.as_path(), pair.text.as_path()];
            if let Some([idx, txt]) = open_group(paths, mode, &mut sink) {
                index[slot] = Some(idx);
                text[slot] = Some(txt);
            }
        }

        tracing::trace!(module = %module, ?mode, "opened raw state");

        Ok(Opened {
            state: RawState {
                core: StateCore::new(module),
                files,
                index,
                text,
            },
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
        verse_files_writable(&self.files)
    }

    fn release_resources(&mut self) {
        let module = self.core.module.clone();
        for slot in self.index.iter_mut().chain(self.text.iter_mut()) {
            close_slot(slot, &module);
        }
        self.core.mark_released();
    }

    fn into_backend(self) -> BackendState {
        BackendState::Raw(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::Raw(state) => Ok(state),
            other => Err(other),
        }
    }
}
