//! Tree-structured (generic book) modules

use std::path::{Path, PathBuf};

use crate::error::{OpenWarning, Result};
use crate::handle::{FileHandle, OpenMode};
use crate::layout::{can_read, genbook_data_path};
use crate::module::PathResolver;

use super::common::{close_slot, open_group, StateCore, WarningSink};
use super::{BackendState, ModuleState, Opened, StateKind};

/// The single `.bdt` data file of a generic book
///
/// A missing data file does not fail construction; `data_mut` is then
/// `None` and the reader has nothing to read.
#[derive(Debug)]
pub struct GenericBookState {
    core: StateCore,
    path: PathBuf,
    data: Option<FileHandle>,
}

impl GenericBookState {
    pub fn data(&self) -> Option<&FileHandle> {
        self.data.as_ref()
    }

    pub fn data_mut(&mut self) -> Option<&mut FileHandle> {
        self.data.as_mut()
    }

    pub fn data_path(&self) -> &Path {
        &self.path
    }
}

impl ModuleState for GenericBookState {
    const KIND: StateKind = StateKind::GenericBook;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let path = genbook_data_path(meta.data_path());
        let mut sink = WarningSink::new(meta.id());

        let data = if can_read(&path) {
            open_group([path.as_path()], OpenMode::Read, &mut sink).map(|[bdt]| bdt)
        } else {
            sink.degraded(OpenWarning::MissingDataFile { path: path.clone() });
            None
        };

        Ok(Opened {
            state: GenericBookState {
                core: StateCore::new(meta.id()),
                path,
                data,
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
        false
    }

    fn release_resources(&mut self) {
        close_slot(&mut self.data, &self.core.module);
        self.core.mark_released();
    }

    fn into_backend(self) -> BackendState {
        BackendState::GenericBook(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::GenericBook(state) => Ok(state),
            other => Err(other),
        }
    }
}
