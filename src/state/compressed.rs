//! Block-compressed modules
//!
//! Both variants add compressed file handles to a raw layout and keep the
//! most recently decompressed block in a `BlockCache`. Decompression and
//! block selection belong to the reader; the state only holds the slot.

use std::path::Path;

use crate::error::{OpenWarning, Result};
use crate::handle::{FileHandle, OpenMode};
use crate::layout::{
    can_read, compressed_linked_files, compressed_verse_files, CompressedLinkedFiles,
    CompressedVerseFiles, Testament,
};
use crate::module::PathResolver;

use super::cache::BlockCache;
use super::common::{close_slot, open_group, StateCore, WarningSink};
use super::linked::{linked_writable, RawLinkedState};
use super::{BackendState, ModuleState, Opened, StateKind};

// =============================================================================
// CompressedLinkedState
// =============================================================================

/// A linked module whose entries live in compressed blocks
///
/// The uncompressed `.idx`/`.dat` pair is opened exactly as for
/// `RawLinkedState`; the `.zdx`/`.zdt` pair is optional.
#[derive(Debug)]
pub struct CompressedLinkedState {
    linked: RawLinkedState,
    zfiles: CompressedLinkedFiles,
    zindex: Option<FileHandle>,
    zdata: Option<FileHandle>,
    cache: BlockCache<u64>,
}

impl CompressedLinkedState {
    pub fn linked(&self) -> &RawLinkedState {
        &self.linked
    }

    pub fn linked_mut(&mut self) -> &mut RawLinkedState {
        &mut self.linked
    }

    pub fn zindex_mut(&mut self) -> Option<&mut FileHandle> {
        self.zindex.as_mut()
    }

    pub fn zdata_mut(&mut self) -> Option<&mut FileHandle> {
        self.zdata.as_mut()
    }

    /// True if the compressed pair is open
    pub fn has_compressed(&self) -> bool {
        self.zindex.is_some() && self.zdata.is_some()
    }

    pub fn compressed_files(&self) -> &CompressedLinkedFiles {
        &self.zfiles
    }

    pub fn cache(&self) -> &BlockCache<u64> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut BlockCache<u64> {
        &mut self.cache
    }

    /// Block number held in the cache; `None` when empty
    pub fn last_block_number(&self) -> Option<u64> {
        self.cache.last_key()
    }
}

impl ModuleState for CompressedLinkedState {
    const KIND: StateKind = StateKind::CompressedLinked;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let base = meta.data_path();
        let mut sink = WarningSink::new(meta.id());
        let linked = RawLinkedState::build(meta.id(), base, linked_writable, &mut sink)?;

        let zfiles = compressed_linked_files(base);
        let mut zindex = None;
        let mut zdata = None;

        let pair = [zfiles.index.as_path(), zfiles.data.as_path()];
        if let Some(missing) = first_unreadable(&pair) {
            sink.degraded(OpenWarning::MissingCompressed {
                path: missing.to_path_buf(),
            });
        } else if let Some([zdx, zdt]) = open_group(pair, OpenMode::Read, &mut sink) {
            zindex = Some(zdx);
            zdata = Some(zdt);
        }

        Ok(Opened {
            state: CompressedLinkedState {
                linked,
                zfiles,
                zindex,
                zdata,
                cache: BlockCache::new(),
            },
            warnings: sink.finish(),
        })
    }

    fn core(&self) -> &StateCore {
        self.linked.core()
    }

    fn core_mut(&mut self) -> &mut StateCore {
        self.linked.core_mut()
    }

    fn is_writable(&self) -> bool {
        linked_writable(self.linked.files())
    }

    fn release_resources(&mut self) {
        let module = self.linked.module().clone();
        close_slot(&mut self.zindex, &module);
        close_slot(&mut self.zdata, &module);
        self.cache.clear();
        self.linked.release_resources();
    }

    fn into_backend(self) -> BackendState {
        BackendState::CompressedLinked(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::CompressedLinked(state) => Ok(state),
            other => Err(other),
        }
    }
}

// =============================================================================
// CompressedVerseState
// =============================================================================

/// A testament-split verse module stored in compressed blocks
///
/// Per testament: block index (`s`), verse locator (`v`), payload (`z`).
/// The two testaments number their blocks independently, so the cache key
/// carries the testament.
#[derive(Debug)]
pub struct CompressedVerseState {
    core: StateCore,
    files: [CompressedVerseFiles; 2],
    block_index: [Option<FileHandle>; 2],
    locator: [Option<FileHandle>; 2],
    payload: [Option<FileHandle>; 2],
    cache: BlockCache<(Testament, u64)>,
}

impl CompressedVerseState {
    pub fn block_index_mut(&mut self, testament: Testament) -> Option<&mut FileHandle> {
        self.block_index[testament.slot()].as_mut()
    }

    pub fn locator_mut(&mut self, testament: Testament) -> Option<&mut FileHandle> {
        self.locator[testament.slot()].as_mut()
    }

    pub fn payload_mut(&mut self, testament: Testament) -> Option<&mut FileHandle> {
        self.payload[testament.slot()].as_mut()
    }

    pub fn files(&self, testament: Testament) -> &CompressedVerseFiles {
        &self.files[testament.slot()]
    }

    pub fn has_testament(&self, testament: Testament) -> bool {
        let slot = testament.slot();
        self.block_index[slot].is_some()
            && self.locator[slot].is_some()
            && self.payload[slot].is_some()
    }

    pub fn cache(&self) -> &BlockCache<(Testament, u64)> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut BlockCache<(Testament, u64)> {
        &mut self.cache
    }

    /// Testament of the cached block
    pub fn last_testament(&self) -> Option<Testament> {
        self.cache.last_key().map(|(testament, _)| testament)
    }

    /// Block number of the cached block, within `last_testament`
    pub fn last_block_number(&self) -> Option<u64> {
        self.cache.last_key().map(|(_, block)| block)
    }
}

impl ModuleState for CompressedVerseState {
    const KIND: StateKind = StateKind::CompressedVerse;

    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>> {
        let module = meta.id();
        let dir = meta.data_path();
        let block_type = meta.block_type();
        let files = [
            compressed_verse_files(dir, Testament::Old, block_type),
            compressed_verse_files(dir, Testament::New, block_type),
        ];

        let mut sink = WarningSink::new(module);
        let mut block_index = [None, None];
        let mut locator = [None, None];
        let mut payload = [None, None];

        for testament in Testament::ALL {
            let slot = testament.slot();
            let set = &files[slot];

            // One-testament modules are normal here
            if !can_read(&set.block_index) {
                sink.tolerated(OpenWarning::MissingTestament {
                    testament,
                    path: set.block_index.clone(),
                });
                continue;
            }

            if let Some([blocks, verses, data]) = open_group(
                [set.block_index.as_path(), set.locator.as_path(), set.payload.as_path()],
                OpenMode::Read,
                &mut sink,
            ) {
                block_index[slot] = Some(blocks);
                locator[slot] = Some(verses);
                payload[slot] = Some(data);
            }
        }

        tracing::trace!(module = %module, ?block_type, "opened compressed verse state");

        Ok(Opened {
            state: CompressedVerseState {
                core: StateCore::new(module),
                files,
                block_index,
                locator,
                payload,
                cache: BlockCache::new(),
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

    /// Compressed verse modules are never written in place
    fn is_writable(&self) -> bool {
        false
    }

    fn release_resources(&mut self) {
        let module = self.core.module.clone();
        for slot in self
            .block_index
            .iter_mut()
            .chain(self.locator.iter_mut())
            .chain(self.payload.iter_mut())
        {
            close_slot(slot, &module);
        }
        self.cache.clear();
        self.core.mark_released();
    }

    fn into_backend(self) -> BackendState {
        BackendState::CompressedVerse(self)
    }

    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState> {
        match state {
            BackendState::CompressedVerse(state) => Ok(state),
            other => Err(other),
        }
    }
}

fn first_unreadable<'a>(paths: &[&'a Path]) -> Option<&'a Path> {
    paths.iter().copied().find(|path| !can_read(path))
}
