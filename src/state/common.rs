//! Lifecycle plumbing shared by every state variant
//!
//! Variants do not inherit from one another; they call these helpers for the
//! parts that must behave identically (bookkeeping, grouped opens, closing
//! and warning collection).

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::{OpenWarning, StoreError};
use crate::handle::{FileHandle, OpenMode};
use crate::module::ModuleId;

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Bookkeeping every state carries
#[derive(Debug)]
pub struct StateCore {
    pub(crate) module: ModuleId,
    pub(crate) instance_id: u64,
    /// Pool generation of the module at checkout; 0 until first pooled
    pub(crate) generation: u64,
    pub(crate) released: bool,
    pub(crate) last_access: Instant,
}

impl StateCore {
    pub(crate) fn new(module: &ModuleId) -> Self {
        Self {
            module: module.clone(),
            instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
            generation: 0,
            released: false,
            last_access: Instant::now(),
        }
    }

    pub(crate) fn mark_released(&mut self) {
        self.released = true;
    }

    pub(crate) fn ensure_open(&self) -> crate::error::Result<()> {
        if self.released {
            return Err(StoreError::Released {
                module: self.module.clone(),
            });
        }
        Ok(())
    }
}

/// Collects the non-fatal problems of one construction
pub(crate) struct WarningSink {
    module: ModuleId,
    warnings: Vec<OpenWarning>,
}

impl WarningSink {
    pub(crate) fn new(module: &ModuleId) -> Self {
        Self {
            module: module.clone(),
            warnings: Vec::new(),
        }
    }

    /// Something the reader will notice is missing
    pub(crate) fn degraded(&mut self, warning: OpenWarning) {
        tracing::warn!(module = %self.module, "{}", warning);
        self.warnings.push(warning);
    }

    /// Expected gaps, e.g. a New-Testament-only module
    pub(crate) fn tolerated(&mut self, warning: OpenWarning) {
        tracing::debug!(module = %self.module, "{}", warning);
        self.warnings.push(warning);
    }

    fn open_failed(&mut self, path: &Path, err: &StoreError) {
        tracing::error!(module = %self.module, path = %path.display(), "open failed: {}", err);
        self.warnings.push(OpenWarning::OpenFailed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        });
    }

    pub(crate) fn finish(self) -> Vec<OpenWarning> {
        self.warnings
    }
}

/// Open every path of a role, or none of them
///
/// If any open fails, the handles already opened are closed and `None` is
/// returned; the failure is recorded on `sink`.
pub(crate) fn open_group<const N: usize>(
    paths: [&Path; N],
    mode: OpenMode,
    sink: &mut WarningSink,
) -> Option<[FileHandle; N]> {
    let mut opened = Vec::with_capacity(N);

    for path in paths {
        match FileHandle::open(path, mode) {
            Ok(handle) => opened.push(handle),
            Err(e) => {
                sink.open_failed(path, &e);
                for handle in opened {
                    close_logged(handle, &sink.module);
                }
                return None;
            }
        }
    }

    opened.try_into().ok()
}

/// Close and clear one handle slot
///
/// A failed close is logged; the slot is cleared regardless.
pub(crate) fn close_slot(slot: &mut Option<FileHandle>, module: &ModuleId) {
    if let Some(handle) = slot.take() {
        close_logged(handle, module);
    }
}

fn close_logged(handle: FileHandle, module: &ModuleId) {
    let path = handle.path().to_path_buf();
    if let Err(e) = handle.close() {
        tracing::warn!(module = %module, path = %path.display(), "close failed: {}", e);
    }
}
