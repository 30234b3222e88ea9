//! Module identity and metadata
//!
//! The pool only ever compares module identities; where the files live and
//! how they are laid out comes from a `PathResolver`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::layout::BlockType;

/// Opaque identity of one installed module (its initials, by convention)
///
/// Cloning is cheap; equality and hashing use the name only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(Arc<str>);

impl ModuleId {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Where a module's files are and which layout features apply
///
/// For verse modules `data_path` is the module directory; for linked and
/// generic-book modules it is the base file name the extensions are
/// appended to.
pub trait PathResolver {
    fn id(&self) -> &ModuleId;

    fn data_path(&self) -> &Path;

    /// Block granularity of a compressed verse module
    fn block_type(&self) -> BlockType {
        BlockType::default()
    }
}

/// Plain metadata record, the default `PathResolver`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleMeta {
    id: ModuleId,
    data_path: PathBuf,
    block_type: BlockType,
}

impl ModuleMeta {
    pub fn new(id: impl Into<ModuleId>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            data_path: data_path.into(),
            block_type: BlockType::default(),
        }
    }

    pub fn with_block_type(mut self, block_type: BlockType) -> Self {
        self.block_type = block_type;
        self
    }
}

impl PathResolver for ModuleMeta {
    fn id(&self) -> &ModuleId {
        &self.id
    }

    fn data_path(&self) -> &Path {
        &self.data_path
    }

    fn block_type(&self) -> BlockType {
        self.block_type
    }
}
