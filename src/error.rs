//! Error types for modstore
//!
//! `StoreError` is fatal: the state could not be built or used.
//! `OpenWarning` is the non-fatal side: a state was built, but some of its
//! files were missing or failed to open and the matching handles are absent.

use std::path::PathBuf;

use thiserror::Error;

use crate::layout::Testament;
use crate::module::ModuleId;

/// Result type alias using StoreError
pub type Result<T> = std::result::Result<T, StoreError>;

/// Unified error type for modstore operations
#[derive(Debug, Error)]
pub enum StoreError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Construction Errors
    // -------------------------------------------------------------------------
    #[error("{module}: required data file {} is not readable", path.display())]
    MissingData { module: ModuleId, path: PathBuf },

    #[error("{module}: neither Old nor New Testament text is readable")]
    NoTestament { module: ModuleId },

    // -------------------------------------------------------------------------
    // State Errors
    // -------------------------------------------------------------------------
    #[error("malformed increment file {}: {reason}", path.display())]
    IncFile { path: PathBuf, reason: String },

    #[error("{module}: state resources have already been released")]
    Released { module: ModuleId },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A tolerated problem met while opening a state
///
/// The state is still handed out; the handles tied to `path` are absent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpenWarning {
    #[error("{testament} text {} is not readable", path.display())]
    MissingTestament { testament: Testament, path: PathBuf },

    #[error("index file {} is not readable", path.display())]
    MissingIndex { path: PathBuf },

    #[error("compressed file {} is not readable", path.display())]
    MissingCompressed { path: PathBuf },

    #[error("data file {} is not readable", path.display())]
    MissingDataFile { path: PathBuf },

    #[error("could not open {}: {reason}", path.display())]
    OpenFailed { path: PathBuf, reason: String },
}

impl OpenWarning {
    /// Path of the file the warning is about
    pub fn path(&self) -> &std::path::Path {
        match self {
            OpenWarning::MissingTestament { path, .. }
            | OpenWarning::MissingIndex { path }
            | OpenWarning::MissingCompressed { path }
            | OpenWarning::MissingDataFile { path }
            | OpenWarning::OpenFailed { path, .. } => path,
        }
    }
}
