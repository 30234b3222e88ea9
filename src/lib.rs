//! # modstore
//!
//! Storage layer for installed binary Bible/reference modules:
//! - Opens the index/data file sets of each module layout
//! - Degrades gracefully when optional files are missing
//! - Keeps a single-slot cache of the last decompressed block
//! - Pools opened states so repeated lookups don't reopen files
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Reader (external "Backend")                  │
//! │        decompresses blocks, resolves verse offsets           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ acquire / release
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       StatePool                              │
//! │      ModuleId → lock-free idle queues (one per variant)      │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ open on miss
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌──────────────┐
//!   │   States    │          │    Layout    │
//!   │ (handles +  │◀─────────│ (paths and   │
//!   │ block cache)│          │  probes)     │
//!   └─────────────┘          └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod layout;
pub mod handle;
pub mod module;
pub mod state;
pub mod pool;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::PoolConfig;
pub use error::{OpenWarning, Result, StoreError};
pub use handle::{FileHandle, OpenMode};
pub use layout::{BlockType, Testament};
pub use module::{ModuleId, ModuleMeta, PathResolver};
pub use pool::{Checkout, Lease, PoolStats, Reaper, StatePool};
pub use state::{
    BackendState, BlockCache, CompressedLinkedState, CompressedVerseState, GenericBookState,
    ModuleState, Opened, RawFileLinkedState, RawLinkedState, RawState, StateKind,
};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of modstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
