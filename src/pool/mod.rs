//! Pool Module
//!
//! Recycles module states instead of reopening files for every lookup.
//!
//! ## Responsibilities
//! - Hand out an idle state for a module, or construct a new one
//! - Take states back; close them when the queue is full, the pool is shut
//!   down, or the module was retired in the meantime
//! - Close states that sat idle for too long (explicitly or via `Reaper`)
//!
//! ## Concurrency
//! ```text
//!   registry: RwLock<HashMap<ModuleId, Arc<ModuleQueues>>>
//!               │  write lock only to create / retire a module's queues
//!               ▼
//!   ModuleQueues { generation, [ArrayQueue<BackendState>; 6] }
//!               │  lock-free push/pop, one queue per variant
//!               ▼
//!   BackendState  ── checked out ──▶  exactly one caller
//! ```
//!
//! Callers must not rely on the order in which idle states come back out.

mod lease;
mod manager;
mod reaper;

pub use lease::Lease;
pub use manager::{Checkout, PoolStats, StatePool};
pub use reaper::Reaper;
