//! State Module
//!
//! A state owns the open file handles of one module for one reader at a time.
//! States are expensive to build (several opens and permission probes), so
//! readers take them from the pool and give them back instead of dropping
//! them.
//!
//! ## Variants
//! ```text
//! RawState               ot + ot.vss, nt + nt.vss
//! RawLinkedState         base.idx + base.dat
//! RawFileLinkedState     RawLinkedState + incfile counter
//! CompressedLinkedState  RawLinkedState + base.zdx + base.zdt + block cache
//! CompressedVerseState   per testament: .?zs + .?zv + .?zz + block cache
//! GenericBookState       base.bdt
//! ```
//!
//! ## Lifecycle
//! - Handles are fixed per variant; any of them may be absent when its file
//!   was missing or failed to open. Readers check before use.
//! - `release_resources` closes and clears every handle and is idempotent.
//!   A released state is never pooled again.
//! - Only a missing required data file fails construction; everything else
//!   degrades and is reported through `Opened::warnings`.

mod cache;
mod common;
mod compressed;
mod genbook;
mod linked;
mod raw;

use std::time::Instant;

use crate::error::{OpenWarning, Result};
use crate::module::{ModuleId, PathResolver};

pub use cache::BlockCache;
pub use common::StateCore;
pub use compressed::{CompressedLinkedState, CompressedVerseState};
pub use genbook::GenericBookState;
pub use linked::{RawFileLinkedState, RawLinkedState};
pub use raw::RawState;

/// Discriminant of the state variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateKind {
    Raw,
    RawLinked,
    RawFileLinked,
    CompressedLinked,
    CompressedVerse,
    GenericBook,
}

impl StateKind {
    pub const ALL: [StateKind; 6] = [
        StateKind::Raw,
        StateKind::RawLinked,
        StateKind::RawFileLinked,
        StateKind::CompressedLinked,
        StateKind::CompressedVerse,
        StateKind::GenericBook,
    ];

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

/// A freshly constructed state plus whatever went wrong on the way
#[derive(Debug)]
pub struct Opened<S> {
    pub state: S,
    pub warnings: Vec<OpenWarning>,
}

impl<S> Opened<S> {
    pub fn into_state(self) -> S {
        self.state
    }

    pub fn is_degraded(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Behaviour shared by every state variant
pub trait ModuleState: Send + Sized + 'static {
    const KIND: StateKind;

    /// Open the module's files for this layout
    ///
    /// Prefer `StatePool::acquire`, which reuses idle states.
    fn open<R: PathResolver + ?Sized>(meta: &R) -> Result<Opened<Self>>;

    fn core(&self) -> &StateCore;

    fn core_mut(&mut self) -> &mut StateCore;

    /// Whether the on-disk files currently grant write access
    ///
    /// Re-derived from the file system on every call.
    fn is_writable(&self) -> bool;

    /// Close and clear every handle. Safe to call more than once.
    fn release_resources(&mut self);

    fn into_backend(self) -> BackendState;

    /// Unwrap the matching variant, handing back anything else untouched
    fn from_backend(state: BackendState) -> std::result::Result<Self, BackendState>;

    fn module(&self) -> &ModuleId {
        &self.core().module
    }

    fn kind(&self) -> StateKind {
        Self::KIND
    }

    /// Process-unique id; stays the same across pool round trips
    fn instance_id(&self) -> u64 {
        self.core().instance_id
    }

    fn is_released(&self) -> bool {
        self.core().released
    }

    fn last_access(&self) -> Instant {
        self.core().last_access
    }

    fn touch(&mut self) {
        self.core_mut().last_access = Instant::now();
    }
}

/// Any state, as held by the pool's idle queues
#[derive(Debug)]
pub enum BackendState {
    Raw(RawState),
    RawLinked(RawLinkedState),
    RawFileLinked(RawFileLinkedState),
    CompressedLinked(CompressedLinkedState),
    CompressedVerse(CompressedVerseState),
    GenericBook(GenericBookState),
}

macro_rules! each_variant {
    ($value:expr, $state:ident => $body:expr) => {
        match $value {
            BackendState::Raw($state) => $body,
            BackendState::RawLinked($state) => $body,
            BackendState::RawFileLinked($state) => $body,
            BackendState::CompressedLinked($state) => $body,
            BackendState::CompressedVerse($state) => $body,
            BackendState::GenericBook($state) => $body,
        }
    };
}

impl BackendState {
    pub fn kind(&self) -> StateKind {
        match self {
            BackendState::Raw(_) => StateKind::Raw,
            BackendState::RawLinked(_) => StateKind::RawLinked,
            BackendState::RawFileLinked(_) => StateKind::RawFileLinked,
            BackendState::CompressedLinked(_) => StateKind::CompressedLinked,
            BackendState::CompressedVerse(_) => StateKind::CompressedVerse,
            BackendState::GenericBook(_) => StateKind::GenericBook,
        }
    }

    pub fn core(&self) -> &StateCore {
        each_variant!(self, s => s.core())
    }

    pub fn core_mut(&mut self) -> &mut StateCore {
        each_variant!(self, s => s.core_mut())
    }

    pub fn module(&self) -> &ModuleId {
        &self.core().module
    }

    pub fn release_resources(&mut self) {
        each_variant!(self, s => s.release_resources())
    }
}

macro_rules! backend_conversions {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for BackendState {
                fn from(state: $ty) -> Self {
                    BackendState::$variant(state)
                }
            }
        )*
    };
}

backend_conversions! {
    Raw => RawState,
    RawLinked => RawLinkedState,
    RawFileLinked => RawFileLinkedState,
    CompressedLinked => CompressedLinkedState,
    CompressedVerse => CompressedVerseState,
    GenericBook => GenericBookState,
}
