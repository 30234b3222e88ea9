//! State Pool
//!
//! Registry of per-module idle queues.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::queue::ArrayQueue;
use parking_lot::RwLock;

use crate::config::PoolConfig;
use crate::error::{OpenWarning, Result};
use crate::module::{ModuleId, PathResolver};
use crate::state::{BackendState, ModuleState, Opened, StateKind};

use super::Lease;

/// Idle queues of one module, one per state variant
struct ModuleQueues {
    /// Distinguishes this registration from earlier, retired ones
    generation: u64,
    queues: [ArrayQueue<BackendState>; StateKind::ALL.len()],
}

impl ModuleQueues {
    fn new(generation: u64, capacity: usize) -> Self {
        Self {
            generation,
            queues: std::array::from_fn(|_| ArrayQueue::new(capacity)),
        }
    }

    fn queue(&self, kind: StateKind) -> &ArrayQueue<BackendState> {
        &self.queues[kind.slot()]
    }

    fn drain(&self) -> impl Iterator<Item = BackendState> + '_ {
        self.queues
            .iter()
            .flat_map(|queue| std::iter::from_fn(move || queue.pop()))
    }
}

/// A state handed out by `acquire`
#[derive(Debug)]
pub struct Checkout<S> {
    pub state: S,
    /// Non-fatal problems from construction; empty when recycled
    pub warnings: Vec<OpenWarning>,
    /// True if the state came from the idle queue
    pub recycled: bool,
}

impl<S> Checkout<S> {
    pub fn into_state(self) -> S {
        self.state
    }
}

/// Snapshot of the pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// States built from scratch
    pub constructed: u64,
    /// Acquires served from an idle queue
    pub recycled: u64,
    /// States whose resources the pool released
    pub closed: u64,
}

/// Pool of reusable module states
///
/// ## Concurrency:
/// - `registry`: RwLock, written only when a module is first seen, retired,
///   or the pool shuts down
/// - idle queues: lock-free `ArrayQueue`s, used without the registry lock
/// - checked-out states are never touched by the pool
pub struct StatePool {
    config: PoolConfig,
    registry: RwLock<HashMap<ModuleId, Arc<ModuleQueues>>>,
    shut_down: AtomicBool,

    constructed: AtomicU64,
    recycled: AtomicU64,
    closed: AtomicU64,
}

/// Generations are unique across pools, so a state can only go back to the
/// pool registration it came from. 0 marks a state that was never pooled.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

impl StatePool {
    /// Create a pool; a zero `queue_capacity` is raised to 1
    pub fn new(mut config: PoolConfig) -> Self {
        if config.queue_capacity == 0 {
            tracing::warn!("queue_capacity 0 is not usable, using 1");
            config.queue_capacity = 1;
        }

        Self {
            config,
            registry: RwLock::new(HashMap::new()),
            shut_down: AtomicBool::new(false),
            constructed: AtomicU64::new(0),
            recycled: AtomicU64::new(0),
            closed: AtomicU64::new(0),
        }
    }

    /// Take an idle state for the module, or open a new one
    ///
    /// Construction errors are returned as-is and nothing is cached for them.
    pub fn acquire<S, R>(&self, meta: &R) -> Result<Checkout<S>>
    where
        S: ModuleState,
        R: PathResolver + ?Sized,
    {
        if self.is_shut_down() {
            let Opened { state, warnings } = S::open(meta)?;
            self.constructed.fetch_add(1, Ordering::Relaxed);
            return Ok(Checkout {
                state,
                warnings,
                recycled: false,
            });
        }

        let slot = self.queues_for(meta.id());
        let queue = slot.queue(S::KIND);

        while let Some(idle) = queue.pop() {
            match S::from_backend(idle) {
                Ok(mut state) => {
                    state.core_mut().generation = slot.generation;
                    state.touch();
                    self.recycled.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(
                        module = %meta.id(),
                        kind = ?S::KIND,
                        instance = state.instance_id(),
                        "recycled state"
                    );
                    return Ok(Checkout {
                        state,
                        warnings: Vec::new(),
                        recycled: true,
                    });
                }
                Err(stray) => self.close(stray),
            }
        }

        let Opened { mut state, warnings } = S::open(meta)?;
        state.core_mut().generation = slot.generation;
        self.constructed.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            module = %meta.id(),
            kind = ?S::KIND,
            instance = state.instance_id(),
            warnings = warnings.len(),
            "constructed state"
        );

        Ok(Checkout {
            state,
            warnings,
            recycled: false,
        })
    }

    /// `acquire` wrapped in a guard that releases on drop
    pub fn lease<S, R>(&self, meta: &R) -> Result<Lease<'_, S>>
    where
        S: ModuleState,
        R: PathResolver + ?Sized,
    {
        let checkout = self.acquire(meta)?;
        Ok(Lease::new(self, checkout))
    }

    /// Give a state back
    ///
    /// The state is queued for reuse unless its queue is full, the pool is
    /// shut down, its module was retired, or its resources were already
    /// released; in those cases it is closed here.
    pub fn release<S: ModuleState>(&self, state: S) {
        self.release_backend(state.into_backend());
    }

    pub fn release_backend(&self, mut state: BackendState) {
        if state.core().released {
            tracing::trace!(module = %state.module(), "dropping released state");
            return;
        }
        if self.is_shut_down() {
            self.close(state);
            return;
        }

        let slot = self.registry.read().get(state.module()).cloned();
        let Some(slot) = slot.filter(|slot| slot.generation == state.core().generation) else {
            tracing::debug!(module = %state.module(), "module retired, closing state");
            self.close(state);
            return;
        };

        state.core_mut().last_access = Instant::now();
        if let Err(rejected) = slot.queue(state.kind()).push(state) {
            tracing::debug!(module = %rejected.module(), kind = ?rejected.kind(), "idle queue full");
            self.close(rejected);
        }
    }

    /// Forget a module that was deleted or uninstalled
    ///
    /// Idle states are closed now; states still checked out are closed when
    /// they are released. Returns the number of idle states closed.
    pub fn retire(&self, module: &ModuleId) -> usize {
        let Some(slot) = self.registry.write().remove(module) else {
            return 0;
        };

        let mut count = 0;
        for state in slot.drain() {
            self.close(state);
            count += 1;
        }
        tracing::info!(module = %module, closed = count, "retired module");
        count
    }

    /// Close idle states untouched for longer than `idle_expiry`
    pub fn evict_idle(&self) -> usize {
        let expiry = self.config.idle_expiry;
        let slots: Vec<Arc<ModuleQueues>> = self.registry.read().values().cloned().collect();

        let mut evicted = 0;
        for slot in slots {
            for queue in &slot.queues {
                // Bounded by the current length so re-pushed states are not revisited
                for _ in 0..queue.len() {
                    let Some(state) = queue.pop() else { break };
                    if state.core().last_access.elapsed() > expiry {
                        self.close(state);
                        evicted += 1;
                    } else if let Err(rejected) = queue.push(state) {
                        self.close(rejected);
                    }
                }
            }
        }

        if evicted > 0 {
            tracing::debug!(evicted, "evicted idle states");
        }
        evicted
    }

    /// Close every idle state; later releases close instead of queueing
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::SeqCst);

        let slots: Vec<Arc<ModuleQueues>> = self.registry.write().drain().map(|(_, s)| s).collect();
        let mut count = 0;
        for slot in slots {
            for state in slot.drain() {
                self.close(state);
                count += 1;
            }
        }
        tracing::info!(closed = count, "state pool shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Number of idle states queued for a module and variant
    pub fn idle_count(&self, module: &ModuleId, kind: StateKind) -> usize {
        self.registry
            .read()
            .get(module)
            .map(|slot| slot.queue(kind).len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            constructed: self.constructed.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// The module's queues, registered on first sight
    fn queues_for(&self, module: &ModuleId) -> Arc<ModuleQueues> {
        if let Some(slot) = self.registry.read().get(module) {
            return Arc::clone(slot);
        }

        let mut registry = self.registry.write();
        let slot = registry.entry(module.clone()).or_insert_with(|| {
            let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(module = %module, generation, "registered module queues");
            Arc::new(ModuleQueues::new(generation, self.config.queue_capacity))
        });
        Arc::clone(slot)
    }

    fn close(&self, mut state: BackendState) {
        state.release_resources();
        self.closed.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for StatePool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

impl Drop for StatePool {
    fn drop(&mut self) {
        if !self.is_shut_down() {
            self.shutdown();
        }
    }
}
