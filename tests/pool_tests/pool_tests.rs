//! Tests for StatePool
//!
//! These tests verify:
//! - Released states are handed out again, per module and per variant
//! - Construction failures propagate and leave nothing behind
//! - Overflow, retirement and shutdown close states
//! - Lease guards return their state on drop
//! - Concurrent acquire/release

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use modstore::{
    CompressedLinkedState, GenericBookState, ModuleId, ModuleMeta, ModuleState, PathResolver,
    PoolConfig, PoolStats, RawLinkedState, RawState, StateKind, StatePool, StoreError, Testament,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

/// A verse module directory with both testaments
fn setup_raw(root: &Path, name: &str) -> ModuleMeta {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    for stem in ["ot", "nt"] {
        fs::write(dir.join(stem), b"text").unwrap();
        fs::write(dir.join(format!("{stem}.vss")), [0u8; 6]).unwrap();
    }
    ModuleMeta::new(name, dir)
}

/// A linked module with compressed files, base path `<root>/<name>/<name>`
fn setup_compressed_linked(root: &Path, name: &str) -> ModuleMeta {
    let dir = root.join(name);
    fs::create_dir_all(&dir).unwrap();
    let base: PathBuf = dir.join(name);
    for ext in ["idx", "dat", "zdx", "zdt"] {
        fs::write(base.with_extension(ext), [0u8; 8]).unwrap();
    }
    ModuleMeta::new(name, base)
}

fn pool_with_capacity(capacity: usize) -> StatePool {
    StatePool::new(PoolConfig::builder().queue_capacity(capacity).build().unwrap())
}

// =============================================================================
// Reuse Tests
// =============================================================================

#[test]
fn test_released_state_is_reused() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    let first = pool.acquire::<RawState, _>(&meta).unwrap();
    assert!(!first.recycled);
    let id = first.state.instance_id();
    pool.release(first.into_state());

    let second = pool.acquire::<RawState, _>(&meta).unwrap();
    assert!(second.recycled);
    assert!(second.warnings.is_empty());
    assert_eq!(second.state.instance_id(), id);
    assert!(second.state.has_testament(Testament::Old));

    assert_eq!(
        pool.stats(),
        PoolStats {
            constructed: 1,
            recycled: 1,
            closed: 0
        }
    );
}

#[test]
fn test_modules_do_not_share_states() {
    let temp = TempDir::new().unwrap();
    let kjv = setup_raw(temp.path(), "KJV");
    let web = setup_raw(temp.path(), "WEB");
    let pool = StatePool::default();

    let state = pool.acquire::<RawState, _>(&kjv).unwrap().into_state();
    let kjv_id = state.instance_id();
    pool.release(state);

    let other = pool.acquire::<RawState, _>(&web).unwrap();
    assert!(!other.recycled);
    assert_ne!(other.state.instance_id(), kjv_id);
    assert_eq!(other.state.module().as_str(), "WEB");

    assert_eq!(pool.idle_count(&ModuleId::from("KJV"), StateKind::Raw), 1);
}

#[test]
fn test_variants_do_not_share_states() {
    let temp = TempDir::new().unwrap();
    let meta = setup_compressed_linked(temp.path(), "Eastons");
    let pool = StatePool::default();

    let compressed = pool
        .acquire::<CompressedLinkedState, _>(&meta)
        .unwrap()
        .into_state();
    pool.release(compressed);

    // Same module, different layout: nothing to recycle
    let linked = pool.acquire::<RawLinkedState, _>(&meta).unwrap();
    assert!(!linked.recycled);
    assert_eq!(linked.state.kind(), StateKind::RawLinked);
    assert_eq!(pool.idle_count(meta.id(), StateKind::CompressedLinked), 1);
}

#[test]
fn test_recycled_state_keeps_cache() {
    let temp = TempDir::new().unwrap();
    let meta = setup_compressed_linked(temp.path(), "Eastons");
    let pool = StatePool::default();

    let mut state = pool
        .acquire::<CompressedLinkedState, _>(&meta)
        .unwrap()
        .into_state();
    state.cache_mut().store(4, b"block".to_vec());
    pool.release(state);

    let again = pool
        .acquire::<CompressedLinkedState, _>(&meta)
        .unwrap()
        .into_state();
    assert_eq!(again.last_block_number(), Some(4));
}

#[test]
fn test_fresh_state_after_release_resources_has_empty_cache() {
    let temp = TempDir::new().unwrap();
    let meta = setup_compressed_linked(temp.path(), "Eastons");
    let pool = StatePool::default();

    let mut state = pool
        .acquire::<CompressedLinkedState, _>(&meta)
        .unwrap()
        .into_state();
    state.cache_mut().store(4, b"block".to_vec());
    let old_id = state.instance_id();
    state.release_resources();
    pool.release(state);

    // A released state is never queued
    assert_eq!(pool.idle_count(meta.id(), StateKind::CompressedLinked), 0);

    let fresh = pool.acquire::<CompressedLinkedState, _>(&meta).unwrap();
    assert!(!fresh.recycled);
    assert_ne!(fresh.state.instance_id(), old_id);
    assert!(fresh.state.cache().is_empty());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_construction_error_propagates() {
    let temp = TempDir::new().unwrap();
    let meta = ModuleMeta::new("Missing", temp.path().join("nothing"));
    let pool = StatePool::default();

    let result = pool.acquire::<RawLinkedState, _>(&meta);
    assert!(matches!(result, Err(StoreError::MissingData { .. })));

    // Creating the files afterwards works; no failure was remembered
    fs::write(temp.path().join("nothing.dat"), b"x").unwrap();
    fs::write(temp.path().join("nothing.idx"), [0u8; 6]).unwrap();
    let checkout = pool.acquire::<RawLinkedState, _>(&meta).unwrap();
    assert!(!checkout.recycled);
    assert_eq!(pool.stats().constructed, 1);
}

#[test]
fn test_degraded_state_is_still_pooled() {
    let temp = TempDir::new().unwrap();
    let meta = ModuleMeta::new("Bunyan", temp.path().join("pilgrim"));
    let pool = StatePool::default();

    let checkout = pool.acquire::<GenericBookState, _>(&meta).unwrap();
    assert_eq!(checkout.warnings.len(), 1);
    pool.release(checkout.into_state());

    let again = pool.acquire::<GenericBookState, _>(&meta).unwrap();
    assert!(again.recycled);
    assert!(again.state.data().is_none());
}

// =============================================================================
// Closing Tests
// =============================================================================

#[test]
fn test_full_queue_closes_extra_states() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = pool_with_capacity(1);

    let a = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let b = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let b_id = b.instance_id();
    pool.release(a);
    pool.release(b);

    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 1);
    assert_eq!(pool.stats().closed, 1);

    let kept = pool.acquire::<RawState, _>(&meta).unwrap();
    assert_ne!(kept.state.instance_id(), b_id);
}

#[test]
fn test_retire_closes_idle_and_outstanding_states() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    let idle = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let outstanding = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let outstanding_id = outstanding.instance_id();
    pool.release(idle);

    assert_eq!(pool.retire(meta.id()), 1);
    assert_eq!(pool.retire(meta.id()), 0);

    // Released after retirement: closed, not queued
    pool.release(outstanding);
    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 0);
    assert_eq!(pool.stats().closed, 2);

    let fresh = pool.acquire::<RawState, _>(&meta).unwrap();
    assert!(!fresh.recycled);
    assert_ne!(fresh.state.instance_id(), outstanding_id);
}

#[test]
fn test_shutdown_closes_everything() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    let idle = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let outstanding = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    pool.release(idle);

    pool.shutdown();
    assert!(pool.is_shut_down());
    assert_eq!(pool.stats().closed, 1);

    pool.release(outstanding);
    assert_eq!(pool.stats().closed, 2);

    // Acquire still works but nothing is kept
    let after = pool.acquire::<RawState, _>(&meta).unwrap();
    assert!(!after.recycled);
    pool.release(after.into_state());
    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 0);
}

#[test]
fn test_directly_opened_state_is_not_pooled() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    // Register the module so a queue exists
    let pooled = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    pool.release(pooled);

    let direct = RawState::open(&meta).unwrap().into_state();
    pool.release(direct);

    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 1);
    assert_eq!(pool.stats().closed, 1);
}

#[test]
fn test_state_from_another_pool_is_not_adopted() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let first = StatePool::default();
    let second = StatePool::default();

    // Both pools register the module, each for the first time
    let foreign = first.acquire::<RawState, _>(&meta).unwrap().into_state();
    let own = second.acquire::<RawState, _>(&meta).unwrap().into_state();
    second.release(own);

    second.release(foreign);

    assert_eq!(second.idle_count(meta.id(), StateKind::Raw), 1);
    assert_eq!(second.stats().closed, 1);
    assert_eq!(first.idle_count(meta.id(), StateKind::Raw), 0);
}

// =============================================================================
// Configuration Tests
// =============================================================================

#[test]
fn test_zero_capacity_literal_config_is_raised() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let config = PoolConfig {
        queue_capacity: 0,
        ..PoolConfig::default()
    };
    let pool = StatePool::new(config);

    assert_eq!(pool.config().queue_capacity, 1);

    let state = pool.acquire::<RawState, _>(&meta).unwrap().into_state();
    let id = state.instance_id();
    pool.release(state);

    let again = pool.acquire::<RawState, _>(&meta).unwrap();
    assert!(again.recycled);
    assert_eq!(again.state.instance_id(), id);
}

// =============================================================================
// Lease Tests
// =============================================================================

#[test]
fn test_lease_returns_state_on_drop() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    let id = {
        let lease = pool.lease::<RawState, _>(&meta).unwrap();
        assert!(!lease.recycled());
        lease.instance_id()
    };
    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 1);

    let lease = pool.lease::<RawState, _>(&meta).unwrap();
    assert!(lease.recycled());
    assert_eq!(lease.instance_id(), id);
}

#[test]
fn test_detached_lease_is_not_returned() {
    let temp = TempDir::new().unwrap();
    let meta = setup_raw(temp.path(), "KJV");
    let pool = StatePool::default();

    let state = pool.lease::<RawState, _>(&meta).unwrap().detach();

    assert_eq!(pool.idle_count(meta.id(), StateKind::Raw), 0);
    assert!(!state.is_released());
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[test]
fn test_concurrent_acquire_release() {
    let temp = TempDir::new().unwrap();
    let meta = Arc::new(setup_raw(temp.path(), "KJV"));
    let pool = Arc::new(pool_with_capacity(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            let meta = Arc::clone(&meta);
            thread::spawn(move || {
                let mut seen = Vec::new();
                for _ in 0..50 {
                    let mut lease = pool.lease::<RawState, _>(meta.as_ref()).unwrap();
                    let (index, _) = lease.pair_mut(Testament::New).unwrap();
                    assert_eq!(index.read_at(0, 6).unwrap().len(), 6);
                    seen.push(lease.instance_id());
                }
                seen
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        ids.extend(handle.join().unwrap());
    }

    // Never more states than threads could hold at once
    let stats = pool.stats();
    assert!(ids.len() <= 8 + stats.closed as usize);
    assert_eq!(stats.constructed + stats.recycled, 400);
    assert!(stats.recycled > 0);
}
