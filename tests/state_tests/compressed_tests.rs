//! Tests for CompressedLinkedState and CompressedVerseState
//!
//! These tests verify:
//! - Degraded opens when compressed files are missing
//! - File naming per block type
//! - The single-slot block cache as seen through a state

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use modstore::{
    BlockType, CompressedLinkedState, CompressedVerseState, ModuleMeta, ModuleState, OpenMode,
    OpenWarning, StoreError, Testament,
};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_linked(dir: &Path, with_compressed: bool) -> PathBuf {
    let base = dir.join("eastons");
    fs::write(base.with_extension("idx"), [0u8; 8]).unwrap();
    fs::write(base.with_extension("dat"), b"AARON\r\n").unwrap();
    if with_compressed {
        fs::write(base.with_extension("zdx"), [0u8; 8]).unwrap();
        fs::write(base.with_extension("zdt"), b"compressed").unwrap();
    }
    base
}

/// Writes the three files of one testament for the given block indicator
fn write_verse_testament(dir: &Path, stem: &str, indicator: char) {
    for role in ['s', 'v', 'z'] {
        let name = format!("{stem}.{indicator}z{role}");
        fs::write(dir.join(name), [0u8; 12]).unwrap();
    }
}

// =============================================================================
// CompressedLinkedState Tests
// =============================================================================

#[test]
fn test_compressed_linked_full_set() {
    let temp = TempDir::new().unwrap();
    let base = setup_linked(temp.path(), true);

    let opened = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base)).unwrap();

    assert!(opened.warnings.is_empty());
    assert!(opened.state.has_compressed());
    assert!(opened.state.linked().index().is_some());
    assert!(opened.state.cache().is_empty());
}

#[test]
fn test_missing_compressed_pair_degrades() {
    let temp = TempDir::new().unwrap();
    let base = setup_linked(temp.path(), false);

    let opened = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base)).unwrap();

    assert!(!opened.state.has_compressed());
    assert!(opened.state.linked().data().is_some());
    assert_eq!(
        opened.warnings,
        vec![OpenWarning::MissingCompressed {
            path: base.with_extension("zdx")
        }]
    );
}

#[test]
fn test_compressed_linked_needs_data_file() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("eastons");

    let result = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base));

    assert!(matches!(result, Err(StoreError::MissingData { .. })));
}

#[test]
fn test_compressed_handles_are_read_only() {
    let temp = TempDir::new().unwrap();
    let base = setup_linked(temp.path(), true);

    let mut state = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base))
        .unwrap()
        .into_state();

    assert!(state.is_writable());
    assert_eq!(state.zdata_mut().unwrap().mode(), OpenMode::Read);
    assert!(state.zdata_mut().unwrap().write_at(0, b"x").is_err());
}

#[test]
fn test_block_cache_through_linked_state() {
    let temp = TempDir::new().unwrap();
    let base = setup_linked(temp.path(), true);

    let mut state = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base))
        .unwrap()
        .into_state();

    assert_eq!(state.last_block_number(), None);

    let block = state
        .cache_mut()
        .get_or_replace(5, || Ok::<_, StoreError>(b"block five".to_vec()))
        .unwrap();
    assert_eq!(block, Bytes::from_static(b"block five"));
    assert_eq!(state.last_block_number(), Some(5));

    // Same block again, the loader must not run
    let again = state
        .cache_mut()
        .get_or_replace(5, || -> Result<Vec<u8>, StoreError> {
            panic!("block 5 is cached")
        })
        .unwrap();
    assert_eq!(again, block);
}

#[test]
fn test_release_clears_linked_cache() {
    let temp = TempDir::new().unwrap();
    let base = setup_linked(temp.path(), true);

    let mut state = CompressedLinkedState::open(&ModuleMeta::new("Eastons", &base))
        .unwrap()
        .into_state();
    state.cache_mut().store(2, b"two".to_vec());

    state.release_resources();

    assert!(state.cache().is_empty());
    assert!(!state.has_compressed());
    assert!(state.linked().index().is_none());
    assert!(state.is_released());
}

// =============================================================================
// CompressedVerseState Tests
// =============================================================================

#[test]
fn test_compressed_verse_both_testaments() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "ot", 'c');
    write_verse_testament(temp.path(), "nt", 'c');

    let opened = CompressedVerseState::open(&ModuleMeta::new("ESV", temp.path())).unwrap();

    assert!(opened.warnings.is_empty());
    assert!(opened.state.has_testament(Testament::Old));
    assert!(opened.state.has_testament(Testament::New));
    assert!(!opened.state.is_writable());
}

#[test]
fn test_old_testament_only_module() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "ot", 'c');

    let opened = CompressedVerseState::open(&ModuleMeta::new("WLC", temp.path())).unwrap();
    let mut state = opened.state;

    assert!(state.has_testament(Testament::Old));
    assert!(!state.has_testament(Testament::New));
    assert!(state.payload_mut(Testament::New).is_none());
    assert!(matches!(
        &opened.warnings[..],
        [OpenWarning::MissingTestament { testament: Testament::New, .. }]
    ));
}

#[test]
fn test_no_testaments_still_opens() {
    let temp = TempDir::new().unwrap();

    let opened = CompressedVerseState::open(&ModuleMeta::new("Empty", temp.path())).unwrap();

    assert!(!opened.state.has_testament(Testament::Old));
    assert!(!opened.state.has_testament(Testament::New));
    assert_eq!(opened.warnings.len(), 2);
}

#[test]
fn test_block_type_selects_files() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "nt", 'b');

    // Default block type is chapter, which finds nothing here
    let chapter = CompressedVerseState::open(&ModuleMeta::new("Book", temp.path())).unwrap();
    assert!(!chapter.state.has_testament(Testament::New));

    let meta = ModuleMeta::new("Book", temp.path()).with_block_type(BlockType::Book);
    let book = CompressedVerseState::open(&meta).unwrap();
    assert!(book.state.has_testament(Testament::New));
    assert_eq!(
        book.state.files(Testament::New).payload,
        temp.path().join("nt.bzz")
    );
}

#[test]
fn test_missing_locator_leaves_testament_absent() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "ot", 'c');
    fs::remove_file(temp.path().join("ot.czv")).unwrap();

    let opened = CompressedVerseState::open(&ModuleMeta::new("ESV", temp.path())).unwrap();
    let mut state = opened.state;

    assert!(state.block_index_mut(Testament::Old).is_none());
    assert!(state.locator_mut(Testament::Old).is_none());
    assert!(opened
        .warnings
        .iter()
        .any(|w| matches!(w, OpenWarning::OpenFailed { .. })));
}

#[test]
fn test_verse_cache_is_keyed_by_testament() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "ot", 'c');
    write_verse_testament(temp.path(), "nt", 'c');

    let mut state = CompressedVerseState::open(&ModuleMeta::new("ESV", temp.path()))
        .unwrap()
        .into_state();

    state.cache_mut().store((Testament::Old, 0), b"genesis 1".to_vec());
    assert_eq!(state.last_testament(), Some(Testament::Old));
    assert_eq!(state.last_block_number(), Some(0));

    // Block 0 of the other testament is a different block
    assert!(state.cache().peek((Testament::New, 0)).is_none());
    let nt = state
        .cache_mut()
        .get_or_replace((Testament::New, 0), || {
            Ok::<_, StoreError>(b"matthew 1".to_vec())
        })
        .unwrap();

    assert_eq!(nt, Bytes::from_static(b"matthew 1"));
    assert_eq!(state.last_testament(), Some(Testament::New));
}

#[test]
fn test_release_clears_verse_cache() {
    let temp = TempDir::new().unwrap();
    write_verse_testament(temp.path(), "ot", 'c');

    let mut state = CompressedVerseState::open(&ModuleMeta::new("ESV", temp.path()))
        .unwrap()
        .into_state();
    state.cache_mut().store((Testament::Old, 3), b"block".to_vec());

    state.release_resources();

    assert!(state.cache().is_empty());
    assert_eq!(state.last_testament(), None);
    assert!(!state.has_testament(Testament::Old));
}
