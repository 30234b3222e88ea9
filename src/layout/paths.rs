//! Path derivation for each module layout

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{
    BlockType, Testament, EXTENSION_BOOK_DATA, EXTENSION_DATA, EXTENSION_INDEX, EXTENSION_VSS,
    EXTENSION_Z_DATA, EXTENSION_Z_INDEX, INCFILE,
};

// Compressed verse file names: {stem}.{indicator}z{role}
const SUFFIX_PART1: char = 'z';
const SUFFIX_BLOCK_INDEX: char = 's';
const SUFFIX_LOCATOR: char = 'v';
const SUFFIX_PAYLOAD: char = 'z';

/// Index + text pair of one testament of an uncompressed verse module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawVerseFiles {
    pub index: PathBuf,
    pub text: PathBuf,
}

/// Index + data pair of a linked (dictionary) module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedFiles {
    pub index: PathBuf,
    pub data: PathBuf,
}

/// Compressed index + data pair of a compressed linked module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedLinkedFiles {
    pub index: PathBuf,
    pub data: PathBuf,
}

/// The three files of one testament of a compressed verse module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedVerseFiles {
    /// Start/size of every compressed block
    pub block_index: PathBuf,
    /// Block number, offset and size of every verse
    pub locator: PathBuf,
    /// The compressed blocks themselves
    pub payload: PathBuf,
}

/// `dir/ot` + `dir/ot.vss` (or `nt`)
pub fn raw_verse_files(dir: &Path, testament: Testament) -> RawVerseFiles {
    let text = dir.join(testament.file_stem());
    let index = append(&text, EXTENSION_VSS);
    RawVerseFiles { index, text }
}

/// `base.idx` + `base.dat`
pub fn linked_files(base: &Path) -> LinkedFiles {
    LinkedFiles {
        index: append(base, EXTENSION_INDEX),
        data: append(base, EXTENSION_DATA),
    }
}

/// `incfile` next to the linked files
pub fn incfile_path(base: &Path) -> PathBuf {
    base.with_file_name(INCFILE)
}

/// `base.zdx` + `base.zdt`
pub fn compressed_linked_files(base: &Path) -> CompressedLinkedFiles {
    CompressedLinkedFiles {
        index: append(base, EXTENSION_Z_INDEX),
        data: append(base, EXTENSION_Z_DATA),
    }
}

/// `dir/ot.bzs`, `dir/ot.bzv`, `dir/ot.bzz` for `BlockType::Book`, and so on
pub fn compressed_verse_files(
    dir: &Path,
    testament: Testament,
    block_type: BlockType,
) -> CompressedVerseFiles {
    let all_but_last = format!(
        "{}.{}{}",
        testament.file_stem(),
        block_type.indicator(),
        SUFFIX_PART1
    );
    let with_role = |role: char| dir.join(format!("{all_but_last}{role}"));

    CompressedVerseFiles {
        block_index: with_role(SUFFIX_BLOCK_INDEX),
        locator: with_role(SUFFIX_LOCATOR),
        payload: with_role(SUFFIX_PAYLOAD),
    }
}

/// `base.bdt`
pub fn genbook_data_path(base: &Path) -> PathBuf {
    append(base, EXTENSION_BOOK_DATA)
}

/// Append a literal suffix without treating it as an extension swap
fn append(base: &Path, suffix: &str) -> PathBuf {
    let mut raw: OsString = base.as_os_str().to_owned();
    raw.push(suffix);
    PathBuf::from(raw)
}
