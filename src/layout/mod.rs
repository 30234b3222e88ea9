//! Layout Module
//!
//! On-disk naming conventions for module files, and the cheap existence /
//! permission probes used before anything is opened.
//!
//! ## File Naming
//! ```text
//! verse, uncompressed     {dir}/ot        {dir}/ot.vss
//!                         {dir}/nt        {dir}/nt.vss
//!
//! verse, compressed       {dir}/ot.{b|c|v}zs   block index
//!                         {dir}/ot.{b|c|v}zv   verse locator
//!                         {dir}/ot.{b|c|v}zz   compressed payload
//!                         (same for nt)
//!
//! linked                  {base}.idx      {base}.dat
//!                         {dir}/incfile   (u32, little-endian)
//!
//! linked, compressed      {base}.zdx      {base}.zdt
//!
//! generic book            {base}.bdt
//! ```
//!
//! Every path is a pure function of its inputs; nothing here touches the disk
//! except the functions in `probe`.

mod paths;
mod probe;

use std::fmt;

pub use paths::{
    compressed_linked_files, compressed_verse_files, genbook_data_path, incfile_path,
    linked_files, raw_verse_files, CompressedLinkedFiles, CompressedVerseFiles, LinkedFiles,
    RawVerseFiles,
};
pub use probe::{can_read, can_write, exists};

/// File stem for Old Testament files
pub const FILE_OT: &str = "ot";
/// File stem for New Testament files
pub const FILE_NT: &str = "nt";
/// Extension of the uncompressed verse index
pub const EXTENSION_VSS: &str = ".vss";
/// Extension of the linked index
pub const EXTENSION_INDEX: &str = ".idx";
/// Extension of the linked data
pub const EXTENSION_DATA: &str = ".dat";
/// Extension of the compressed linked index
pub const EXTENSION_Z_INDEX: &str = ".zdx";
/// Extension of the compressed linked data
pub const EXTENSION_Z_DATA: &str = ".zdt";
/// Extension of a generic book's data file
pub const EXTENSION_BOOK_DATA: &str = ".bdt";
/// Name of the "next free record" counter file
pub const INCFILE: &str = "incfile";

/// Which half of a testament-split module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Testament {
    Old,
    New,
}

impl Testament {
    /// Both testaments, Old first
    pub const ALL: [Testament; 2] = [Testament::Old, Testament::New];

    /// File stem used on disk
    pub fn file_stem(self) -> &'static str {
        match self {
            Testament::Old => FILE_OT,
            Testament::New => FILE_NT,
        }
    }

    pub(crate) fn slot(self) -> usize {
        match self {
            Testament::Old => 0,
            Testament::New => 1,
        }
    }
}

impl fmt::Display for Testament {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Testament::Old => f.write_str("Old Testament"),
            Testament::New => f.write_str("New Testament"),
        }
    }
}

/// Granularity of the compressed blocks of a verse module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockType {
    Book,
    #[default]
    Chapter,
    Verse,
}

impl BlockType {
    /// One-letter indicator embedded in compressed file names
    pub fn indicator(self) -> char {
        match self {
            BlockType::Book => 'b',
            BlockType::Chapter => 'c',
            BlockType::Verse => 'v',
        }
    }

    /// Parse the `BlockType` config value ("BOOK", "CHAPTER", "VERSE")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "BOOK" => Some(BlockType::Book),
            "CHAPTER" => Some(BlockType::Chapter),
            "VERSE" => Some(BlockType::Verse),
            _ => None,
        }
    }
}
