//! Single-slot cache for the last decompressed block
//!
//! Sequential reads usually land in the same compressed block, so the state
//! keeps the most recent one. The slot never decompresses anything itself:
//! the reader supplies the bytes, and the key check happens inside
//! `get_or_replace` so a stale block cannot be handed out for another key.

use bytes::Bytes;

/// One cached block, keyed by `K`
///
/// Linked modules key by block number. Verse modules key by
/// `(Testament, block)` because each testament numbers its blocks from zero.
#[derive(Debug, Clone)]
pub struct BlockCache<K> {
    key: Option<K>,
    bytes: Bytes,
}

impl<K: Copy + Eq> BlockCache<K> {
    pub fn new() -> Self {
        Self {
            key: None,
            bytes: Bytes::new(),
        }
    }

    /// Return the cached bytes for `key`, or run `load` and cache its result
    ///
    /// On a loader error the previous slot is left untouched.
    pub fn get_or_replace<B, E, F>(&mut self, key: K, load: F) -> Result<Bytes, E>
    where
        B: Into<Bytes>,
        F: FnOnce() -> Result<B, E>,
    {
        if self.key == Some(key) {
            return Ok(self.bytes.clone());
        }

        let bytes = load()?.into();
        self.key = Some(key);
        self.bytes = bytes.clone();
        Ok(bytes)
    }

    /// Cached bytes, only if they belong to `key`
    pub fn peek(&self, key: K) -> Option<&Bytes> {
        (self.key == Some(key)).then_some(&self.bytes)
    }

    /// Overwrite the slot
    pub fn store(&mut self, key: K, bytes: impl Into<Bytes>) {
        self.key = Some(key);
        self.bytes = bytes.into();
    }

    /// Key of the cached block; `None` when empty
    pub fn last_key(&self) -> Option<K> {
        self.key
    }

    pub fn last_bytes(&self) -> Option<&Bytes> {
        self.key.map(|_| &self.bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none()
    }

    /// Back to the empty sentinel
    pub fn clear(&mut self) {
        self.key = None;
        self.bytes = Bytes::new();
    }
}

impl<K: Copy + Eq> Default for BlockCache<K> {
    fn default() -> Self {
        Self::new()
    }
}
