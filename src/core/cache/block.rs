// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Block storage for the cache controller
//!
//! A [`Block`] is a fixed-size group of consecutive words together with a
//! tag per word and a small flag register. The tag records the original
//! address each stored word was fetched or written under; hit detection
//! compares the full request address against the per-word tag rather than
//! one tag per block, because no-write-allocate means block contents can be
//! partially stale relative to a single shared tag.
//!
//! The [`BlockStore`] is exclusively owned and mutated by the controller;
//! no other component reads or writes it directly.

use bitflags::bitflags;

use crate::core::error::{CacheError, Result};

bitflags! {
    /// Per-block state register
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BlockFlags: u8 {
        /// Slot holds no live data (reset state)
        const AVAILABLE = 1 << 0;
        /// At least one word was written since the block was filled and has
        /// not yet been flushed to the backing store
        const DIRTY = 1 << 1;
    }
}

/// One cache block: words, per-word tags, and state flags
///
/// Invariants:
/// - `tags[i]` is only meaningful while the block is not AVAILABLE
/// - DIRTY implies not AVAILABLE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    words: Vec<i32>,
    tags: Vec<u32>,
    flags: BlockFlags,
}

impl Block {
    fn new(words_per_block: usize) -> Self {
        Self {
            words: vec![0; words_per_block],
            tags: vec![0; words_per_block],
            flags: BlockFlags::AVAILABLE,
        }
    }

    /// True while the slot holds no live data
    pub fn is_available(&self) -> bool {
        self.flags.contains(BlockFlags::AVAILABLE)
    }

    /// True while the block holds writes not yet flushed to the backing store
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(BlockFlags::DIRTY)
    }

    /// Stored words
    pub fn words(&self) -> &[i32] {
        &self.words
    }

    /// Original address of each stored word
    pub fn tags(&self) -> &[u32] {
        &self.tags
    }
}

/// Snapshot of one word slot as seen by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordView {
    /// Original address the word was stored under
    pub tag: u32,
    /// Stored data
    pub data: i32,
    /// Availability of the containing block
    pub available: bool,
    /// Dirtiness of the containing block
    pub dirty: bool,
}

/// The fixed array of blocks owned by one cache controller
///
/// State is initialized once (every block AVAILABLE, nothing DIRTY) and
/// persists for the component's lifetime; no allocation occurs after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockStore {
    blocks: Vec<Block>,
    words_per_block: usize,
}

impl BlockStore {
    /// Allocate `num_blocks` empty blocks of `words_per_block` words each
    pub fn new(num_blocks: usize, words_per_block: usize) -> Self {
        Self {
            blocks: vec![Block::new(words_per_block); num_blocks],
            words_per_block,
        }
    }

    /// Number of blocks in the store
    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Number of words in each block
    pub fn words_per_block(&self) -> usize {
        self.words_per_block
    }

    /// Borrow a block by index
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidBlockIndex`] for an index past the end
    /// of the store.
    pub fn block(&self, block_index: usize) -> Result<&Block> {
        self.blocks
            .get(block_index)
            .ok_or(CacheError::InvalidBlockIndex {
                index: block_index,
                count: self.blocks.len(),
            })
    }

    fn block_mut(&mut self, block_index: usize) -> Result<&mut Block> {
        let count = self.blocks.len();
        self.blocks
            .get_mut(block_index)
            .ok_or(CacheError::InvalidBlockIndex {
                index: block_index,
                count,
            })
    }

    /// Read one word slot: tag, data, and the containing block's flags
    ///
    /// # Errors
    ///
    /// Returns an index error for out-of-bounds block or word indices.
    pub fn word(&self, block_index: usize, word_index: usize) -> Result<WordView> {
        let block = self.block(block_index)?;
        if word_index >= self.words_per_block {
            return Err(CacheError::InvalidWordIndex {
                index: word_index,
                count: self.words_per_block,
            });
        }
        Ok(WordView {
            tag: block.tags[word_index],
            data: block.words[word_index],
            available: block.is_available(),
            dirty: block.is_dirty(),
        })
    }

    /// Store one word under its original address
    ///
    /// Writing into a previously AVAILABLE block claims it (clears
    /// AVAILABLE). The DIRTY flag is assigned from `set_dirty`: hit updates
    /// pass `true`, fill updates from the backing store pass `false`.
    ///
    /// # Errors
    ///
    /// Returns an index error for out-of-bounds block or word indices.
    pub fn write_word(
        &mut self,
        block_index: usize,
        word_index: usize,
        addr: u32,
        data: i32,
        set_dirty: bool,
    ) -> Result<()> {
        let words_per_block = self.words_per_block;
        let block = self.block_mut(block_index)?;
        if word_index >= words_per_block {
            return Err(CacheError::InvalidWordIndex {
                index: word_index,
                count: words_per_block,
            });
        }
        block.words[word_index] = data;
        block.tags[word_index] = addr;
        block.flags.remove(BlockFlags::AVAILABLE);
        block.flags.set(BlockFlags::DIRTY, set_dirty);
        Ok(())
    }

    /// Clear the DIRTY flag after a completed eviction
    ///
    /// The block keeps its (now stale) contents until the following fill
    /// overwrites them.
    pub fn mark_clean(&mut self, block_index: usize) -> Result<()> {
        self.block_mut(block_index)?
            .flags
            .remove(BlockFlags::DIRTY);
        Ok(())
    }

    /// Overwrite one block wholesale (snapshot restore)
    ///
    /// # Errors
    ///
    /// Rejects mismatched word counts and flag combinations that violate
    /// the block invariants (a DIRTY block cannot be AVAILABLE).
    pub fn set_block(
        &mut self,
        block_index: usize,
        words: &[i32],
        tags: &[u32],
        available: bool,
        dirty: bool,
    ) -> Result<()> {
        if words.len() != self.words_per_block || tags.len() != self.words_per_block {
            return Err(CacheError::CorruptSnapshot(format!(
                "block {} carries {} words / {} tags, expected {}",
                block_index,
                words.len(),
                tags.len(),
                self.words_per_block
            )));
        }
        if available && dirty {
            return Err(CacheError::CorruptSnapshot(format!(
                "block {} is both available and dirty",
                block_index
            )));
        }
        let block = self.block_mut(block_index)?;
        block.words.copy_from_slice(words);
        block.tags.copy_from_slice(tags);
        block.flags.set(BlockFlags::AVAILABLE, available);
        block.flags.set(BlockFlags::DIRTY, dirty);
        Ok(())
    }

    /// Return every block to the reset state
    pub fn reset(&mut self) {
        for block in &mut self.blocks {
            block.words.fill(0);
            block.tags.fill(0);
            block.flags = BlockFlags::AVAILABLE;
        }
    }
}
