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

//! Address decomposition for the direct-mapped cache
//!
//! [`CacheLayout`] captures the construction-time geometry of a cache
//! instance and provides the pure address arithmetic the controller relies
//! on: mapping a byte address to a block slot and a word within that block,
//! rounding an address down to the start of its containing block, and
//! recomposing a word address from a block base and a word index.
//!
//! # Address format
//!
//! ```text
//! byte address (32 bits, relative to min_addr):
//! [..:5]  coverage chunk - selects the block slot
//! [4:2]   word offset    - selects the word within a block (32-byte blocks)
//! [1:0]   byte offset    - always 00 for word-aligned accesses
//! ```
//!
//! The covered range `[min_addr, max_addr]` is divided into `num_blocks`
//! contiguous coverage chunks, one per block slot. When the covered range is
//! larger than the capacity, several block-sized lines inside one chunk
//! alias onto the same slot; the per-word tags in the block store
//! disambiguate them.

use crate::core::error::{CacheError, Result};

/// Size of one word in bytes, the unit of transfer and storage
pub const WORD_SIZE: u32 = 4;

/// Construction-time geometry of a cache instance
///
/// All parameters are validated once in [`CacheLayout::new`]; an instance
/// that exists is internally consistent.
///
/// # Example
///
/// ```
/// use cachex::core::cache::CacheLayout;
///
/// // 128 bytes in 32-byte blocks covering the first 128 bytes of memory
/// let layout = CacheLayout::new(128, 32, 0x00000000, 0x0000007C).unwrap();
/// assert_eq!(layout.num_blocks(), 4);
/// assert_eq!(layout.locate(0x00000024).unwrap(), (1, 1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheLayout {
    /// Total cache capacity in bytes
    capacity_bytes: u32,

    /// Size of one block in bytes
    block_size_bytes: u32,

    /// First covered word address (inclusive)
    min_addr: u32,

    /// Last covered word address (inclusive)
    max_addr: u32,

    /// Number of block slots (`capacity / block_size`)
    num_blocks: usize,

    /// Number of words in one block (`block_size / WORD_SIZE`)
    words_per_block: usize,

    /// Bytes of the covered range owned by each block slot
    coverage_bytes: u64,
}

impl CacheLayout {
    /// Validate a configuration and derive the cache geometry
    ///
    /// # Arguments
    ///
    /// * `capacity_bytes` - total cache capacity, a non-zero multiple of the block size
    /// * `block_size_bytes` - block size, a power of two of at least one word
    /// * `min_addr` - first covered word address, aligned to the block size
    /// * `max_addr` - last covered word address (inclusive), word-aligned
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the capacity does not divide evenly
    /// into blocks and words, or if the covered range does not divide evenly
    /// among the blocks. These are fatal: the cache cannot be instantiated
    /// in an inconsistent configuration.
    pub fn new(
        capacity_bytes: u32,
        block_size_bytes: u32,
        min_addr: u32,
        max_addr: u32,
    ) -> Result<Self> {
        if block_size_bytes < WORD_SIZE || !block_size_bytes.is_power_of_two() {
            return Err(CacheError::InvalidBlockSize {
                block_size: block_size_bytes,
            });
        }
        if capacity_bytes == 0 || !capacity_bytes.is_multiple_of(block_size_bytes) {
            return Err(CacheError::InvalidCapacity {
                capacity: capacity_bytes,
                block_size: block_size_bytes,
            });
        }
        if max_addr < min_addr
            || !min_addr.is_multiple_of(block_size_bytes)
            || !max_addr.is_multiple_of(WORD_SIZE)
        {
            return Err(CacheError::InvalidAddressRange { min_addr, max_addr });
        }

        // Inclusive range, so the size is one word past the distance.
        let range_bytes = (max_addr - min_addr) as u64 + WORD_SIZE as u64;
        if !range_bytes.is_multiple_of(capacity_bytes as u64) {
            return Err(CacheError::InvalidAddressRange { min_addr, max_addr });
        }

        let num_blocks = (capacity_bytes / block_size_bytes) as usize;
        let words_per_block = (block_size_bytes / WORD_SIZE) as usize;
        let coverage_bytes = range_bytes / num_blocks as u64;

        Ok(Self {
            capacity_bytes,
            block_size_bytes,
            min_addr,
            max_addr,
            num_blocks,
            words_per_block,
            coverage_bytes,
        })
    }

    /// Total cache capacity in bytes
    pub fn capacity_bytes(&self) -> u32 {
        self.capacity_bytes
    }

    /// Size of one block in bytes
    pub fn block_size_bytes(&self) -> u32 {
        self.block_size_bytes
    }

    /// First covered word address (inclusive)
    pub fn min_addr(&self) -> u32 {
        self.min_addr
    }

    /// Last covered word address (inclusive)
    pub fn max_addr(&self) -> u32 {
        self.max_addr
    }

    /// Number of block slots
    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    /// Number of words in one block
    pub fn words_per_block(&self) -> usize {
        self.words_per_block
    }

    /// Bytes of the covered range owned by each block slot
    pub fn coverage_bytes(&self) -> u64 {
        self.coverage_bytes
    }

    /// Check that an address is word-aligned
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MisalignedAddress`] otherwise. Alignment
    /// violations are caller bugs, reported at request acceptance, never
    /// silently truncated.
    pub fn check_aligned(&self, addr: u32) -> Result<()> {
        if addr & (WORD_SIZE - 1) != 0 {
            return Err(CacheError::MisalignedAddress { address: addr });
        }
        Ok(())
    }

    /// Check that an address falls inside the covered range
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::OutOfRange`] otherwise.
    pub fn check_in_range(&self, addr: u32) -> Result<()> {
        if addr < self.min_addr || addr > self.max_addr {
            return Err(CacheError::OutOfRange {
                address: addr,
                min: self.min_addr,
                max: self.max_addr,
            });
        }
        Ok(())
    }

    /// Map an address to its block slot and word-within-block indices
    ///
    /// The block index comes from the coverage chunk the address falls in;
    /// the word index from the bits that address a word within a block.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::OutOfRange`] for addresses outside the covered
    /// range. An index past the end of the geometry indicates a
    /// misconfiguration, not a normal runtime condition, and is reported as
    /// [`CacheError::InvalidBlockIndex`] / [`CacheError::InvalidWordIndex`].
    pub fn locate(&self, addr: u32) -> Result<(usize, usize)> {
        self.check_in_range(addr)?;

        let block_index = ((addr - self.min_addr) as u64 / self.coverage_bytes) as usize;
        if block_index >= self.num_blocks {
            return Err(CacheError::InvalidBlockIndex {
                index: block_index,
                count: self.num_blocks,
            });
        }

        let word_index = ((addr & (self.block_size_bytes - 1)) / WORD_SIZE) as usize;
        if word_index >= self.words_per_block {
            return Err(CacheError::InvalidWordIndex {
                index: word_index,
                count: self.words_per_block,
            });
        }

        Ok((block_index, word_index))
    }

    /// Round an address down to the start of its containing block
    #[inline(always)]
    pub fn block_base_address(&self, addr: u32) -> u32 {
        addr & !(self.block_size_bytes - 1)
    }

    /// Recompose a word address from a block base and a word index
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::InvalidWordIndex`] for an index past the end of
    /// the block, and [`CacheError::OutOfRange`] if the resulting address
    /// falls outside the covered range.
    pub fn word_address_in_block(&self, block_base: u32, word_index: usize) -> Result<u32> {
        if word_index >= self.words_per_block {
            return Err(CacheError::InvalidWordIndex {
                index: word_index,
                count: self.words_per_block,
            });
        }
        let addr = block_base
            .checked_add(word_index as u32 * WORD_SIZE)
            .ok_or(CacheError::OutOfRange {
                address: block_base,
                min: self.min_addr,
                max: self.max_addr,
            })?;
        self.check_in_range(addr)?;
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_layout() -> CacheLayout {
        // 4 blocks x 8 words, covering exactly the capacity
        CacheLayout::new(128, 32, 0x00000000, 0x0000007C).unwrap()
    }

    fn aliased_layout() -> CacheLayout {
        // Covered range twice the capacity: two lines alias per slot
        CacheLayout::new(128, 32, 0x00000000, 0x000000FC).unwrap()
    }

    #[test]
    fn test_geometry_derivation() {
        let layout = small_layout();
        assert_eq!(layout.num_blocks(), 4);
        assert_eq!(layout.words_per_block(), 8);
        assert_eq!(layout.coverage_bytes(), 32);
    }

    #[test]
    fn test_locate_basic() {
        let layout = small_layout();
        assert_eq!(layout.locate(0x00000000).unwrap(), (0, 0));
        assert_eq!(layout.locate(0x00000004).unwrap(), (0, 1));
        assert_eq!(layout.locate(0x00000008).unwrap(), (0, 2));
        assert_eq!(layout.locate(0x00000020).unwrap(), (1, 0));
        assert_eq!(layout.locate(0x0000007C).unwrap(), (3, 7));
    }

    #[test]
    fn test_locate_with_aliasing() {
        let layout = aliased_layout();
        assert_eq!(layout.coverage_bytes(), 64);

        // Two different lines land in block 0
        assert_eq!(layout.locate(0x00000000).unwrap(), (0, 0));
        assert_eq!(layout.locate(0x00000020).unwrap(), (0, 0));
        assert_eq!(layout.locate(0x00000024).unwrap(), (0, 1));

        // The next chunk belongs to block 1
        assert_eq!(layout.locate(0x00000040).unwrap(), (1, 0));
    }

    #[test]
    fn test_locate_nonzero_min_addr() {
        let layout = CacheLayout::new(128, 32, 0x00001000, 0x0000107C).unwrap();
        assert_eq!(layout.locate(0x00001000).unwrap(), (0, 0));
        assert_eq!(layout.locate(0x00001024).unwrap(), (1, 1));
        assert!(matches!(
            layout.locate(0x00000FFC),
            Err(CacheError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_locate_out_of_range() {
        let layout = small_layout();
        assert!(matches!(
            layout.locate(0x00000080),
            Err(CacheError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_block_base_address() {
        let layout = small_layout();
        assert_eq!(layout.block_base_address(0x00000000), 0x00000000);
        assert_eq!(layout.block_base_address(0x0000001C), 0x00000000);
        assert_eq!(layout.block_base_address(0x00000024), 0x00000020);
    }

    #[test]
    fn test_word_address_in_block() {
        let layout = small_layout();
        assert_eq!(layout.word_address_in_block(0x00000020, 0).unwrap(), 0x20);
        assert_eq!(layout.word_address_in_block(0x00000020, 7).unwrap(), 0x3C);
        assert!(matches!(
            layout.word_address_in_block(0x00000020, 8),
            Err(CacheError::InvalidWordIndex { .. })
        ));
        assert!(matches!(
            layout.word_address_in_block(0x00000060, 8),
            Err(CacheError::InvalidWordIndex { .. })
        ));
    }

    #[test]
    fn test_word_address_out_of_range() {
        // Base of the last block plus a large index would leave the range
        let layout = CacheLayout::new(64, 32, 0x00000000, 0x0000003C).unwrap();
        assert!(matches!(
            layout.word_address_in_block(0x00000040, 0),
            Err(CacheError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_alignment_check() {
        let layout = small_layout();
        assert!(layout.check_aligned(0x00000010).is_ok());
        assert!(matches!(
            layout.check_aligned(0x00000012),
            Err(CacheError::MisalignedAddress { address: 0x12 })
        ));
    }

    #[test]
    fn test_rejects_block_size_not_power_of_two() {
        assert!(matches!(
            CacheLayout::new(120, 24, 0x0, 0x74),
            Err(CacheError::InvalidBlockSize { block_size: 24 })
        ));
    }

    #[test]
    fn test_rejects_block_size_below_word() {
        assert!(matches!(
            CacheLayout::new(128, 2, 0x0, 0x7C),
            Err(CacheError::InvalidBlockSize { .. })
        ));
    }

    #[test]
    fn test_rejects_capacity_not_block_multiple() {
        assert!(matches!(
            CacheLayout::new(100, 32, 0x0, 0x7C),
            Err(CacheError::InvalidCapacity { .. })
        ));
        assert!(matches!(
            CacheLayout::new(0, 32, 0x0, 0x7C),
            Err(CacheError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn test_rejects_range_not_capacity_multiple() {
        // 160-byte range over a 128-byte cache does not divide evenly
        assert!(matches!(
            CacheLayout::new(128, 32, 0x0, 0x9C),
            Err(CacheError::InvalidAddressRange { .. })
        ));
    }

    #[test]
    fn test_rejects_inverted_range() {
        assert!(matches!(
            CacheLayout::new(128, 32, 0x80, 0x7C),
            Err(CacheError::InvalidAddressRange { .. })
        ));
    }

    #[test]
    fn test_rejects_unaligned_min_addr() {
        assert!(matches!(
            CacheLayout::new(128, 32, 0x10, 0x8C),
            Err(CacheError::InvalidAddressRange { .. })
        ));
    }

    #[test]
    fn test_full_address_space_range() {
        // Range size arithmetic must not overflow at the top of the space
        let layout = CacheLayout::new(0x1000, 32, 0x00000000, 0xFFFFFFFC).unwrap();
        assert_eq!(layout.coverage_bytes(), 0x1_0000_0000u64 / 128);
        assert_eq!(layout.locate(0xFFFFFFFC).unwrap().0, 127);
    }
}
