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

//! Error types for the cache simulator
//!
//! All fallible operations in the crate return [`Result<T>`], an alias for
//! `Result<T, CacheError>`.
//!
//! The error taxonomy distinguishes three kinds of failure:
//!
//! - **Caller contract violations** ([`CacheError::MisalignedAddress`],
//!   [`CacheError::OutOfRange`], [`CacheError::PortBusy`]): rejected
//!   synchronously at request submission, before any controller state is
//!   touched. The controller stays in its idle state and will accept a
//!   corrected request.
//! - **Configuration errors** ([`CacheError::InvalidBlockSize`],
//!   [`CacheError::InvalidCapacity`], [`CacheError::InvalidAddressRange`]):
//!   detected once at construction. A component cannot be instantiated with
//!   an inconsistent configuration.
//! - **Internal consistency guards** ([`CacheError::InvalidBlockIndex`],
//!   [`CacheError::InvalidWordIndex`]): indicate a misconfiguration or a
//!   bug, never a normal runtime condition.

use thiserror::Error;

/// Errors that can occur during cache simulation
#[derive(Error, Debug)]
pub enum CacheError {
    /// Address is not a multiple of the word size
    #[error("Misaligned address: 0x{address:08X} (must be 4-byte aligned)")]
    MisalignedAddress {
        /// The offending address
        address: u32,
    },

    /// Address falls outside the configured coverage of the cache
    #[error("Address out of range: 0x{address:08X} (covered range is 0x{min:08X}-0x{max:08X})")]
    OutOfRange {
        /// The offending address
        address: u32,
        /// First covered word address (inclusive)
        min: u32,
        /// Last covered word address (inclusive)
        max: u32,
    },

    /// Block size is not a power of two of at least one word
    #[error("Invalid block size: {block_size} bytes (must be a power of two, at least 4)")]
    InvalidBlockSize {
        /// The configured block size in bytes
        block_size: u32,
    },

    /// Capacity does not divide evenly into blocks
    #[error("Invalid capacity: {capacity} bytes is not a non-zero multiple of the {block_size}-byte block size")]
    InvalidCapacity {
        /// The configured capacity in bytes
        capacity: u32,
        /// The configured block size in bytes
        block_size: u32,
    },

    /// Covered address range cannot be divided evenly among the blocks
    #[error("Invalid address range: 0x{min_addr:08X}-0x{max_addr:08X} does not divide evenly among the configured blocks")]
    InvalidAddressRange {
        /// First covered word address (inclusive)
        min_addr: u32,
        /// Last covered word address (inclusive)
        max_addr: u32,
    },

    /// A computed block index exceeded the number of blocks
    #[error("Block index {index} out of range (cache has {count} blocks)")]
    InvalidBlockIndex {
        /// The offending block index
        index: usize,
        /// Number of blocks in the cache
        count: usize,
    },

    /// A computed word index exceeded the words in a block
    #[error("Word index {index} out of range (block holds {count} words)")]
    InvalidWordIndex {
        /// The offending word index
        index: usize,
        /// Number of words in a block
        count: usize,
    },

    /// A request was submitted while another is still in flight
    #[error("Processor port busy: a request is already in flight or the idle cycle has not elapsed")]
    PortBusy,

    /// A snapshot was requested while a transaction is in flight
    #[error("Cannot snapshot while the controller is mid-transaction")]
    SnapshotWhileBusy,

    /// Snapshot contents do not match the configuration they claim
    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// Access trace line could not be parsed
    #[error("Trace parse error on line {line}: {message}")]
    TraceParse {
        /// 1-based line number of the offending line
        line: usize,
        /// Description of the problem
        message: String,
    },

    /// Configuration file could not be found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Snapshot serialization failed
    #[error("Snapshot encode error: {0}")]
    SnapshotEncode(#[from] bincode::error::EncodeError),

    /// Snapshot deserialization failed
    #[error("Snapshot decode error: {0}")]
    SnapshotDecode(#[from] bincode::error::DecodeError),

    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_misaligned() {
        let err = CacheError::MisalignedAddress { address: 0x13 };
        assert_eq!(
            err.to_string(),
            "Misaligned address: 0x00000013 (must be 4-byte aligned)"
        );
    }

    #[test]
    fn test_error_display_out_of_range() {
        let err = CacheError::OutOfRange {
            address: 0x100,
            min: 0x0,
            max: 0x7C,
        };
        assert!(err.to_string().contains("0x00000100"));
        assert!(err.to_string().contains("0x0000007C"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: CacheError = io.into();
        assert!(matches!(err, CacheError::Io(_)));
    }
}
