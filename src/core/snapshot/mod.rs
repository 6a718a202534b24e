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

//! Save states for the simulator
//!
//! A [`Snapshot`] captures everything needed to resume a simulation: the
//! configuration, the block store contents, the backing-store words, the
//! statistics, and the cycle counter, together with creation metadata.
//! Snapshots are only taken between transactions (the controller must be
//! idle); capturing half a handshake would not be restorable.
//!
//! The wire format is bincode over serde. Block state is stored with plain
//! booleans so the on-disk format is independent of the controller's
//! internal flag representation.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cache::CacheStats;
use crate::core::config::SimConfig;
use crate::core::error::Result;

/// Provenance of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    /// When the snapshot was taken
    pub created_at: DateTime<Utc>,
    /// Version of the simulator that wrote it
    pub simulator_version: String,
}

impl SnapshotMetadata {
    /// Stamp a fresh metadata record
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
            simulator_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Serialized state of one cache block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockState {
    /// Stored words
    pub words: Vec<i32>,
    /// Original address of each stored word
    pub tags: Vec<u32>,
    /// Slot holds no live data
    pub available: bool,
    /// Slot holds unflushed writes
    pub dirty: bool,
}

/// Complete save state of a simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Creation metadata
    pub metadata: SnapshotMetadata,
    /// Configuration the simulation was built with
    pub config: SimConfig,
    /// Cache block contents, in block order
    pub blocks: Vec<BlockState>,
    /// Backing-store words, in address order
    pub memory_words: Vec<i32>,
    /// Counters at capture time
    pub stats: CacheStats,
    /// Clock ticks elapsed at capture time
    pub cycles: u64,
}

impl Snapshot {
    /// Serialize to the bincode wire format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }

    /// Deserialize from the bincode wire format
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (snapshot, _) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(snapshot)
    }

    /// Write the snapshot to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read a snapshot back from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
