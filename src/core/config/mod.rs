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

//! Simulation configuration
//!
//! Configuration is supplied at construction time and is not runtime
//! mutable. It can be loaded from a TOML file:
//!
//! ```toml
//! [cache]
//! capacity_bytes = 128
//! block_size_bytes = 32
//! min_addr = 0x00000000
//! max_addr = 0x0000007C
//!
//! [memory]
//! latency_cycles = 4
//! ```
//!
//! Values are validated when the components are constructed, not here; an
//! inconsistent geometry surfaces as a configuration error from
//! [`CacheLayout::new`](crate::core::cache::CacheLayout::new).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{CacheError, Result};

/// Cache geometry as supplied by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Total cache capacity in bytes
    pub capacity_bytes: u32,
    /// Size of one block in bytes
    pub block_size_bytes: u32,
    /// First covered word address (inclusive)
    pub min_addr: u32,
    /// Last covered word address (inclusive)
    pub max_addr: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // 4KB cache over a 16KB range: four lines alias per slot
        Self {
            capacity_bytes: 4096,
            block_size_bytes: 32,
            min_addr: 0x00000000,
            max_addr: 0x00003FFC,
        }
    }
}

/// Backing-store timing as supplied by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Cycles between accepting a word transfer and pulsing ready
    pub latency_cycles: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self { latency_cycles: 4 }
    }
}

/// Complete simulation configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Cache geometry
    pub cache: CacheConfig,
    /// Backing-store timing
    pub memory: MemoryConfig,
}

impl SimConfig {
    /// Parse a configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConfigParse`] for malformed TOML.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConfigNotFound`] if the file cannot be read
    /// and [`CacheError::ConfigParse`] if it cannot be parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|_| CacheError::ConfigNotFound(path.display().to_string()))?;
        Self::from_toml_str(&text)
    }
}
