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

//! System integration: controller, backing store, and the shared clock
//!
//! [`System`] wires a [`CacheController`] to a [`MemoryDevice`] and owns the
//! clock. One [`System::step`] is one full clock period:
//!
//! 1. `cache.drive()` - the controller acts on inputs it sampled last cycle
//! 2. `memory.drive()` - the memory model does the same, possibly pulsing
//!    `ready`
//! 3. `cache.sample()` - the controller latches both ports, including a
//!    `ready` pulsed this very cycle
//! 4. `memory.sample()` - the memory latches the access lines and pulls its
//!    `ready` low again
//!
//! The cache must sample before the memory does, or a one-cycle `ready`
//! pulse would be pulled low before anyone saw it. Neither component ever
//! acts on a line in the cycle it was asserted.
//!
//! The system also plays the processor's role on the processor port:
//! [`System::read_word`] and [`System::write_word`] submit a request, hold
//! the lines stable until the response arrives, release the request line,
//! and insert the idle cycle the port contract demands before the next
//! transaction.
//!
//! # Example
//!
//! ```
//! use cachex::core::config::SimConfig;
//! use cachex::core::system::System;
//!
//! let mut system = System::new(&SimConfig::default()).unwrap();
//! system.write_word(0x00000010, 7).unwrap();
//! let response = system.read_word(0x00000010).unwrap();
//! assert_eq!(response.data, Some(7));
//! ```

use crate::core::cache::{CacheController, CacheRequest, CacheResponse, CacheStats};
use crate::core::config::{CacheConfig, MemoryConfig, SimConfig};
use crate::core::error::{CacheError, Result};
use crate::core::memory::{FixedLatencyMemory, MemoryDevice};
use crate::core::snapshot::{BlockState, Snapshot, SnapshotMetadata};

/// A cache controller and its backing store under one clock
pub struct System<M: MemoryDevice = FixedLatencyMemory> {
    cache: CacheController,
    memory: M,
    cycles: u64,
}

impl System<FixedLatencyMemory> {
    /// Build a system from a configuration
    ///
    /// The backing store covers exactly the range the cache is configured
    /// for.
    ///
    /// # Errors
    ///
    /// Propagates configuration errors from the controller and the memory
    /// model.
    pub fn new(config: &SimConfig) -> Result<Self> {
        let cache = CacheController::new(&config.cache)?;
        let memory = FixedLatencyMemory::new(
            config.cache.min_addr,
            config.cache.max_addr,
            config.memory.latency_cycles,
        )?;
        log::debug!(
            "system: {} blocks x {} words, memory latency {} cycles",
            cache.layout().num_blocks(),
            cache.layout().words_per_block(),
            config.memory.latency_cycles
        );
        Ok(Self {
            cache,
            memory,
            cycles: 0,
        })
    }

    /// Capture a save state
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::SnapshotWhileBusy`] unless the controller is
    /// idle; half a handshake would not be restorable.
    pub fn snapshot(&self) -> Result<Snapshot> {
        if !self.cache.is_idle() {
            return Err(CacheError::SnapshotWhileBusy);
        }
        let layout = self.cache.layout();
        let config = SimConfig {
            cache: CacheConfig {
                capacity_bytes: layout.capacity_bytes(),
                block_size_bytes: layout.block_size_bytes(),
                min_addr: layout.min_addr(),
                max_addr: layout.max_addr(),
            },
            memory: MemoryConfig {
                latency_cycles: self.memory.latency(),
            },
        };

        let store = self.cache.store();
        let mut blocks = Vec::with_capacity(store.num_blocks());
        for index in 0..store.num_blocks() {
            let block = store.block(index)?;
            blocks.push(BlockState {
                words: block.words().to_vec(),
                tags: block.tags().to_vec(),
                available: block.is_available(),
                dirty: block.is_dirty(),
            });
        }

        Ok(Snapshot {
            metadata: SnapshotMetadata::now(),
            config,
            blocks,
            memory_words: self.memory.words().to_vec(),
            stats: *self.cache.stats(),
            cycles: self.cycles,
        })
    }

    /// Rebuild a system from a save state
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::CorruptSnapshot`] when the snapshot contents
    /// do not match the configuration they claim.
    pub fn from_snapshot(snapshot: &Snapshot) -> Result<Self> {
        let mut system = Self::new(&snapshot.config)?;
        let num_blocks = system.cache.store().num_blocks();
        if snapshot.blocks.len() != num_blocks {
            return Err(CacheError::CorruptSnapshot(format!(
                "snapshot holds {} blocks, configuration expects {}",
                snapshot.blocks.len(),
                num_blocks
            )));
        }
        for (index, block) in snapshot.blocks.iter().enumerate() {
            system.cache.store_mut().set_block(
                index,
                &block.words,
                &block.tags,
                block.available,
                block.dirty,
            )?;
        }
        system.memory.load_words(&snapshot.memory_words)?;
        system.cache.set_stats(snapshot.stats);
        system.cycles = snapshot.cycles;
        Ok(system)
    }
}

impl<M: MemoryDevice> System<M> {
    /// Wire an existing controller and memory model together
    pub fn with_parts(cache: CacheController, memory: M) -> Self {
        Self {
            cache,
            memory,
            cycles: 0,
        }
    }

    /// Advance the clock by one full period
    ///
    /// # Errors
    ///
    /// Propagates internal consistency errors from either component.
    pub fn step(&mut self) -> Result<()> {
        // Drive phase: both ends act on what they sampled last cycle
        self.cache.drive()?;
        self.memory.drive(&mut self.cache.mem)?;
        // Sample phase: the cache latches first so it sees this cycle's
        // ready pulse before the memory pulls the line low
        self.cache.sample();
        self.memory.sample(&mut self.cache.mem);
        self.cycles += 1;
        Ok(())
    }

    /// Advance the clock by `n` periods
    pub fn step_n(&mut self, n: usize) -> Result<()> {
        for _ in 0..n {
            self.step()?;
        }
        Ok(())
    }

    /// Issue a read and run the clock until it completes
    ///
    /// # Errors
    ///
    /// Caller contract violations are reported synchronously, before any
    /// cycle runs. A backing store that never answers stalls this call
    /// forever, exactly as it stalls the modeled hardware.
    pub fn read_word(&mut self, addr: u32) -> Result<CacheResponse> {
        self.cache.submit(CacheRequest::read(addr))?;
        self.run_to_completion()
    }

    /// Issue a write and run the clock until it completes
    ///
    /// # Errors
    ///
    /// Same contract as [`System::read_word`].
    pub fn write_word(&mut self, addr: u32, data: i32) -> Result<CacheResponse> {
        self.cache.submit(CacheRequest::write(addr, data))?;
        self.run_to_completion()
    }

    fn run_to_completion(&mut self) -> Result<CacheResponse> {
        loop {
            self.step()?;
            if let Some(response) = self.cache.take_response() {
                self.cache.release_request();
                // The port contract demands one idle cycle between
                // transactions
                self.step()?;
                return Ok(response);
            }
        }
    }

    /// Clock ticks elapsed since construction or reset
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Controller statistics
    pub fn stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// The cache controller
    pub fn cache(&self) -> &CacheController {
        &self.cache
    }

    /// Mutable access to the controller (port-level experiments)
    pub fn cache_mut(&mut self) -> &mut CacheController {
        &mut self.cache
    }

    /// The backing store
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Mutable access to the backing store
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Power-cycle the whole system
    pub fn reset(&mut self) {
        self.cache.reset();
        self.memory.reset();
        self.cycles = 0;
    }
}
