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

//! Backing-store models behind the memory-facing port
//!
//! The controller only knows the wire contract of
//! [`MemSignals`](crate::core::port::MemSignals): exactly one word is
//! transferred per access/ready round-trip, the backing store may take any
//! number of cycles before pulsing `ready`, and the controller waits for it
//! unconditionally. [`MemoryDevice`] captures that contract as a trait so
//! simulations can plug in different timing models.
//!
//! [`FixedLatencyMemory`] is the standard model: a word array over the
//! covered range with a fixed per-word latency. It also journals every
//! completed transaction, which is how the integration tests observe
//! write-back ordering, fill ordering, and no-write-allocate traffic.
//!
//! A model that never raises `ready` stalls the controller forever. That is
//! how the port is defined to behave, not a defect; there is no timeout.

use crate::core::error::{CacheError, Result};
use crate::core::port::{EdgeArm, MemSignals};

/// Word size of the memory port, matching the cache
const WORD_SIZE: u32 = crate::core::cache::WORD_SIZE;

/// A backing store attached to the controller's memory-facing port
///
/// Implementations follow the same two-phase clocking as the controller:
/// `drive` acts on lines sampled in the previous period and may pulse
/// `ready`; `sample` latches the controller-driven lines and pulls the
/// transient `ready` output low again.
pub trait MemoryDevice {
    /// Drive phase: progress the in-flight transaction, pulse `ready`/
    /// `rdata` on completion
    ///
    /// # Errors
    ///
    /// Implementations report malformed traffic (misaligned or uncovered
    /// addresses) as typed errors rather than wrapping around.
    fn drive(&mut self, lines: &mut MemSignals) -> Result<()>;

    /// Sample phase: latch `access`/`write`/`address`/`wdata`, pull `ready`
    /// low
    fn sample(&mut self, lines: &mut MemSignals);

    /// Return to the power-on state
    fn reset(&mut self) {}

    /// Human-readable name for logging
    fn name(&self) -> &str {
        "memory"
    }
}

/// One completed word transaction on the memory port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemTransaction {
    /// Write (vs read)
    pub write: bool,
    /// Word address
    pub address: u32,
    /// Data written, or data returned on a read
    pub data: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemoryState {
    Idle,
    Busy {
        remaining: u32,
        write: bool,
        address: u32,
        wdata: i32,
    },
}

/// Word-at-a-time backing store with a fixed per-word latency
///
/// # Example
///
/// ```
/// use cachex::core::memory::FixedLatencyMemory;
///
/// let mut memory = FixedLatencyMemory::new(0x00000000, 0x0000007C, 2).unwrap();
/// memory.poke(0x00000010, 42).unwrap();
/// assert_eq!(memory.peek(0x00000010).unwrap(), 42);
/// ```
pub struct FixedLatencyMemory {
    min_addr: u32,
    max_addr: u32,
    words: Vec<i32>,
    latency: u32,

    state: MemoryState,
    arm: EdgeArm,
    sampled_access: bool,
    sampled_write: bool,
    sampled_address: u32,
    sampled_wdata: i32,

    journal: Vec<MemTransaction>,
}

impl FixedLatencyMemory {
    /// Allocate a zeroed word array covering `[min_addr, max_addr]`
    ///
    /// # Arguments
    ///
    /// * `min_addr` - first word address (inclusive), word-aligned
    /// * `max_addr` - last word address (inclusive), word-aligned
    /// * `latency` - cycles between accepting a word transfer and pulsing
    ///   `ready`
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::MisalignedAddress`] for unaligned bounds and
    /// [`CacheError::OutOfRange`] for an inverted range.
    pub fn new(min_addr: u32, max_addr: u32, latency: u32) -> Result<Self> {
        if min_addr & (WORD_SIZE - 1) != 0 {
            return Err(CacheError::MisalignedAddress { address: min_addr });
        }
        if max_addr & (WORD_SIZE - 1) != 0 {
            return Err(CacheError::MisalignedAddress { address: max_addr });
        }
        if max_addr < min_addr {
            return Err(CacheError::OutOfRange {
                address: max_addr,
                min: min_addr,
                max: max_addr,
            });
        }
        let len = ((max_addr - min_addr) as u64 / WORD_SIZE as u64 + 1) as usize;
        Ok(Self {
            min_addr,
            max_addr,
            words: vec![0; len],
            latency,
            state: MemoryState::Idle,
            arm: EdgeArm::new(),
            sampled_access: false,
            sampled_write: false,
            sampled_address: 0,
            sampled_wdata: 0,
            journal: Vec::new(),
        })
    }

    /// Configured per-word latency in cycles
    pub fn latency(&self) -> u32 {
        self.latency
    }

    /// Stored words, in address order
    pub fn words(&self) -> &[i32] {
        &self.words
    }

    /// Completed transactions in completion order
    pub fn transactions(&self) -> &[MemTransaction] {
        &self.journal
    }

    /// Forget the journal so far
    pub fn clear_transactions(&mut self) {
        self.journal.clear();
    }

    /// Directly read a word, bypassing the port (test/tooling helper)
    pub fn peek(&self, addr: u32) -> Result<i32> {
        Ok(self.words[self.index(addr)?])
    }

    /// Directly write a word, bypassing the port (test/tooling helper)
    pub fn poke(&mut self, addr: u32, data: i32) -> Result<()> {
        let index = self.index(addr)?;
        self.words[index] = data;
        Ok(())
    }

    /// Overwrite the whole word array (snapshot restore)
    ///
    /// # Errors
    ///
    /// Rejects a word count that does not match the covered range.
    pub fn load_words(&mut self, words: &[i32]) -> Result<()> {
        if words.len() != self.words.len() {
            return Err(CacheError::CorruptSnapshot(format!(
                "memory image holds {} words, expected {}",
                words.len(),
                self.words.len()
            )));
        }
        self.words.copy_from_slice(words);
        Ok(())
    }

    fn index(&self, addr: u32) -> Result<usize> {
        if addr & (WORD_SIZE - 1) != 0 {
            return Err(CacheError::MisalignedAddress { address: addr });
        }
        if addr < self.min_addr || addr > self.max_addr {
            return Err(CacheError::OutOfRange {
                address: addr,
                min: self.min_addr,
                max: self.max_addr,
            });
        }
        Ok(((addr - self.min_addr) / WORD_SIZE) as usize)
    }
}

impl MemoryDevice for FixedLatencyMemory {
    fn drive(&mut self, lines: &mut MemSignals) -> Result<()> {
        match self.state {
            MemoryState::Idle => {
                if self.sampled_access && self.arm.armed() {
                    self.arm.consume();
                    self.state = MemoryState::Busy {
                        remaining: self.latency,
                        write: self.sampled_write,
                        address: self.sampled_address,
                        wdata: self.sampled_wdata,
                    };
                    log::trace!(
                        "memory: accepted {} 0x{:08X}",
                        if self.sampled_write { "write" } else { "read" },
                        self.sampled_address
                    );
                }
            }
            MemoryState::Busy {
                remaining,
                write,
                address,
                wdata,
            } => {
                if remaining > 0 {
                    self.state = MemoryState::Busy {
                        remaining: remaining - 1,
                        write,
                        address,
                        wdata,
                    };
                } else {
                    let index = self.index(address)?;
                    let data = if write {
                        self.words[index] = wdata;
                        wdata
                    } else {
                        self.words[index]
                    };
                    lines.ready = true;
                    lines.rdata = data;
                    self.journal.push(MemTransaction {
                        write,
                        address,
                        data,
                    });
                    log::trace!(
                        "memory: {} 0x{:08X} = 0x{:08X}",
                        if write { "wrote" } else { "read" },
                        address,
                        data as u32
                    );
                    self.state = MemoryState::Idle;
                }
            }
        }
        Ok(())
    }

    fn sample(&mut self, lines: &mut MemSignals) {
        self.arm.observe(lines.access);
        self.sampled_access = lines.access;
        self.sampled_write = lines.write;
        self.sampled_address = lines.address;
        self.sampled_wdata = lines.wdata;
        lines.ready = false;
    }

    fn reset(&mut self) {
        self.state = MemoryState::Idle;
        self.arm.reset();
        self.sampled_access = false;
        self.sampled_write = false;
        self.sampled_address = 0;
        self.sampled_wdata = 0;
        self.words.fill(0);
        self.journal.clear();
    }

    fn name(&self) -> &str {
        "fixed-latency memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(memory: &mut FixedLatencyMemory, lines: &mut MemSignals) {
        memory.drive(lines).unwrap();
        memory.sample(lines);
    }

    #[test]
    fn test_peek_poke_round_trip() {
        let mut memory = FixedLatencyMemory::new(0x1000, 0x107C, 0).unwrap();
        memory.poke(0x1040, -99).unwrap();
        assert_eq!(memory.peek(0x1040).unwrap(), -99);
        assert_eq!(memory.peek(0x1000).unwrap(), 0);
    }

    #[test]
    fn test_peek_poke_bounds() {
        let mut memory = FixedLatencyMemory::new(0x1000, 0x107C, 0).unwrap();
        assert!(matches!(
            memory.peek(0x0FFC),
            Err(CacheError::OutOfRange { .. })
        ));
        assert!(matches!(
            memory.poke(0x1080, 0),
            Err(CacheError::OutOfRange { .. })
        ));
        assert!(matches!(
            memory.peek(0x1002),
            Err(CacheError::MisalignedAddress { .. })
        ));
    }

    #[test]
    fn test_rejects_bad_bounds() {
        assert!(FixedLatencyMemory::new(0x2, 0x7C, 0).is_err());
        assert!(FixedLatencyMemory::new(0x80, 0x7C, 0).is_err());
    }

    #[test]
    fn test_word_write_completes_and_journals() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x7C, 3).unwrap();
        let mut lines = MemSignals {
            access: true,
            write: true,
            address: 0x10,
            wdata: 55,
            ..MemSignals::default()
        };

        // access sampled at the end of the first tick
        tick(&mut memory, &mut lines);

        // one accept drive, `latency` countdown drives, one completion drive
        let mut drives = 0;
        while !lines.ready {
            memory.drive(&mut lines).unwrap();
            drives += 1;
            assert!(drives < 20, "memory never pulsed ready");
        }
        assert_eq!(drives, 1 + 3 + 1);
        assert_eq!(memory.peek(0x10).unwrap(), 55);
        assert_eq!(
            memory.transactions(),
            &[MemTransaction {
                write: true,
                address: 0x10,
                data: 55
            }]
        );
    }

    #[test]
    fn test_ready_is_pulled_low_in_sample_phase() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x7C, 0).unwrap();
        let mut lines = MemSignals {
            access: true,
            write: false,
            address: 0x0,
            ..MemSignals::default()
        };

        tick(&mut memory, &mut lines); // sample access
        tick(&mut memory, &mut lines); // accept
        memory.drive(&mut lines).unwrap(); // complete
        assert!(lines.ready);
        memory.sample(&mut lines);
        assert!(!lines.ready);
    }

    #[test]
    fn test_held_access_line_transfers_one_word() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x7C, 0).unwrap();
        let mut lines = MemSignals {
            access: true,
            write: true,
            address: 0x20,
            wdata: 7,
            ..MemSignals::default()
        };

        // Hold access high well past completion
        for _ in 0..12 {
            tick(&mut memory, &mut lines);
        }
        assert_eq!(memory.transactions().len(), 1);

        // Drop for one cycle, raise again: second transfer accepted
        lines.access = false;
        tick(&mut memory, &mut lines);
        lines.access = true;
        lines.address = 0x24;
        for _ in 0..12 {
            tick(&mut memory, &mut lines);
        }
        assert_eq!(memory.transactions().len(), 2);
        assert_eq!(memory.transactions()[1].address, 0x24);
    }

    #[test]
    fn test_read_returns_stored_word() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x7C, 1).unwrap();
        memory.poke(0x3C, 0x0BADF00D).unwrap();
        let mut lines = MemSignals {
            access: true,
            write: false,
            address: 0x3C,
            ..MemSignals::default()
        };

        let mut data = None;
        for _ in 0..10 {
            memory.drive(&mut lines).unwrap();
            if lines.ready {
                data = Some(lines.rdata);
            }
            memory.sample(&mut lines);
        }
        assert_eq!(data, Some(0x0BADF00D));
    }

    #[test]
    fn test_reset_clears_contents_and_journal() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x7C, 0).unwrap();
        memory.poke(0x0, 1).unwrap();
        let mut lines = MemSignals {
            access: true,
            write: true,
            address: 0x4,
            wdata: 2,
            ..MemSignals::default()
        };
        for _ in 0..6 {
            tick(&mut memory, &mut lines);
        }
        assert!(!memory.transactions().is_empty());

        memory.reset();
        assert!(memory.transactions().is_empty());
        assert_eq!(memory.peek(0x0).unwrap(), 0);
    }

    #[test]
    fn test_load_words_shape_check() {
        let mut memory = FixedLatencyMemory::new(0x0, 0x1C, 0).unwrap();
        assert!(memory.load_words(&[1, 2, 3]).is_err());
        assert!(memory.load_words(&[1, 2, 3, 4, 5, 6, 7, 8]).is_ok());
        assert_eq!(memory.peek(0x1C).unwrap(), 8);
    }
}
