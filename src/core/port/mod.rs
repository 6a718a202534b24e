// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Port wire bundles and the shared handshake discipline
//!
//! The controller talks to both of its collaborators through edge-triggered
//! two-phase request/acknowledge handshakes:
//!
//! - the requester asserts its request line and holds every associated line
//!   stable until the responder pulses completion for exactly one cycle;
//! - the responder samples lines during the low clock phase and acts on
//!   them in the following drive phase, never in the cycle they were
//!   asserted;
//! - after a completion pulse the request line must be sampled low for one
//!   full cycle before the next transaction is honoured, so a still-high
//!   line is never resampled as a new request.
//!
//! # Processor-facing port
//!
//! | Line      | Driven by  | Semantics                                  |
//! |-----------|------------|--------------------------------------------|
//! | `request` | processor  | held high while a request is outstanding   |
//! | `is_write`| processor  | write (vs read), valid while `request`     |
//! | `address` | processor  | word-aligned, valid while `request`        |
//! | `wdata`   | processor  | valid on writes only                       |
//! | `ready`   | controller | pulsed one cycle on completion             |
//! | `hit`     | controller | pulsed with `ready` when no memory traffic |
//! | `rdata`   | controller | valid on read completion only              |
//!
//! # Memory-facing port
//!
//! | Line      | Driven by  | Semantics                                  |
//! |-----------|------------|--------------------------------------------|
//! | `access`  | controller | held high while a word transfer is pending |
//! | `write`   | controller | write (vs read), valid while `access`      |
//! | `address` | controller | word address of the transfer               |
//! | `wdata`   | controller | valid on writes only                       |
//! | `ready`   | memory     | pulsed one cycle per completed word        |
//! | `rdata`   | memory     | valid with `ready` on reads                |

/// Wires of the processor-facing port
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcSignals {
    /// Request line, held by the processor until `ready`
    pub request: bool,
    /// Write indicator, valid while `request` is high
    pub is_write: bool,
    /// Word-aligned request address
    pub address: u32,
    /// Write data, valid on writes only
    pub wdata: i32,
    /// Completion pulse, one cycle
    pub ready: bool,
    /// Pulsed with `ready` when the request needed no memory traffic
    pub hit: bool,
    /// Read data, valid with `ready` on reads
    pub rdata: i32,
}

/// Wires of the memory-facing port
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemSignals {
    /// Access line, held by the controller until `ready`
    pub access: bool,
    /// Write indicator, valid while `access` is high
    pub write: bool,
    /// Word address of the transfer
    pub address: u32,
    /// Write data, valid on writes only
    pub wdata: i32,
    /// Completion pulse, one cycle
    pub ready: bool,
    /// Read data, valid with `ready` on reads
    pub rdata: i32,
}

/// Edge-triggered arming of a request line
///
/// A responder consumes one rising edge per transaction. The latch re-arms
/// only when the line is sampled low, which enforces the mandatory idle
/// cycle between transactions: a line still high from a completed request
/// is never treated as a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeArm {
    armed: bool,
}

impl EdgeArm {
    /// A fresh latch is armed (the line starts out low at reset)
    pub fn new() -> Self {
        Self { armed: true }
    }

    /// Observe the line during a sample phase; a low sample re-arms
    pub fn observe(&mut self, line: bool) {
        if !line {
            self.armed = true;
        }
    }

    /// True when a high sample may be honoured as a new transaction
    pub fn armed(&self) -> bool {
        self.armed
    }

    /// Consume the armed edge when a transaction is accepted
    pub fn consume(&mut self) {
        self.armed = false;
    }

    /// Return to the reset state
    pub fn reset(&mut self) {
        self.armed = true;
    }
}

impl Default for EdgeArm {
    fn default() -> Self {
        Self::new()
    }
}
