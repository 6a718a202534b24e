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

//! cachex: a cycle-accurate cache controller simulator
//!
//! This crate models a single-level, direct-mapped, write-back,
//! no-write-allocate cache controller sitting between a processor port and
//! a backing-store port, clocked by an explicit two-phase
//! (drive-then-sample) step function.
//!
//! # Architecture
//!
//! - [`core::cache`]: the controller state machine, block store, and
//!   address decomposition
//! - [`core::port`]: the wire bundles and handshake discipline of both
//!   ports
//! - [`core::memory`]: backing-store models behind the memory-facing port
//! - [`core::system`]: controller + memory under one clock
//! - [`core::config`]: TOML-loadable construction-time configuration
//! - [`core::snapshot`]: save states
//! - [`trace`]: access-trace parsing for the CLI
//!
//! # Example
//!
//! ```
//! use cachex::core::config::SimConfig;
//! use cachex::core::system::System;
//!
//! let mut system = System::new(&SimConfig::default()).unwrap();
//! system.write_word(0x00000004, 0x55555555).unwrap();
//! let response = system.read_word(0x00000004).unwrap();
//! assert_eq!(response.data, Some(0x55555555));
//! ```
//!
//! # Error Handling
//!
//! All fallible operations return [`core::error::Result<T>`], an alias for
//! `Result<T, CacheError>`. Misaligned or out-of-range addresses are caller
//! contract violations, rejected synchronously at request submission.

pub mod core;
pub mod trace;

// Re-export commonly used types
pub use crate::core::error::{CacheError, Result};
