// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut

//! Access-trace parsing
//!
//! The CLI drives the simulator from line-oriented trace files:
//!
//! ```text
//! # warm the first block, then dirty it
//! R 0x00000000
//! W 0x00000004 0x55555555
//! R 0x00000004
//! ```
//!
//! One operation per line: `R <address>` or `W <address> <value>`. Numbers
//! are hexadecimal with a `0x` prefix or plain decimal; write values may be
//! negative decimal. Blank lines and `#` comments are ignored.

use std::path::Path;

use crate::core::error::{CacheError, Result};

/// One parsed trace operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOp {
    /// Read the word at `address`
    Read {
        /// Word-aligned target address
        address: u32,
    },
    /// Write `data` to `address`
    Write {
        /// Word-aligned target address
        address: u32,
        /// Value to store
        data: i32,
    },
}

fn parse_u32(token: &str, line: usize) -> Result<u32> {
    let parsed = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else {
        token.parse::<u32>()
    };
    parsed.map_err(|_| CacheError::TraceParse {
        line,
        message: format!("invalid address '{}'", token),
    })
}

fn parse_i32(token: &str, line: usize) -> Result<i32> {
    let parsed = if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map(|value| value as i32)
    } else {
        token.parse::<i32>()
    };
    parsed.map_err(|_| CacheError::TraceParse {
        line,
        message: format!("invalid value '{}'", token),
    })
}

/// Parse a trace from text
///
/// # Errors
///
/// Returns [`CacheError::TraceParse`] with the 1-based line number of the
/// first malformed line.
pub fn parse_trace(text: &str) -> Result<Vec<TraceOp>> {
    let mut ops = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let content = raw.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let mut tokens = content.split_whitespace();
        let op = tokens.next().unwrap_or("");
        match op {
            "R" | "r" => {
                let address = tokens.next().ok_or_else(|| CacheError::TraceParse {
                    line,
                    message: "read needs an address".to_string(),
                })?;
                ops.push(TraceOp::Read {
                    address: parse_u32(address, line)?,
                });
            }
            "W" | "w" => {
                let address = tokens.next().ok_or_else(|| CacheError::TraceParse {
                    line,
                    message: "write needs an address".to_string(),
                })?;
                let data = tokens.next().ok_or_else(|| CacheError::TraceParse {
                    line,
                    message: "write needs a value".to_string(),
                })?;
                ops.push(TraceOp::Write {
                    address: parse_u32(address, line)?,
                    data: parse_i32(data, line)?,
                });
            }
            other => {
                return Err(CacheError::TraceParse {
                    line,
                    message: format!("unknown operation '{}'", other),
                });
            }
        }
        if let Some(extra) = tokens.next() {
            return Err(CacheError::TraceParse {
                line,
                message: format!("unexpected trailing token '{}'", extra),
            });
        }
    }
    Ok(ops)
}

/// Load and parse a trace file
///
/// # Errors
///
/// Propagates I/O failures and [`CacheError::TraceParse`].
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<TraceOp>> {
    let text = std::fs::read_to_string(path)?;
    parse_trace(&text)
}
