// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::fmt::{self, Display, Formatter};

use bstr::ByteSlice;
use memchr::memchr;
use thiserror::Error;

use crate::quote::quote;

/// How many consecutive empty tokens a splitter may produce without
/// consuming input before the run is declared stuck.
pub const MAX_CONSECUTIVE_EMPTIES: u32 = 100;

/// An invariant failure raised by the splitter-to-matcher bridge.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum SplitError {
    /// A splitter reported an advance past the end of its input.
    #[error("splitter advanced past the end of its input")]
    AdvanceTooFar,
    /// A splitter produced empty tokens without consuming input for too many
    /// rounds in a row.
    #[error("too many empty tokens without progressing")]
    TooManyEmptyTokens,
}

/// One splitting step over a window of input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Split {
    /// No token yet; more input is needed.
    None,
    /// A token at `start..end`, with scanning to resume at `advance`.
    Token {
        start: usize,
        end: usize,
        advance: usize,
    },
}

/// Token-by-token splitting on literal delimiters, in the style of a
/// scanner. `split` never commits a token whose delimiter could still grow
/// past the end of the window unless `at_eof` says no more input is coming.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Splitter {
    /// Split on a run of exactly `n` consecutive newlines (`n = 2` is a
    /// paragraph splitter).
    Line(usize),
    Byte(u8),
    Bytes(Vec<u8>),
    TrimmedByte { delim: u8, cutset: Vec<u8> },
    TrimmedBytes { delim: Vec<u8>, cutset: Vec<u8> },
}

impl Splitter {
    /// Chooses the splitter for a literal delimiter: a string of only
    /// newlines becomes a line splitter of that run length, a single byte a
    /// byte splitter, anything longer a byte-string splitter.
    ///
    /// The delimiter must be non-empty; the builder rejects empty ones.
    pub fn literal(delim: &[u8]) -> Splitter {
        debug_assert!(!delim.is_empty(), "empty delimiter");
        if delim.iter().all(|&b| b == b'\n') {
            Splitter::Line(delim.len())
        } else if let [b] = *delim {
            Splitter::Byte(b)
        } else {
            Splitter::Bytes(delim.to_vec())
        }
    }

    /// Wraps this splitter so every token is right-trimmed of the bytes in
    /// `cutset`. Line splitters degrade to the equivalent literal splitter,
    /// so the cutset is honoured at the cost of the run-of-newlines scan.
    pub fn trimmed(self, cutset: Vec<u8>) -> Splitter {
        match self {
            Splitter::Line(1) => Splitter::TrimmedByte { delim: b'\n', cutset },
            Splitter::Line(n) => Splitter::TrimmedBytes {
                delim: vec![b'\n'; n],
                cutset,
            },
            Splitter::Byte(delim) => Splitter::TrimmedByte { delim, cutset },
            Splitter::Bytes(delim) => Splitter::TrimmedBytes { delim, cutset },
            Splitter::TrimmedByte { delim, .. } => Splitter::TrimmedByte { delim, cutset },
            Splitter::TrimmedBytes { delim, .. } => Splitter::TrimmedBytes { delim, cutset },
        }
    }

    /// Finds the next token in `data`. At EOF the remainder (if any) becomes
    /// the final token.
    pub fn split(&self, data: &[u8], at_eof: bool) -> Split {
        if at_eof && data.is_empty() {
            return Split::None;
        }
        match *self {
            Splitter::Line(n) => split_lines(n, data, at_eof),
            Splitter::Byte(delim) => trim(split_byte(delim, data, at_eof), data, &[]),
            Splitter::Bytes(ref delim) => trim(split_bytes(delim, data, at_eof), data, &[]),
            Splitter::TrimmedByte { delim, ref cutset } => {
                trim(split_byte(delim, data, at_eof), data, cutset)
            }
            Splitter::TrimmedBytes {
                ref delim,
                ref cutset,
            } => trim(split_bytes(delim, data, at_eof), data, cutset),
        }
    }
}

fn split_lines(n: usize, data: &[u8], at_eof: bool) -> Split {
    let mut off = 0;
    'attempt: loop {
        let i = match memchr(b'\n', &data[off..]) {
            Some(i) => off + i,
            None if at_eof => {
                return Split::Token {
                    start: 0,
                    end: data.len(),
                    advance: data.len(),
                }
            }
            None => return Split::None,
        };
        let mut j = i + 1;
        let mut run = 1;
        while run < n {
            if j >= data.len() {
                if at_eof {
                    // The run cannot grow any further; take what is there.
                    break;
                }
                // The run might continue in the next read; do not commit.
                return Split::None;
            }
            if data[j] != b'\n' {
                off = j;
                continue 'attempt;
            }
            j += 1;
            run += 1;
        }
        return Split::Token {
            start: 0,
            end: i,
            advance: j,
        };
    }
}

fn split_byte(delim: u8, data: &[u8], at_eof: bool) -> Split {
    match memchr(delim, data) {
        Some(i) => Split::Token {
            start: 0,
            end: i,
            advance: i + 1,
        },
        None if at_eof => Split::Token {
            start: 0,
            end: data.len(),
            advance: data.len(),
        },
        None => Split::None,
    }
}

fn split_bytes(delim: &[u8], data: &[u8], at_eof: bool) -> Split {
    match data.find(delim) {
        Some(i) => Split::Token {
            start: 0,
            end: i,
            advance: i + delim.len(),
        },
        None if at_eof => Split::Token {
            start: 0,
            end: data.len(),
            advance: data.len(),
        },
        None => Split::None,
    }
}

fn trim(sp: Split, data: &[u8], cutset: &[u8]) -> Split {
    if cutset.is_empty() {
        return sp;
    }
    match sp {
        Split::Token {
            start,
            mut end,
            advance,
        } => {
            while end > start && cutset.contains(&data[end - 1]) {
                end -= 1;
            }
            Split::Token {
                start,
                end,
                advance,
            }
        }
        Split::None => Split::None,
    }
}

impl Display for Splitter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Splitter::Line(n) => f.write_str(&quote(&vec![b'\n'; *n])),
            Splitter::Byte(b) => f.write_str(&quote(&[*b])),
            Splitter::Bytes(delim) => f.write_str(&quote(delim)),
            Splitter::TrimmedByte { delim, cutset } => {
                write!(f, "{}~{}", quote(&[*delim]), quote(cutset))
            }
            Splitter::TrimmedBytes { delim, cutset } => {
                write!(f, "{}~{}", quote(delim), quote(cutset))
            }
        }
    }
}
