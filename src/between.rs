// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::fmt::{self, Display, Formatter};

use crate::balance::{scan_balanced, Pair};
use crate::command::Pattern;
use crate::matcher::Scan;
use crate::split::{Split, SplitError, Splitter, MAX_CONSECUTIVE_EMPTIES};

/// `y/re/`: yield the bytes before each delimiter match, advancing past the
/// match. At EOF any bytes after the last delimiter form the final region.
#[derive(Clone, Debug)]
pub struct BetweenRe {
    pat: Pattern,
}

impl BetweenRe {
    pub fn new(pat: Pattern) -> BetweenRe {
        BetweenRe { pat }
    }

    pub(crate) fn scan(&self, window: &[u8], at_eof: bool) -> Scan {
        match self.pat.regex().find(window) {
            Some(m) => Scan::Loc {
                start: 0,
                end: m.start(),
                next: m.end(),
            },
            None if at_eof => Scan::Trailer,
            None => Scan::None,
        }
    }
}

/// `y/start/end/`: yield the bytes between a start match and the next end
/// match, both exclusive, advancing past the end match. A pair that has
/// opened but not closed is never committed early: more input may still
/// close it.
#[derive(Clone, Debug)]
pub struct BetweenPair {
    start: Pattern,
    end: Pattern,
}

impl BetweenPair {
    pub fn new(start: Pattern, end: Pattern) -> BetweenPair {
        BetweenPair { start, end }
    }

    pub(crate) fn scan(&self, window: &[u8], at_eof: bool) -> Scan {
        let Some(open) = self.start.regex().find(window) else {
            return Scan::None;
        };
        let rest = &window[open.end()..];
        match self.end.regex().find(rest) {
            // A close match that runs into the end of the buffer could
            // still grow; the pair stays uncommitted until the input
            // settles, because once the opening match is consumed there is
            // no re-deriving it.
            Some(close) if open.end() + close.end() == window.len() && !at_eof => Scan::None,
            Some(close) => Scan::Loc {
                start: open.end(),
                end: open.end() + close.start(),
                next: open.end() + close.end(),
            },
            None => Scan::None,
        }
    }
}

/// `y{` and friends: yield the contents of each top-level balanced region,
/// brackets excluded.
#[derive(Clone, Copy, Debug)]
pub struct BetweenBalanced {
    pair: Pair,
}

impl BetweenBalanced {
    pub fn new(pair: Pair) -> BetweenBalanced {
        BetweenBalanced { pair }
    }

    pub(crate) fn scan(&self, window: &[u8]) -> Scan {
        match scan_balanced(self.pair, window) {
            Some((start, end)) => Scan::Loc {
                start: start + 1,
                end: end - 1,
                next: end,
            },
            None => Scan::None,
        }
    }
}

/// `y"delim"`: bridges a literal [`Splitter`] into the matcher contract,
/// guarding the splitter invariants on the way through.
#[derive(Clone, Debug)]
pub struct BetweenSplit {
    split: Splitter,
    empties: u32,
}

impl BetweenSplit {
    pub fn new(split: Splitter) -> BetweenSplit {
        BetweenSplit { split, empties: 0 }
    }

    pub(crate) fn scan(&mut self, window: &[u8], at_eof: bool) -> Result<Scan, SplitError> {
        let sp = self.split.split(window, at_eof);
        self.bridge(sp, window.len())
    }

    /// Validates one splitting step and converts it to a scan result.
    fn bridge(&mut self, sp: Split, len: usize) -> Result<Scan, SplitError> {
        match sp {
            Split::None => Ok(Scan::None),
            Split::Token {
                start,
                end,
                advance,
            } => {
                if advance > len {
                    return Err(SplitError::AdvanceTooFar);
                }
                if advance == 0 && start == end {
                    self.empties += 1;
                    if self.empties > MAX_CONSECUTIVE_EMPTIES {
                        return Err(SplitError::TooManyEmptyTokens);
                    }
                } else {
                    self.empties = 0;
                }
                Ok(Scan::Loc {
                    start,
                    end,
                    next: advance,
                })
            }
        }
    }
}

impl Display for BetweenRe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "y{}", self.pat)
    }
}

impl Display for BetweenPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "y{}{}", self.start, self.end)
    }
}

impl Display for BetweenBalanced {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "y{}", char::from(self.pair.open))
    }
}

impl Display for BetweenSplit {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "y{}", self.split)
    }
}
