// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::fmt::{self, Display, Formatter};

use regex::bytes::Regex;

use crate::balance::Pair;
use crate::quote::{quote, FormatStr};

/// A compiled pattern along with the literal text and flags it was written
/// with, so the atom can be rendered back exactly as typed.
#[derive(Clone, Debug)]
pub struct Pattern {
    source: String,
    flags: String,
    re: Regex,
}

impl Pattern {
    /// Compiles `source` with the given single-letter flags (`i`, `s`, `U`)
    /// applied in order. Patterns are implicitly multiline.
    pub fn compile(source: &str, flags: &str) -> Result<Pattern, regex::Error> {
        debug_assert!(flags.chars().all(|f| matches!(f, 'i' | 's' | 'U')));
        let mut pat = source.to_string();
        for f in flags.chars() {
            pat = format!("(?{f}:{pat})");
        }
        let re = Regex::new(&format!("(?m:{pat})"))?;
        Ok(Pattern {
            source: source.to_string(),
            flags: flags.to_string(),
            re,
        })
    }

    #[inline]
    pub fn regex(&self) -> &Regex {
        &self.re
    }

    /// Number of capture groups, not counting the implicit whole match.
    pub fn group_count(&self) -> usize {
        self.re.captures_len() - 1
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for Pattern {}

impl Display for Pattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// One parsed command atom. Atoms are immutable after parsing; the builder
/// turns a sequence of them into a processor chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Extract(Extract),
    Between(Between),
    Filter(Filter),
    Print(Print),
    Join(Join),
}

/// `x`: extract each match as a sub-region.
#[derive(Clone, Debug, PartialEq)]
pub enum Extract {
    /// `x/re/`: each whole match.
    Regex(Pattern),
    /// `x/re/` with capture groups: the captured sub-span of each match.
    /// The index selects the group (currently always 1).
    SubRegex(Pattern, usize),
    /// `x[`, `x{`, `x(`, `x<`: each top-level balanced region, brackets
    /// included.
    Balanced(Pair),
}

/// `y`: extract the spans between matches of the delimiter(s).
#[derive(Clone, Debug, PartialEq)]
pub enum Between {
    /// `y/re/`: the bytes before each match; trailing bytes at EOF form the
    /// final region.
    RegexDelim(Pattern),
    /// `y/start/end/`: the bytes between a start match and the next end
    /// match, both exclusive.
    RegexPair(Pattern, Pattern),
    /// `y[` and friends: balanced region contents, brackets excluded.
    Balanced(Pair),
    /// `y"delim"` with optional `~"cutset"` right-trimming.
    StringDelim {
        delim: Vec<u8>,
        cutset: Option<Vec<u8>>,
    },
}

/// `g/re/` passes regions matching the pattern; `v/re/` the others.
#[derive(Clone, Debug, PartialEq)]
pub struct Filter {
    pub pattern: Pattern,
    pub negate: bool,
}

/// `p`: output formatting.
#[derive(Clone, Debug, PartialEq)]
pub enum Print {
    /// Bare `p`: pass regions through unchanged.
    Plain,
    /// `p%"fmt"`: render each region through a format string.
    Format(FormatStr),
    /// `p"delim"`: append a delimiter to each region.
    Delim(Vec<u8>),
}

/// `j`: accumulate the regions of each scope into one region.
#[derive(Clone, Debug, PartialEq)]
pub enum Join {
    /// Bare `j`: plain concatenation.
    Concat,
    /// `j,`: single-byte separator.
    ByteSep(u8),
    /// `j", "`: byte-string separator.
    StringSep(Vec<u8>),
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Command::Extract(x) => x.fmt(f),
            Command::Between(y) => y.fmt(f),
            Command::Filter(g) => g.fmt(f),
            Command::Print(p) => p.fmt(f),
            Command::Join(j) => j.fmt(f),
        }
    }
}

impl Display for Extract {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Extract::Regex(pat) | Extract::SubRegex(pat, _) => write!(f, "x{pat}"),
            Extract::Balanced(pair) => write!(f, "x{}", char::from(pair.open)),
        }
    }
}

impl Display for Between {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Between::RegexDelim(pat) => write!(f, "y{pat}"),
            Between::RegexPair(start, end) => write!(f, "y{start}{end}"),
            Between::Balanced(pair) => write!(f, "y{}", char::from(pair.open)),
            Between::StringDelim { delim, cutset } => {
                write!(f, "y{}", quote(delim))?;
                if let Some(cutset) = cutset {
                    write!(f, "~{}", quote(cutset))?;
                }
                Ok(())
            }
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let letter = if self.negate { 'v' } else { 'g' };
        write!(f, "{letter}{}", self.pattern)
    }
}

impl Display for Print {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Print::Plain => f.write_str("p"),
            Print::Format(fmt) => write!(f, "p%{fmt}"),
            Print::Delim(delim) => write!(f, "p{}", quote(delim)),
        }
    }
}

impl Display for Join {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Join::Concat => f.write_str("j"),
            Join::ByteSep(sep) => {
                if *sep == b'"' || sep.is_ascii_whitespace() || !sep.is_ascii_graphic() {
                    write!(f, "j{}", quote(&[*sep]))
                } else {
                    write!(f, "j{}", char::from(*sep))
                }
            }
            Join::StringSep(sep) => write!(f, "j{}", quote(sep)),
        }
    }
}

/// Renders a program back to its canonical text: atoms joined by single
/// spaces. Re-parsing the result yields an equivalent atom list.
pub fn render(atoms: &[Command]) -> String {
    let mut out = String::new();
    for (i, atom) in atoms.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&atom.to_string());
    }
    out
}
