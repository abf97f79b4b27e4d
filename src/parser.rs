// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use thiserror::Error;

use crate::balance::Pair;
use crate::command::{Between, Command, Extract, Filter, Join, Pattern, Print};
use crate::quote::{unquote, FormatError, FormatStr, QuoteError};

/// An error from parsing a program, with the byte offset it was found at.
#[derive(Debug, Error)]
#[error("at offset {pos}: {kind}")]
pub struct ParseError {
    pub pos: usize,
    pub kind: ParseErrorKind,
}

/// A kind of program parse error.
#[derive(Debug, Error)]
pub enum ParseErrorKind {
    /// The byte does not start any known command.
    #[error("unrecognized command {:?}", char::from(*.0))]
    UnrecognizedCommand(u8),
    /// A command letter with nothing after it.
    #[error("empty {} command", char::from(*.0))]
    EmptyCommand(u8),
    /// A command body that starts with a byte the command has no form for.
    #[error("unrecognized {} command", char::from(*.0))]
    UnrecognizedBody(u8),
    /// A pattern literal with no closing delimiter.
    #[error("missing separator {:?}", char::from(*.0))]
    MissingSeparator(u8),
    /// A string literal with no closing quote.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// `p%` not followed by a double-quoted format string.
    #[error("missing format string after p%")]
    MissingFormat,
    /// A string literal with a bad escape sequence.
    #[error(transparent)]
    Quote(#[from] QuoteError),
    /// A format string that does not fit the one-region-verb contract.
    #[error(transparent)]
    Format(#[from] FormatError),
    /// A pattern that does not compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
    /// `x` supports zero or one capture group, nothing more.
    #[error("extraction with {0} capture groups not supported")]
    UnsupportedCaptures(usize),
}

/// Parses a program into its command atoms. Whitespace between atoms is
/// ignored; an empty program parses to an empty chain (which copies input
/// to output, like a bare `p`).
pub fn parse(src: &str) -> Result<Vec<Command>, ParseError> {
    let mut scanner = Scanner {
        src: src.as_bytes(),
        pos: 0,
    };
    let mut atoms = Vec::new();
    loop {
        scanner.skip_whitespace();
        if scanner.at_end() {
            return Ok(atoms);
        }
        atoms.push(scanner.scan_atom()?);
    }
}

struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\r' | b'\n')) {
            self.pos += 1;
        }
    }

    fn err_at(&self, pos: usize, kind: impl Into<ParseErrorKind>) -> ParseError {
        ParseError {
            pos,
            kind: kind.into(),
        }
    }

    fn scan_atom(&mut self) -> Result<Command, ParseError> {
        let pos = self.pos;
        let letter = self.bump().expect("scan_atom called at end");
        match letter {
            b'x' => self.scan_x(pos),
            b'y' => self.scan_y(pos),
            b'g' => self.scan_filter(pos, false),
            b'v' => self.scan_filter(pos, true),
            b'p' => self.scan_p(),
            b'j' => self.scan_j(),
            _ => Err(self.err_at(pos, ParseErrorKind::UnrecognizedCommand(letter))),
        }
    }

    fn scan_x(&mut self, pos: usize) -> Result<Command, ParseError> {
        let Some(c) = self.peek() else {
            return Err(self.err_at(pos, ParseErrorKind::EmptyCommand(b'x')));
        };
        if let Some(pair) = Pair::for_open(c) {
            self.pos += 1;
            return Ok(Command::Extract(Extract::Balanced(pair)));
        }
        self.pos += 1;
        let pat = self.scan_pattern(c)?;
        let x = match pat.group_count() {
            0 => Extract::Regex(pat),
            1 => Extract::SubRegex(pat, 1),
            n => return Err(self.err_at(pos, ParseErrorKind::UnsupportedCaptures(n))),
        };
        Ok(Command::Extract(x))
    }

    fn scan_y(&mut self, pos: usize) -> Result<Command, ParseError> {
        let Some(c) = self.peek() else {
            return Err(self.err_at(pos, ParseErrorKind::EmptyCommand(b'y')));
        };
        if let Some(pair) = Pair::for_open(c) {
            self.pos += 1;
            return Ok(Command::Between(Between::Balanced(pair)));
        }
        if c == b'"' {
            self.pos += 1;
            let delim = self.scan_string()?;
            let cutset = if self.peek() == Some(b'~') {
                let tilde = self.pos;
                self.pos += 1;
                if self.bump() != Some(b'"') {
                    return Err(self.err_at(tilde, ParseErrorKind::UnterminatedString));
                }
                Some(self.scan_string()?)
            } else {
                None
            };
            return Ok(Command::Between(Between::StringDelim { delim, cutset }));
        }
        self.pos += 1;
        let first = self.scan_pattern(c)?;
        if self.peek() == Some(c) {
            self.pos += 1;
            let second = self.scan_pattern(c)?;
            return Ok(Command::Between(Between::RegexPair(first, second)));
        }
        Ok(Command::Between(Between::RegexDelim(first)))
    }

    fn scan_filter(&mut self, pos: usize, negate: bool) -> Result<Command, ParseError> {
        let Some(sep) = self.bump() else {
            let letter = if negate { b'v' } else { b'g' };
            return Err(self.err_at(pos, ParseErrorKind::EmptyCommand(letter)));
        };
        let pattern = self.scan_pattern(sep)?;
        Ok(Command::Filter(Filter { pattern, negate }))
    }

    fn scan_p(&mut self) -> Result<Command, ParseError> {
        match self.peek() {
            None | Some(b' ' | b'\t' | b'\r' | b'\n') => Ok(Command::Print(Print::Plain)),
            Some(b'%') => {
                let pos = self.pos;
                self.pos += 1;
                if self.bump() != Some(b'"') {
                    return Err(self.err_at(pos, ParseErrorKind::MissingFormat));
                }
                let text = self.scan_string()?;
                let fmt = FormatStr::compile(&text).map_err(|e| self.err_at(pos, e))?;
                Ok(Command::Print(Print::Format(fmt)))
            }
            Some(b'"') => {
                self.pos += 1;
                let delim = self.scan_string()?;
                Ok(Command::Print(Print::Delim(delim)))
            }
            Some(_) => Err(self.err_at(self.pos, ParseErrorKind::UnrecognizedBody(b'p'))),
        }
    }

    fn scan_j(&mut self) -> Result<Command, ParseError> {
        match self.peek() {
            None | Some(b' ' | b'\t' | b'\r' | b'\n') => Ok(Command::Join(Join::Concat)),
            Some(b'"') => {
                self.pos += 1;
                let sep = self.scan_string()?;
                Ok(Command::Join(match sep.len() {
                    0 => Join::Concat,
                    1 => Join::ByteSep(sep[0]),
                    _ => Join::StringSep(sep),
                }))
            }
            Some(b) => {
                self.pos += 1;
                Ok(Command::Join(Join::ByteSep(b)))
            }
        }
    }

    /// Scans a pattern literal up to the closing `sep` (a backslash escapes
    /// it), then any trailing flags, and compiles. Quote separators make the
    /// body literal rather than a pattern.
    fn scan_pattern(&mut self, sep: u8) -> Result<Pattern, ParseError> {
        let pos = self.pos;
        let body = self
            .take_delimited(sep)
            .ok_or_else(|| self.err_at(pos, ParseErrorKind::MissingSeparator(sep)))?;
        let flags_start = self.pos;
        while matches!(self.peek(), Some(b'i' | b's' | b'U')) {
            self.pos += 1;
        }
        let flags = &self.src[flags_start..self.pos];

        // Both slices sit between ASCII delimiters of a &str, so they stay
        // valid UTF-8.
        let body = std::str::from_utf8(body).expect("program text is UTF-8");
        let flags = std::str::from_utf8(flags).expect("flags are ASCII");
        let source = if sep == b'"' || sep == b'\'' {
            regex::escape(body)
        } else {
            body.to_string()
        };
        Pattern::compile(&source, flags).map_err(|e| self.err_at(pos, e))
    }

    /// Scans a string-literal body up to the closing quote and decodes its
    /// escapes. The opening quote has already been consumed.
    fn scan_string(&mut self) -> Result<Vec<u8>, ParseError> {
        let pos = self.pos;
        let body = self
            .take_delimited(b'"')
            .ok_or_else(|| self.err_at(pos, ParseErrorKind::UnterminatedString))?;
        unquote(body).map_err(|e| self.err_at(pos, e))
    }

    /// Consumes bytes up to an unescaped `sep`, returning the body with any
    /// escapes intact. `None` when the separator never appears.
    fn take_delimited(&mut self, sep: u8) -> Option<&'a [u8]> {
        let start = self.pos;
        let mut i = start;
        while i < self.src.len() {
            let b = self.src[i];
            if b == b'\\' {
                i += 2;
            } else if b == sep {
                self.pos = i + 1;
                return Some(&self.src[start..i]);
            } else {
                i += 1;
            }
        }
        None
    }
}
