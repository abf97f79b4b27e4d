// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::fmt::{self, Display, Formatter};

use memchr::memchr;
use thiserror::Error;

/// An error from decoding a double-quoted string literal.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum QuoteError {
    #[error("escape sequence cut short")]
    UnterminatedEscape,
    #[error("invalid escape sequence")]
    InvalidEscape,
    #[error("invalid digit in octal escape sequence")]
    InvalidOctalDigit,
    #[error("octal escape sequence overflows a byte")]
    OctalOverflow,
    #[error("invalid digit in hex escape sequence")]
    InvalidHexDigit,
    #[error("escape sequence is not a valid code point")]
    InvalidCodePoint,
}

/// An error from compiling a `p%` format string.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum FormatError {
    #[error("format string has no region verb")]
    NoVerb,
    #[error("format string has more than one region verb")]
    MultipleVerbs,
    #[error("unknown format verb '%{}'", char::from(*.0))]
    UnknownVerb(u8),
    #[error("format string ends with a bare '%'")]
    DanglingPercent,
}

/// Decodes the body of a double-quoted string literal (the text between the
/// quotes). Escape sequences follow the usual C/Go set: `\a \b \f \n \r \t
/// \v \\ \" \'`, three-digit octal, `\xHH`, `\uNNNN`, and `\UNNNNNNNN`.
pub fn unquote(s: &[u8]) -> Result<Vec<u8>, QuoteError> {
    type Error = QuoteError;
    let mut buf = Vec::with_capacity(s.len());
    let mut i = 0;
    while let Some(j) = memchr(b'\\', &s[i..]) {
        let j = i + j;
        buf.extend_from_slice(&s[i..j]);
        let esc = *s.get(j + 1).ok_or(Error::UnterminatedEscape)?;
        i = j + 2;
        let ch = match esc {
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => 0x0b,

            ch @ (b'\\' | b'"' | b'\'') => ch,

            o1 @ b'0'..=b'3' => {
                let rest = s.get(i..i + 2).ok_or(Error::UnterminatedEscape)?;
                i += 2;
                let (o2, o3) = (rest[0], rest[1]);
                if !(b'0'..=b'7').contains(&o2) || !(b'0'..=b'7').contains(&o3) {
                    return Err(Error::InvalidOctalDigit);
                }
                (o1 - b'0') << 6 | (o2 - b'0') << 3 | (o3 - b'0')
            }
            b'4'..=b'7' => return Err(Error::OctalOverflow),

            b'x' => {
                let rest = s.get(i..i + 2).ok_or(Error::UnterminatedEscape)?;
                i += 2;
                (hex_digit(rest[0])? << 4) | hex_digit(rest[1])?
            }

            b'u' | b'U' => {
                let n = if esc == b'u' { 4 } else { 8 };
                let rest = s.get(i..i + n).ok_or(Error::UnterminatedEscape)?;
                i += n;
                let mut v: u32 = 0;
                for &d in rest {
                    v = v << 4 | u32::from(hex_digit(d)?);
                }
                let ch = char::from_u32(v).ok_or(Error::InvalidCodePoint)?;
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                continue;
            }

            _ => return Err(Error::InvalidEscape),
        };
        buf.push(ch);
    }
    buf.extend_from_slice(&s[i..]);
    Ok(buf)
}

/// Appends a double-quoted rendering of `bytes` to `out`, in the style of
/// Go's `strconv.Quote`: named escapes for the common control characters,
/// `\xHH` for everything else non-printable.
pub fn quote_into(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'"');
    for &b in bytes {
        match b {
            0x07 => out.extend_from_slice(b"\\a"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x0b => out.extend_from_slice(b"\\v"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x20..=0x7e => out.push(b),
            _ => {
                out.extend_from_slice(b"\\x");
                out.push(HEX[usize::from(b >> 4)]);
                out.push(HEX[usize::from(b & 0xf)]);
            }
        }
    }
    out.push(b'"');
}

/// Quotes `bytes` into a fresh string.
pub fn quote(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    quote_into(&mut out, bytes);
    // quote_into only emits ASCII.
    String::from_utf8(out).expect("quoted bytes are ASCII")
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn hex_digit(d: u8) -> Result<u8, QuoteError> {
    match d {
        b'0'..=b'9' => Ok(d - b'0'),
        b'a'..=b'f' => Ok(d - b'a' + 10),
        b'A'..=b'F' => Ok(d - b'A' + 10),
        _ => Err(QuoteError::InvalidHexDigit),
    }
}

/// The verb of a format string, selecting how the matched region is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verb {
    /// `%s`: the raw bytes.
    Raw,
    /// `%q`: the bytes double-quoted as by [`quote`].
    Quoted,
    /// `%x`: lowercase hex.
    Hex,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Seg {
    Lit(Vec<u8>),
    Verb(Verb),
}

/// A compiled `p%"…"` format string: literal text around exactly one region
/// verb. `%%` escapes a literal percent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatStr {
    /// The format text as written, kept for rendering the atom back out.
    text: Vec<u8>,
    segs: Vec<Seg>,
}

impl FormatStr {
    /// Compiles a decoded format-string body. Exactly one region verb is
    /// required.
    pub fn compile(text: &[u8]) -> Result<FormatStr, FormatError> {
        let mut segs = Vec::new();
        let mut lit = Vec::new();
        let mut verbs = 0usize;
        let mut i = 0;
        while let Some(j) = memchr(b'%', &text[i..]) {
            let j = i + j;
            lit.extend_from_slice(&text[i..j]);
            let v = *text.get(j + 1).ok_or(FormatError::DanglingPercent)?;
            i = j + 2;
            match v {
                b'%' => lit.push(b'%'),
                b's' | b'q' | b'x' => {
                    verbs += 1;
                    if verbs > 1 {
                        return Err(FormatError::MultipleVerbs);
                    }
                    if !lit.is_empty() {
                        segs.push(Seg::Lit(std::mem::take(&mut lit)));
                    }
                    segs.push(Seg::Verb(match v {
                        b's' => Verb::Raw,
                        b'q' => Verb::Quoted,
                        _ => Verb::Hex,
                    }));
                }
                _ => return Err(FormatError::UnknownVerb(v)),
            }
        }
        lit.extend_from_slice(&text[i..]);
        if !lit.is_empty() {
            segs.push(Seg::Lit(lit));
        }
        if verbs == 0 {
            return Err(FormatError::NoVerb);
        }
        Ok(FormatStr {
            text: text.to_vec(),
            segs,
        })
    }

    /// Appends literal trailing text, escaping `%` so no new verb can appear.
    /// Used when a following delimiter print fuses into this format.
    pub fn push_literal(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if b == b'%' {
                self.text.extend_from_slice(b"%%");
            } else {
                self.text.push(b);
            }
        }
        let mut lit = bytes.to_vec();
        match self.segs.last_mut() {
            Some(Seg::Lit(tail)) => tail.append(&mut lit),
            _ => self.segs.push(Seg::Lit(lit)),
        }
    }

    /// Formats `region` into `out`, which is cleared first.
    pub fn format_into(&self, out: &mut Vec<u8>, region: &[u8]) {
        out.clear();
        for seg in &self.segs {
            match seg {
                Seg::Lit(lit) => out.extend_from_slice(lit),
                Seg::Verb(Verb::Raw) => out.extend_from_slice(region),
                Seg::Verb(Verb::Quoted) => quote_into(out, region),
                Seg::Verb(Verb::Hex) => {
                    for &b in region {
                        out.push(HEX[usize::from(b >> 4)]);
                        out.push(HEX[usize::from(b & 0xf)]);
                    }
                }
            }
        }
    }

    /// The format text as written (escapes intact).
    pub fn text(&self) -> &[u8] {
        &self.text
    }
}

impl Display for FormatStr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.text))
    }
}
