// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fmt::{self, Display, Formatter},
    io::Read,
    mem,
};

use crate::between::{BetweenBalanced, BetweenPair, BetweenRe, BetweenSplit};
use crate::buffer::{ReadBuf, Tail};
use crate::extract::{ExtractBalanced, ExtractRe, ExtractSub};
use crate::processor::{Proc, ProcessError};

/// One matching step over the current window of unread bytes.
///
/// Offsets are relative to the start of the window. `start..end` is the
/// region to yield; `next` is where matching resumes, which may lie past
/// `end` for matchers that skip a trailing delimiter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scan {
    /// Nothing matched in this window; wait for more input.
    None,
    /// One match.
    Loc { start: usize, end: usize, next: usize },
    /// No delimiter will match again: emit any pending region, then the
    /// rest of the window as the final region of the scope.
    Trailer,
}

/// The find-one-match logic pluggable into a [`MatchProc`]. A closed set;
/// dispatch stays a simple `match`.
#[derive(Clone, Debug)]
pub enum Matcher {
    ExtractRe(ExtractRe),
    ExtractSub(ExtractSub),
    ExtractBalanced(ExtractBalanced),
    BetweenRe(BetweenRe),
    BetweenPair(BetweenPair),
    BetweenBalanced(BetweenBalanced),
    BetweenSplit(BetweenSplit),
}

impl Matcher {
    fn scan(&mut self, window: &[u8], at_eof: bool) -> Result<Scan, ProcessError> {
        match self {
            Matcher::ExtractRe(m) => Ok(m.scan(window)),
            Matcher::ExtractSub(m) => Ok(m.scan(window, at_eof)),
            Matcher::ExtractBalanced(m) => Ok(m.scan(window, at_eof)),
            Matcher::BetweenRe(m) => Ok(m.scan(window, at_eof)),
            Matcher::BetweenPair(m) => Ok(m.scan(window, at_eof)),
            Matcher::BetweenBalanced(m) => Ok(m.scan(window)),
            Matcher::BetweenSplit(m) => m.scan(window, at_eof).map_err(ProcessError::from),
        }
    }
}

impl Display for Matcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::ExtractRe(m) => m.fmt(f),
            Matcher::ExtractSub(m) => m.fmt(f),
            Matcher::ExtractBalanced(m) => m.fmt(f),
            Matcher::BetweenRe(m) => m.fmt(f),
            Matcher::BetweenPair(m) => m.fmt(f),
            Matcher::BetweenBalanced(m) => m.fmt(f),
            Matcher::BetweenSplit(m) => m.fmt(f),
        }
    }
}

/// The pending match: one step of lookahead, held until the processor knows
/// whether another match follows. Offsets are relative to the read cursor;
/// the region is `0..end` and matching resumes at `next`.
#[derive(Clone, Copy, Debug)]
struct Pending {
    end: usize,
    next: usize,
}

/// Drives a [`Matcher`] over a read buffer, turning its matches into regions
/// for the downstream processor. Implements both the batch entry (each
/// region is a complete scope) and the streaming entry.
#[derive(Debug)]
pub struct MatchProc<W> {
    matcher: Matcher,
    buf: ReadBuf,
    pend: Option<Pending>,
    flushed: bool,
    next: Box<Proc<W>>,
}

impl<W: std::io::Write> MatchProc<W> {
    pub fn new(matcher: Matcher, next: Proc<W>) -> MatchProc<W> {
        MatchProc {
            matcher,
            buf: ReadBuf::new(),
            pend: None,
            flushed: false,
            next: Box::new(next),
        }
    }

    /// Batch entry: processes one finished region as a complete scope.
    /// A `None` region is the scope-end signal and passes straight through.
    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        let Some(region) = region else {
            return self.next.process(None, last);
        };
        self.pend = None;
        self.flushed = false;
        let mut buf = mem::take(&mut self.buf);
        let res = buf.process_in(region, |buf| self.run(buf));
        self.buf = buf;
        res
    }

    /// Streaming entry: reads the input to exhaustion, matching as bytes
    /// arrive.
    pub fn read_from<R: Read>(&mut self, r: R) -> Result<u64, ProcessError> {
        self.pend = None;
        self.flushed = false;
        let mut buf = mem::take(&mut self.buf);
        let res = buf.process_from(r, |buf| self.run(buf));
        self.buf = buf;
        res
    }

    /// One round of matching over whatever the buffer holds. Called once
    /// after every read (and once for a batch region).
    fn run(&mut self, buf: &mut ReadBuf) -> Result<(), ProcessError> {
        loop {
            let rel = self.pend.map_or(0, |p| p.next);
            if rel >= buf.len() {
                break;
            }
            let scan = {
                let window = &buf.bytes()[rel..];
                match self.matcher.scan(window, buf.at_eof()) {
                    Ok(scan) => scan,
                    Err(err) => {
                        // Matcher failed: flush what we were holding, then
                        // let the error through.
                        let _ = self.proc_prior(buf, false);
                        return Err(err);
                    }
                }
            };
            match scan {
                Scan::None => break,
                Scan::Trailer => self.flush_trailer(buf)?,
                Scan::Loc { start, end, next } => {
                    self.push_loc(buf, start, end, next)?;
                    if next == 0 {
                        // No forward progress; need more bytes.
                        break;
                    }
                    // A match that ran into the end of the buffer may still
                    // grow (a longer word, a greedier delimiter). Forget it
                    // so it re-matches once the tail is settled, but only
                    // when the re-match can actually reproduce it: from the
                    // window start (start == 0) or from the yield itself
                    // (end == next). A matcher that consumed leading
                    // context has nothing left to re-derive the match from.
                    if start == 0 || end == next {
                        if let Some(p) = self.pend {
                            if p.next >= buf.len() && !buf.at_eof() {
                                self.pend = None;
                                break;
                            }
                        }
                    }
                }
            }
        }
        match buf.tail() {
            Tail::Open => Ok(()),
            Tail::Eof => self.flush(buf),
            Tail::Failed => self.proc_prior(buf, false),
        }
    }

    /// Accepts a new match. The prior pending match is emitted first (it is
    /// now known not to be the last of its scope), then the new location is
    /// installed relative to the advanced cursor.
    fn push_loc(
        &mut self,
        buf: &mut ReadBuf,
        start: usize,
        end: usize,
        next: usize,
    ) -> Result<(), ProcessError> {
        debug_assert!(start <= end && start <= next, "matcher location out of order");
        let res = self.proc_prior(buf, false);
        buf.advance(start);
        if res.is_ok() {
            self.pend = Some(Pending {
                end: end - start,
                next: next - start,
            });
        }
        res
    }

    /// Emits the pending region (if any) downstream and advances past it.
    /// With `last` set, an absent pending region is still signalled as a
    /// scope end.
    fn proc_prior(&mut self, buf: &mut ReadBuf, last: bool) -> Result<(), ProcessError> {
        let (advance, token_end) = match self.pend.take() {
            Some(p) => (p.next, Some(p.end)),
            None => (0, None),
        };
        let res = match token_end {
            Some(end) => self.next.process(Some(&buf.bytes()[..end]), last),
            None if last => self.next.process(None, true),
            None => Ok(()),
        };
        buf.advance(advance);
        res
    }

    /// EOF flush: the pending region was the last of its scope.
    fn flush(&mut self, buf: &mut ReadBuf) -> Result<(), ProcessError> {
        if self.flushed || self.pend.is_none() {
            return Ok(());
        }
        self.flushed = true;
        self.proc_prior(buf, true)
    }

    /// EOF flush for matchers that yield the span before a delimiter: emit
    /// the pending region, then whatever trails the final delimiter as the
    /// last region of the scope.
    fn flush_trailer(&mut self, buf: &mut ReadBuf) -> Result<(), ProcessError> {
        self.proc_prior(buf, false)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.flushed = true;
        let len = buf.len();
        let res = self.next.process(Some(buf.bytes()), true);
        buf.advance(len);
        res
    }

    pub(crate) fn set_min_read(&mut self, min_read: usize) {
        self.buf.set_min_read(min_read);
        self.next.set_min_read(min_read);
    }

    pub(crate) fn finish(&mut self) -> std::io::Result<()> {
        self.next.finish()
    }
}

impl<W> Display for MatchProc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.matcher, self.next)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::builder::build;
    use crate::environment::SharedBuf;
    use crate::parser::parse;
    use crate::testutil::{error_case, Step};

    const CMD: &str = r#"x/\w+/ p%"%q\n""#;

    #[test]
    fn initial_read_error() {
        error_case(
            CMD,
            [Step::Fail("bang"), Step::Chunk(b"bob lob law")],
            b"",
            "bang",
        );
    }

    #[test]
    fn error_between_words() {
        // Everything before the failure that is known complete is emitted;
        // the pending word is flushed without ending the scope.
        error_case(
            CMD,
            [Step::Chunk(b"bob lob law,"), Step::Fail("bang")],
            b"\"bob\"\n\"lob\"\n\"law\"\n",
            "bang",
        );
    }

    #[test]
    fn mid_word_error_drops_the_torn_word() {
        // "l" might have continued in the unread tail, so it is withheld.
        error_case(
            CMD,
            [
                Step::Chunk(b"bob l"),
                Step::Fail("bang"),
                Step::Chunk(b"ob law"),
            ],
            b"\"bob\"\n",
            "bang",
        );
    }

    #[test]
    fn word_abutting_error_is_withheld() {
        // "law" reaches the buffer end with no EOF in sight; whether it was
        // complete is unknowable, so it is not committed.
        error_case(
            CMD,
            [Step::Chunk(b"bob lob law"), Step::Fail("bang")],
            b"\"bob\"\n\"lob\"\n",
            "bang",
        );
    }

    #[test]
    fn final_error_after_full_input() {
        error_case(
            CMD,
            [Step::Chunk(b"bob lob law, bla blab bib."), Step::Fail("bang")],
            b"\"bob\"\n\"lob\"\n\"law\"\n\"bla\"\n\"blab\"\n\"bib\"\n",
            "bang",
        );
    }

    #[test]
    fn scope_resets_after_last() {
        // After (None, last) the processor starts a fresh scope: reusing
        // the pipeline for a second input must not leak the first's state.
        let atoms = parse(r#"y"\n" j, p"\n""#).unwrap();
        let out = SharedBuf::default();
        let mut pipeline = build(&atoms, out.clone()).unwrap();
        pipeline.process(Some(b"a\nb"), true).unwrap();
        pipeline.process(Some(b"c\nd"), true).unwrap();
        pipeline.finish().unwrap();
        assert_eq!(out.contents(), b"a,b\nc,d\n");
    }
}
