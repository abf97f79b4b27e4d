// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fmt::{self, Display, Formatter},
    io::Write,
};

use crate::command::Pattern;
use crate::processor::{Proc, ProcessError};

/// `g`/`v`: gates regions on a pattern without altering them.
#[derive(Debug)]
pub struct FilterProc<W> {
    pat: Pattern,
    negate: bool,
    next: Box<Proc<W>>,
}

impl<W: Write> FilterProc<W> {
    pub fn new(pat: Pattern, negate: bool, next: Proc<W>) -> FilterProc<W> {
        FilterProc {
            pat,
            negate,
            next: Box::new(next),
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        match region {
            None => self.next.process(None, last),
            Some(buf) if self.pat.regex().is_match(buf) != self.negate => {
                self.next.process(Some(buf), last)
            }
            // A suppressed region still ends its scope: downstream
            // accumulators have to flush.
            Some(_) if last => self.next.process(None, true),
            Some(_) => Ok(()),
        }
    }

    pub(crate) fn set_min_read(&mut self, min_read: usize) {
        self.next.set_min_read(min_read);
    }

    pub(crate) fn finish(&mut self) -> std::io::Result<()> {
        self.next.finish()
    }
}

impl<W> Display for FilterProc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let letter = if self.negate { 'v' } else { 'g' };
        write!(f, "{letter}{} {}", self.pat, self.next)
    }
}

#[cfg(test)]
mod tests {
    use crate::testutil::{cases, CmdCase};

    const CAT_ADJACENT_THINGS: &[u8] =
        b"bird\ncat\ndog\nbobcat\nfox\ncantaloupe\ngrumpy cat\nbook\ncatalog\ncab\ntruck\ncar\n";

    #[test]
    fn finding_cats() {
        cases(&[CmdCase {
            name: "finding cats",
            cmd: r#"y"\n" g/cat/ p"\n""#,
            proc: None,
            input: CAT_ADJACENT_THINGS,
            output: b"cat\nbobcat\ngrumpy cat\ncatalog\n",
        }]);
    }

    #[test]
    fn excising_cats() {
        cases(&[CmdCase {
            name: "excising cats",
            cmd: r#"y"\n" v/cat/ p"\n""#,
            proc: None,
            input: CAT_ADJACENT_THINGS,
            output: b"bird\ndog\nfox\ncantaloupe\nbook\ncab\ntruck\ncar\n",
        }]);
    }

    #[test]
    fn suppressed_last_region_still_ends_the_scope() {
        // The final line fails the filter, but the join downstream must
        // still flush its scope.
        cases(&[CmdCase {
            name: "suppressed last",
            cmd: r#"y"\n" v/skip/ j, p"\n""#,
            proc: None,
            input: b"one\ntwo\nskip me\n",
            output: b"one,two\n",
        }]);
    }

    #[test]
    fn case_insensitive_filter() {
        cases(&[CmdCase {
            name: "case-insensitive",
            cmd: r#"y"\n" g/cat/i p"\n""#,
            proc: None,
            input: b"Cat\ndog\nCATALOG\n",
            output: b"Cat\nCATALOG\n",
        }]);
    }
}
