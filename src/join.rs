// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fmt::{self, Display, Formatter},
    io::Write,
};

use crate::command::Join;
use crate::processor::{Proc, ProcessError};

/// `j`: accumulates every region of a scope into one, inserting the
/// separator between regions but not before the first. The scope's `last`
/// triggers emission and a reset.
#[derive(Debug)]
pub struct JoinProc<W> {
    atom: Join,
    sep: Vec<u8>,
    tmp: Vec<u8>,
    first: bool,
    next: Box<Proc<W>>,
}

impl<W: Write> JoinProc<W> {
    pub fn new(atom: Join, next: Proc<W>) -> JoinProc<W> {
        let sep = sep_bytes(&atom);
        JoinProc {
            atom,
            sep,
            tmp: Vec::new(),
            first: true,
            next: Box::new(next),
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        if let Some(buf) = region {
            if !self.first {
                self.tmp.extend_from_slice(&self.sep);
            }
            self.first = false;
            self.tmp.extend_from_slice(buf);
        }
        if !last {
            return Ok(());
        }
        let res = if self.first {
            // An empty scope: nothing to emit, but the end still travels.
            self.next.process(None, true)
        } else {
            let JoinProc { tmp, next, .. } = self;
            next.process(Some(tmp.as_slice()), true)
        };
        self.tmp.clear();
        self.first = true;
        res
    }

    pub(crate) fn set_min_read(&mut self, min_read: usize) {
        self.next.set_min_read(min_read);
    }

    pub(crate) fn finish(&mut self) -> std::io::Result<()> {
        self.next.finish()
    }
}

/// `j` fused with the writer: streams regions straight out, tracking
/// whether a separator is due instead of buffering the scope.
#[derive(Debug)]
pub struct SepWriter<W> {
    atom: Join,
    sep: Vec<u8>,
    first: bool,
    pub(crate) w: W,
}

impl<W: Write> SepWriter<W> {
    pub fn new(atom: Join, w: W) -> SepWriter<W> {
        let sep = sep_bytes(&atom);
        SepWriter {
            atom,
            sep,
            first: true,
            w,
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        let res = match region {
            Some(buf) => {
                if !self.first {
                    self.w.write_all(&self.sep)?;
                }
                self.first = false;
                self.w.write_all(buf).map_err(ProcessError::from)
            }
            None => Ok(()),
        };
        if last {
            self.first = true;
        }
        res
    }

    pub(crate) fn finish(&mut self) -> std::io::Result<()> {
        self.w.flush()
    }
}

fn sep_bytes(atom: &Join) -> Vec<u8> {
    match atom {
        Join::Concat => Vec::new(),
        Join::ByteSep(b) => vec![*b],
        Join::StringSep(s) => s.clone(),
    }
}

impl<W> Display for JoinProc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.atom, self.next)
    }
}

impl<W> Display for SepWriter<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.atom.fmt(f)
    }
}
