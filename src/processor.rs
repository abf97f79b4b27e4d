// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fmt::{self, Display, Formatter},
    io::{self, Read, Write},
};

use thiserror::Error;

use crate::buffer::{ReadBuf, Tail};
use crate::filter::FilterProc;
use crate::join::{JoinProc, SepWriter};
use crate::matcher::MatchProc;
use crate::output::{DelimProc, DelimWriter, FmtProc, FmtWriter, Writer};
use crate::split::SplitError;

/// An error raised while regions flow through a chain.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Split(#[from] SplitError),
}

/// One stage of a built pipeline. A closed set: every command form maps to
/// one variant, each owning its successor, so the chain is a linear owning
/// list rooted at the head.
#[derive(Debug)]
pub enum Proc<W> {
    Match(MatchProc<W>),
    Filter(FilterProc<W>),
    Fmt(FmtProc<W>),
    Delim(DelimProc<W>),
    Join(JoinProc<W>),
    SepWrite(SepWriter<W>),
    Write(Writer<W>),
    FmtWrite(FmtWriter<W>),
    DelimWrite(DelimWriter<W>),
}

impl<W: Write> Proc<W> {
    /// Batch entry: handles one region of the current scope. `None` with
    /// `last` set ends the scope; after that the stage starts a fresh one.
    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        match self {
            Proc::Match(p) => p.process(region, last),
            Proc::Filter(p) => p.process(region, last),
            Proc::Fmt(p) => p.process(region, last),
            Proc::Delim(p) => p.process(region, last),
            Proc::Join(p) => p.process(region, last),
            Proc::SepWrite(p) => p.process(region, last),
            Proc::Write(p) => p.process(region, last),
            Proc::FmtWrite(p) => p.process(region, last),
            Proc::DelimWrite(p) => p.process(region, last),
        }
    }

    pub(crate) fn set_min_read(&mut self, min_read: usize) {
        match self {
            Proc::Match(p) => p.set_min_read(min_read),
            Proc::Filter(p) => p.set_min_read(min_read),
            Proc::Fmt(p) => p.next.set_min_read(min_read),
            Proc::Delim(p) => p.next.set_min_read(min_read),
            Proc::Join(p) => p.set_min_read(min_read),
            Proc::SepWrite(_) | Proc::Write(_) | Proc::FmtWrite(_) | Proc::DelimWrite(_) => {}
        }
    }

    /// Flushes the terminal writer once a run is complete.
    pub(crate) fn finish(&mut self) -> io::Result<()> {
        match self {
            Proc::Match(p) => p.finish(),
            Proc::Filter(p) => p.finish(),
            Proc::Fmt(p) => p.next.finish(),
            Proc::Delim(p) => p.next.finish(),
            Proc::Join(p) => p.finish(),
            Proc::SepWrite(p) => p.finish(),
            Proc::Write(p) => p.finish(),
            Proc::FmtWrite(p) => p.finish(),
            Proc::DelimWrite(p) => p.finish(),
        }
    }
}

impl<W> Display for Proc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Proc::Match(p) => p.fmt(f),
            Proc::Filter(p) => p.fmt(f),
            Proc::Fmt(p) => p.fmt(f),
            Proc::Delim(p) => p.fmt(f),
            Proc::Join(p) => p.fmt(f),
            Proc::SepWrite(p) => p.fmt(f),
            Proc::Write(p) => p.fmt(f),
            Proc::FmtWrite(p) => p.fmt(f),
            Proc::DelimWrite(p) => p.fmt(f),
        }
    }
}

/// A built pipeline: the head processor plus the read-loop state used when
/// the head has no native streaming entry.
#[derive(Debug)]
pub struct Pipeline<W> {
    head: Proc<W>,
    adapt: ReadBuf,
}

impl<W: Write> Pipeline<W> {
    pub(crate) fn new(head: Proc<W>) -> Pipeline<W> {
        Pipeline {
            head,
            adapt: ReadBuf::new(),
        }
    }

    /// Drives the whole input through the pipeline.
    ///
    /// Match processors stream natively. A bare (or fused) writer at the
    /// head copies reader to writer directly, ignoring any per-region
    /// formatting request, which is meaningless on arbitrary read chunks.
    /// Anything else is driven by the generic read loop, which hands each
    /// buffer-load to the head and consumes it whole.
    pub fn read_from<R: Read>(&mut self, r: R) -> Result<u64, ProcessError> {
        let Pipeline { head, adapt } = self;
        match head {
            Proc::Match(mp) => mp.read_from(r),
            Proc::Write(w) => w.copy_from(r),
            Proc::FmtWrite(fw) => Writer::new(&mut fw.w).copy_from(r),
            Proc::DelimWrite(dw) => Writer::new(&mut dw.w).copy_from(r),
            head => adapt.process_from(r, |buf| {
                let last = buf.tail() != Tail::Open;
                let res = head.process(Some(buf.bytes()), last);
                let len = buf.len();
                buf.advance(len);
                res
            }),
        }
    }

    /// Batch entry, mainly for driving tests and in-memory regions.
    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        self.head.process(region, last)
    }

    /// Sets the read-buffer growth step for every stage.
    pub fn set_min_read(&mut self, min_read: usize) {
        self.adapt.set_min_read(min_read);
        self.head.set_min_read(min_read);
    }

    /// Flushes the output writer at the end of a run.
    pub fn finish(&mut self) -> io::Result<()> {
        self.head.finish()
    }
}

impl<W> Display for Pipeline<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.head.fmt(f)
    }
}
