// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

//! Shared harness for command-level tests: every case is parsed, rendered
//! back, and run in batch mode, in one read, byte by byte, and with the
//! smallest buffer growth step, all of which must agree.

use std::{
    collections::VecDeque,
    io::{self, Cursor, Read},
};

use bstr::BString;
use pretty_assertions::assert_eq;

use crate::builder::build;
use crate::command::render;
use crate::environment::SharedBuf;
use crate::parser::parse;
use crate::processor::ProcessError;

pub(crate) struct CmdCase {
    pub name: &'static str,
    pub cmd: &'static str,
    /// Expected chain rendering when fusion makes it differ from `cmd`.
    pub proc: Option<&'static str>,
    pub input: &'static [u8],
    pub output: &'static [u8],
}

pub(crate) fn cases(cases: &[CmdCase]) {
    for case in cases {
        run_case(case);
    }
}

fn run_case(case: &CmdCase) {
    let atoms =
        parse(case.cmd).unwrap_or_else(|e| panic!("{}: parse {:?}: {e}", case.name, case.cmd));
    assert_eq!(
        render(&atoms),
        case.cmd,
        "{}: command should round-trip",
        case.name
    );
    let expect_proc = case.proc.unwrap_or(case.cmd);

    // Batch mode: the whole input as one finished region.
    let out = SharedBuf::default();
    let mut pipeline =
        build(&atoms, out.clone()).unwrap_or_else(|e| panic!("{}: build: {e}", case.name));
    assert_eq!(
        pipeline.to_string(),
        expect_proc,
        "{}: built chain should render",
        case.name
    );
    pipeline
        .process(Some(case.input), true)
        .unwrap_or_else(|e| panic!("{}: batch: {e}", case.name));
    pipeline.finish().unwrap();
    check_output(case, "batch", &out);

    // Streaming: one whole read, then one byte per read, then the smallest
    // buffer growth step. All must be byte-identical to batch mode.
    run_streaming(case, "one-shot read", Cursor::new(case.input), None);
    run_streaming(case, "byte-at-a-time", OneByteReader::new(case.input), None);
    run_streaming(case, "min_read=1", Cursor::new(case.input), Some(1));
}

fn run_streaming<R: Read>(case: &CmdCase, mode: &str, reader: R, min_read: Option<usize>) {
    let atoms = parse(case.cmd).unwrap();
    let out = SharedBuf::default();
    let mut pipeline = build(&atoms, out.clone()).unwrap();
    if let Some(min_read) = min_read {
        pipeline.set_min_read(min_read);
    }
    pipeline
        .read_from(reader)
        .unwrap_or_else(|e| panic!("{}: {mode}: {e}", case.name));
    pipeline.finish().unwrap();
    check_output(case, mode, &out);
}

fn check_output(case: &CmdCase, mode: &str, out: &SharedBuf) {
    assert_eq!(
        BString::from(out.contents()),
        BString::from(case.output),
        "{}: {mode} output",
        case.name
    );
}

/// A scripted reader: byte chunks interleaved with read errors, for pinning
/// how much output survives a failure.
pub(crate) struct FixtureReader {
    steps: VecDeque<Step>,
}

pub(crate) enum Step {
    Chunk(&'static [u8]),
    Fail(&'static str),
}

impl FixtureReader {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> FixtureReader {
        FixtureReader {
            steps: steps.into_iter().collect(),
        }
    }
}

impl Read for FixtureReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.steps.pop_front() {
            None => Ok(0),
            Some(Step::Chunk(chunk)) => {
                assert!(chunk.len() <= buf.len(), "fixture chunk exceeds read buffer");
                buf[..chunk.len()].copy_from_slice(chunk);
                Ok(chunk.len())
            }
            Some(Step::Fail(msg)) => Err(io::Error::new(io::ErrorKind::Other, msg)),
        }
    }
}

/// Runs a command over a scripted reader and asserts both the surviving
/// output and the surfaced error.
pub(crate) fn error_case(
    cmd: &str,
    steps: impl IntoIterator<Item = Step>,
    expect_output: &[u8],
    expect_err: &str,
) {
    let atoms = parse(cmd).unwrap();
    let out = SharedBuf::default();
    let mut pipeline = build(&atoms, out.clone()).unwrap();
    let err = pipeline
        .read_from(FixtureReader::new(steps))
        .expect_err("scripted read error should surface");
    match err {
        ProcessError::Io(err) => assert_eq!(err.to_string(), expect_err),
        other => panic!("unexpected error kind: {other}"),
    }
    pipeline.finish().unwrap();
    assert_eq!(
        BString::from(out.contents()),
        BString::from(expect_output),
        "output before the error"
    );
}

/// Hands out one byte per read call, the worst-case chunking schedule.
pub(crate) struct OneByteReader {
    data: &'static [u8],
    pos: usize,
}

impl OneByteReader {
    pub(crate) fn new(data: &'static [u8]) -> OneByteReader {
        OneByteReader { data, pos: 0 }
    }
}

impl Read for OneByteReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.data.len() || buf.is_empty() {
            return Ok(0);
        }
        buf[0] = self.data[self.pos];
        self.pos += 1;
        Ok(1)
    }
}
