// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fmt::{self, Display, Formatter},
    io::{self, Read, Write},
};

use crate::processor::{Proc, ProcessError};
use crate::quote::{quote, FormatStr};

/// Mid-chain `p%"fmt"`: renders each region through the format string into
/// a scratch buffer for the successor.
#[derive(Debug)]
pub struct FmtProc<W> {
    pub(crate) fmt: FormatStr,
    tmp: Vec<u8>,
    pub(crate) next: Box<Proc<W>>,
}

impl<W: Write> FmtProc<W> {
    pub fn new(fmt: FormatStr, next: Proc<W>) -> FmtProc<W> {
        FmtProc {
            fmt,
            tmp: Vec::new(),
            next: Box::new(next),
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        let Some(buf) = region else {
            return self.next.process(None, last);
        };
        let FmtProc { fmt, tmp, next } = self;
        fmt.format_into(tmp, buf);
        next.process(Some(tmp.as_slice()), last)
    }
}

/// Mid-chain `p"delim"`: appends the delimiter to each region.
#[derive(Debug)]
pub struct DelimProc<W> {
    pub(crate) delim: Vec<u8>,
    tmp: Vec<u8>,
    pub(crate) next: Box<Proc<W>>,
}

impl<W: Write> DelimProc<W> {
    pub fn new(delim: Vec<u8>, next: Proc<W>) -> DelimProc<W> {
        DelimProc {
            delim,
            tmp: Vec::new(),
            next: Box::new(next),
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, last: bool) -> Result<(), ProcessError> {
        let Some(buf) = region else {
            return self.next.process(None, last);
        };
        let DelimProc { delim, tmp, next } = self;
        tmp.clear();
        tmp.extend_from_slice(buf);
        tmp.extend_from_slice(delim);
        next.process(Some(tmp.as_slice()), last)
    }
}

/// The terminal writer: regions go to the output as-is. At the head of a
/// chain this degrades to a straight reader-to-writer copy.
#[derive(Debug)]
pub struct Writer<W> {
    pub(crate) w: W,
}

impl<W: Write> Writer<W> {
    pub fn new(w: W) -> Writer<W> {
        Writer { w }
    }

    pub fn process(&mut self, region: Option<&[u8]>, _last: bool) -> Result<(), ProcessError> {
        match region {
            Some(buf) => Ok(self.w.write_all(buf)?),
            None => Ok(()),
        }
    }

    pub(crate) fn copy_from<R: Read>(&mut self, mut r: R) -> Result<u64, ProcessError> {
        Ok(io::copy(&mut r, &mut self.w)?)
    }

    pub(crate) fn finish(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

/// `p%"fmt"` fused with the writer: formats straight into the output.
#[derive(Debug)]
pub struct FmtWriter<W> {
    pub(crate) fmt: FormatStr,
    tmp: Vec<u8>,
    pub(crate) w: W,
}

impl<W: Write> FmtWriter<W> {
    pub fn new(fmt: FormatStr, w: W) -> FmtWriter<W> {
        FmtWriter {
            fmt,
            tmp: Vec::new(),
            w,
        }
    }

    pub fn process(&mut self, region: Option<&[u8]>, _last: bool) -> Result<(), ProcessError> {
        let Some(buf) = region else {
            return Ok(());
        };
        self.fmt.format_into(&mut self.tmp, buf);
        Ok(self.w.write_all(&self.tmp)?)
    }

    pub(crate) fn finish(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

/// `p"delim"` fused with the writer.
#[derive(Debug)]
pub struct DelimWriter<W> {
    pub(crate) delim: Vec<u8>,
    pub(crate) w: W,
}

impl<W: Write> DelimWriter<W> {
    pub fn new(delim: Vec<u8>, w: W) -> DelimWriter<W> {
        DelimWriter { delim, w }
    }

    pub fn process(&mut self, region: Option<&[u8]>, _last: bool) -> Result<(), ProcessError> {
        let Some(buf) = region else {
            return Ok(());
        };
        self.w.write_all(buf)?;
        Ok(self.w.write_all(&self.delim)?)
    }

    pub(crate) fn finish(&mut self) -> io::Result<()> {
        self.w.flush()
    }
}

impl<W> Display for FmtProc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "p%{} {}", self.fmt, self.next)
    }
}

impl<W> Display for DelimProc<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "p{} {}", quote(&self.delim), self.next)
    }
}

impl<W> Display for Writer<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("p")
    }
}

impl<W> Display for FmtWriter<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "p%{}", self.fmt)
    }
}

impl<W> Display for DelimWriter<W> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", quote(&self.delim))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::builder::build;
    use crate::parser::parse;
    use crate::processor::ProcessError;
    use crate::testutil::{cases, CmdCase};

    const SENTENCE: &[u8] = b"This is a sentence, with a comma; it's in a\nparagraph too.\n";

    #[test]
    fn degrades_to_cat() {
        cases(&[CmdCase {
            name: "degrades to cat",
            cmd: "p",
            proc: None,
            input: SENTENCE,
            output: SENTENCE,
        }]);
    }

    #[test]
    fn print_fusion() {
        cases(&[
            CmdCase {
                name: "delim + delim",
                cmd: r#"y/\n\n/ x/\w+/ p"," p"\n""#,
                proc: Some(r#"y/\n\n/ x/\w+/ p",\n""#),
                input: b"it's in a\nparagraph too.\n",
                output: b"it,\ns,\nin,\na,\nparagraph,\ntoo,\n",
            },
            CmdCase {
                name: "fmt + delim",
                cmd: r#"y/\n\n/ x/\w+/ p%"%q" p"\n""#,
                proc: Some(r#"y/\n\n/ x/\w+/ p%"%q\n""#),
                input: b"foo bar",
                output: b"\"foo\"\n\"bar\"\n",
            },
            CmdCase {
                name: "delim + fmt",
                cmd: r#"y/\n\n/ x/\w+/ p"," p%"%q\n""#,
                proc: None,
                input: b"foo bar",
                output: b"\"foo,\"\n\"bar,\"\n",
            },
            CmdCase {
                name: "fmt + fmt",
                cmd: r#"y/\n\n/ x/\w+/ p%"%q" p%"- %s\n""#,
                proc: None,
                input: b"foo bar",
                output: b"- \"foo\"\n- \"bar\"\n",
            },
            CmdCase {
                name: "delim + delim + more chain",
                cmd: r#"y/\n\n/ x/\w+/ p"," p"\n" y/\n/ p"\n""#,
                proc: Some(r#"y/\n\n/ x/\w+/ p",\n" y/\n/ p"\n""#),
                input: b"foo bar",
                output: b"foo,\nbar,\n",
            },
            CmdCase {
                name: "fmt + delim + more chain",
                cmd: r#"y/\n\n/ x/\w+/ p%"%q" p"\n" y/\n/ p"\n""#,
                proc: Some(r#"y/\n\n/ x/\w+/ p%"%q\n" y/\n/ p"\n""#),
                input: b"foo bar",
                output: b"\"foo\"\n\"bar\"\n",
            },
            CmdCase {
                name: "delim + fmt + more chain",
                cmd: r#"y/\n\n/ x/\w+/ p"," p%"%q\n" y/\n/ p"\n""#,
                proc: None,
                input: b"foo bar",
                output: b"\"foo,\"\n\"bar,\"\n",
            },
        ]);
    }

    #[test]
    fn write_errors_halt_processing() {
        struct FailingSink;
        impl std::io::Write for FailingSink {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "sink gone"))
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let atoms = parse(r#"x/\w+/ p"\n""#).unwrap();
        let mut pipeline = build(&atoms, FailingSink).unwrap();
        let err = pipeline
            .read_from(std::io::Cursor::new(b"one two".to_vec()))
            .expect_err("sink failure should surface");
        match err {
            ProcessError::Io(err) => assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe),
            other => panic!("unexpected error kind: {other}"),
        }
    }
}
