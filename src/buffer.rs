// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::io::{self, Read};

/// Default growth step for a read buffer.
pub const MIN_READ: usize = 64 * 1024;

/// What the buffer knows about the rest of its input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tail {
    /// More bytes may still arrive.
    Open,
    /// The reader reported end of input.
    Eof,
    /// The reader failed; the error is held for the driver to propagate.
    Failed,
}

/// An owned byte buffer fed from a reader, with a read cursor.
///
/// `bytes()` is the unread window `buf[off..]`. Consumers call `advance` for
/// however much they processed; whatever they leave becomes the prefix of
/// the next round. The buffer grows by reslicing, sliding the unread window
/// down, or reallocating with at least doubled capacity; it is never shrunk
/// in place.
#[derive(Debug)]
pub struct ReadBuf {
    buf: Vec<u8>,
    off: usize,
    tail: Tail,
    err: Option<io::Error>,
    min_read: usize,
}

impl Default for ReadBuf {
    fn default() -> Self {
        ReadBuf::new()
    }
}

impl ReadBuf {
    pub fn new() -> ReadBuf {
        ReadBuf {
            buf: Vec::new(),
            off: 0,
            tail: Tail::Open,
            err: None,
            min_read: MIN_READ,
        }
    }

    /// The unread window.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.buf[self.off..]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len() - self.off
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.off == self.buf.len()
    }

    /// Consumes `n` bytes from the front of the unread window.
    #[inline]
    pub fn advance(&mut self, n: usize) {
        debug_assert!(n <= self.len(), "advance past end of buffer");
        self.off += n;
    }

    /// Whether more input may arrive, and if not, why.
    #[inline]
    pub fn tail(&self) -> Tail {
        self.tail
    }

    #[inline]
    pub fn at_eof(&self) -> bool {
        self.tail == Tail::Eof
    }

    pub(crate) fn set_min_read(&mut self, min_read: usize) {
        assert!(min_read > 0, "min_read must be positive");
        self.min_read = min_read;
    }

    /// Implements the read/process loop shared by every streaming command:
    /// read a chunk, hand the buffer to `handle` exactly once per read, and
    /// repeat until the reader is exhausted or something fails.
    ///
    /// At EOF, `handle` is called one final time (it can observe this via
    /// [`ReadBuf::at_eof`]) and the total bytes read are returned. A reader
    /// error is surfaced after one last best-effort `handle` call.
    pub fn process_from<R, E, F>(&mut self, mut r: R, mut handle: F) -> Result<u64, E>
    where
        R: Read,
        E: From<io::Error>,
        F: FnMut(&mut ReadBuf) -> Result<(), E>,
    {
        self.buf.clear();
        self.off = 0;
        self.tail = Tail::Open;
        self.err = None;
        let mut total: u64 = 0;
        loop {
            match self.read_more(&mut r) {
                Ok(0) => self.tail = Tail::Eof,
                Ok(n) => total += n as u64,
                Err(err) => {
                    self.tail = Tail::Failed;
                    self.err = Some(err);
                }
            }
            let handled = handle(self);
            match self.tail {
                Tail::Open => handled?,
                Tail::Eof => {
                    handled?;
                    return Ok(total);
                }
                Tail::Failed => {
                    // The read error outranks whatever the handler hit while
                    // flushing.
                    let err = self.err.take().expect("read error recorded");
                    return Err(E::from(err));
                }
            }
        }
    }

    /// Presents one finished region as a fully-read stream, so the same
    /// handler serves batch and streaming calls alike.
    pub fn process_in<E, F>(&mut self, region: &[u8], handle: F) -> Result<(), E>
    where
        F: FnOnce(&mut ReadBuf) -> Result<(), E>,
    {
        self.buf.clear();
        self.off = 0;
        self.buf.extend_from_slice(region);
        self.tail = Tail::Eof;
        self.err = None;
        let res = handle(self);
        self.buf.clear();
        self.off = 0;
        res
    }

    fn read_more(&mut self, r: &mut impl Read) -> io::Result<usize> {
        self.reserve(self.min_read);
        let start = self.buf.len();
        self.buf.resize(start + self.min_read, 0);
        let res = loop {
            match r.read(&mut self.buf[start..]) {
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                res => break res,
            }
        };
        let n = match &res {
            Ok(n) => *n,
            Err(_) => 0,
        };
        debug_assert!(n <= self.min_read, "misbehaving Read implementation");
        self.buf.truncate(start + n);
        res
    }

    /// Makes room for `n` more bytes past the current end.
    fn reserve(&mut self, n: usize) {
        if self.off > 0 && self.off == self.buf.len() {
            // Buffer fully consumed; recover the space.
            self.buf.clear();
            self.off = 0;
        }
        if self.buf.len() + n <= self.buf.capacity() {
            return;
        }
        let live = self.buf.len() - self.off;
        if self.off > 0 && live + n <= self.buf.capacity() / 2 {
            // Slide the unread window down instead of reallocating. Only
            // done while it fills at most half the capacity, so we do not
            // spend all our time copying.
            self.buf.copy_within(self.off.., 0);
            self.buf.truncate(live);
            self.off = 0;
        } else {
            self.buf.reserve(self.buf.capacity() + n);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn process_from_accumulates_unconsumed_bytes() {
        let mut rb = ReadBuf::new();
        rb.set_min_read(4);
        let mut seen: Vec<Vec<u8>> = Vec::new();
        let n = rb
            .process_from::<_, io::Error, _>(Cursor::new(b"abcdefgh".to_vec()), |buf| {
                seen.push(buf.bytes().to_vec());
                // Consume one byte per round; the rest carries over.
                if !buf.is_empty() {
                    buf.advance(1);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(n, 8);
        assert_eq!(
            seen,
            vec![
                b"abcd".to_vec(),
                b"bcdefgh".to_vec(),
                b"cdefgh".to_vec(),
            ]
        );
    }

    #[test]
    fn final_round_reports_eof() {
        let mut rb = ReadBuf::new();
        rb.set_min_read(4);
        let mut tails = Vec::new();
        rb.process_from::<_, io::Error, _>(Cursor::new(b"abc".to_vec()), |buf| {
            tails.push(buf.tail());
            buf.advance(buf.len());
            Ok(())
        })
        .unwrap();
        assert_eq!(tails, vec![Tail::Open, Tail::Eof]);
    }

    #[test]
    fn process_in_is_a_finished_stream() {
        let mut rb = ReadBuf::new();
        rb.process_in::<io::Error, _>(b"region", |buf| {
            assert!(buf.at_eof());
            assert_eq!(buf.bytes(), b"region");
            buf.advance(buf.len());
            Ok(())
        })
        .unwrap();
        assert!(rb.is_empty());
    }

    #[test]
    fn read_error_after_final_handle() {
        struct Failing {
            given: bool,
        }
        impl Read for Failing {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.given {
                    Err(io::Error::new(io::ErrorKind::Other, "bang"))
                } else {
                    self.given = true;
                    buf[..3].copy_from_slice(b"abc");
                    Ok(3)
                }
            }
        }

        let mut rb = ReadBuf::new();
        rb.set_min_read(8);
        let mut rounds = 0;
        let err = rb
            .process_from::<_, io::Error, _>(Failing { given: false }, |buf| {
                rounds += 1;
                buf.advance(buf.len());
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.to_string(), "bang");
        assert_eq!(rounds, 2, "handler runs once more after the failed read");
    }

    #[test]
    fn growth_preserves_unread_window() {
        let mut rb = ReadBuf::new();
        rb.set_min_read(1);
        let input: Vec<u8> = (0u8..=200).collect();
        let mut out = Vec::new();
        rb.process_from::<_, io::Error, _>(Cursor::new(input.clone()), |buf| {
            if buf.at_eof() {
                out.extend_from_slice(buf.bytes());
                buf.advance(buf.len());
            }
            // Never consuming until EOF forces reslice, slide, and realloc.
            Ok(())
        })
        .unwrap();
        assert_eq!(out, input);
    }
}
