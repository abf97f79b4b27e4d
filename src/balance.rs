// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

/// A balanced bracket pair, named by its opening byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Pair {
    pub open: u8,
    pub close: u8,
}

impl Pair {
    /// Looks up the pair for an opening bracket byte.
    pub fn for_open(open: u8) -> Option<Pair> {
        let close = match open {
            b'[' => b']',
            b'{' => b'}',
            b'(' => b')',
            b'<' => b'>',
            _ => return None,
        };
        Some(Pair { open, close })
    }
}

/// Finds the first top-level balanced region in `buf`, returning the range
/// from the opening bracket through the closing bracket (inclusive).
///
/// A simple depth counter: no escape or quote awareness, so a close bracket
/// inside a string literal still counts. Unmatched close brackets reset the
/// depth to zero and are otherwise ignored.
pub fn scan_balanced(pair: Pair, buf: &[u8]) -> Option<(usize, usize)> {
    let mut level = 0usize;
    let mut start = 0usize;
    for (off, &b) in buf.iter().enumerate() {
        if b == pair.open {
            if level == 0 {
                start = off;
            }
            level += 1;
        } else if b == pair.close {
            match level {
                0 => {}
                1 => return Some((start, off + 1)),
                _ => level -= 1,
            }
        }
    }
    None
}
