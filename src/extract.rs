// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::fmt::{self, Display, Formatter};

use crate::balance::{scan_balanced, Pair};
use crate::command::Pattern;
use crate::matcher::Scan;

/// `x/re/`: yield each whole match, advancing past it.
#[derive(Clone, Debug)]
pub struct ExtractRe {
    pat: Pattern,
}

impl ExtractRe {
    pub fn new(pat: Pattern) -> ExtractRe {
        ExtractRe { pat }
    }

    pub(crate) fn scan(&self, window: &[u8]) -> Scan {
        match self.pat.regex().find(window) {
            Some(m) => Scan::Loc {
                start: m.start(),
                end: m.end(),
                next: m.end(),
            },
            None => Scan::None,
        }
    }
}

/// `x/(re)/`: yield the captured sub-span of each match, advancing past the
/// whole match.
#[derive(Clone, Debug)]
pub struct ExtractSub {
    pat: Pattern,
    group: usize,
}

impl ExtractSub {
    pub fn new(pat: Pattern, group: usize) -> ExtractSub {
        ExtractSub { pat, group }
    }

    pub(crate) fn scan(&self, window: &[u8], at_eof: bool) -> Scan {
        let Some(caps) = self.pat.regex().captures(window) else {
            return Scan::None;
        };
        let whole = caps.get(0).expect("group 0 always participates");
        if whole.end() == window.len() && !at_eof {
            // The whole match could still grow, and its captured span with
            // it. The cursor will have moved to the capture by the time
            // that is known, losing the match's leading context, so hold
            // off until the input settles.
            return Scan::None;
        }
        match caps.get(self.group) {
            Some(g) => Scan::Loc {
                start: g.start(),
                end: g.end(),
                next: whole.end(),
            },
            // The group sat in an unmatched alternative; yield an empty
            // region rather than losing the scope's cadence.
            None => Scan::Loc {
                start: whole.end(),
                end: whole.end(),
                next: whole.end(),
            },
        }
    }
}

/// `x{` and friends: yield each top-level balanced region, brackets
/// included.
#[derive(Clone, Copy, Debug)]
pub struct ExtractBalanced {
    pair: Pair,
}

impl ExtractBalanced {
    pub fn new(pair: Pair) -> ExtractBalanced {
        ExtractBalanced { pair }
    }

    pub(crate) fn scan(&self, window: &[u8], at_eof: bool) -> Scan {
        match scan_balanced(self.pair, window) {
            Some((0, end)) if end == window.len() => {
                if !at_eof {
                    // The region may still grow into something that is not
                    // a lone balanced block; decide once input is settled.
                    return Scan::None;
                }
                // The scope is exactly one balanced block. Extracting it
                // again would be a fixed point, so descend to the blocks it
                // encloses; a block with no inner structure yields itself.
                match scan_balanced(self.pair, &window[1..end - 1]) {
                    Some((start, inner_end)) => Scan::Loc {
                        start: start + 1,
                        end: inner_end + 1,
                        next: inner_end + 1,
                    },
                    None => Scan::Loc {
                        start: 0,
                        end,
                        next: end,
                    },
                }
            }
            Some((start, end)) => Scan::Loc {
                start,
                end,
                next: end,
            },
            None => Scan::None,
        }
    }
}

impl Display for ExtractRe {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.pat)
    }
}

impl Display for ExtractSub {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.pat)
    }
}

impl Display for ExtractBalanced {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", char::from(self.pair.open))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testutil::{cases, CmdCase};

    fn loc(start: usize, end: usize, next: usize) -> Scan {
        Scan::Loc { start, end, next }
    }

    #[test]
    fn extract_commands() {
        cases(&[
            CmdCase {
                name: "line extraction",
                cmd: r#"x/.*\n/ p%"%q\n""#,
                proc: None,
                input: b"aee\nbee\tdee\ncee\n",
                output: b"\"aee\\n\"\n\"bee\\tdee\\n\"\n\"cee\\n\"\n",
            },
            CmdCase {
                name: "line extraction (submatch)",
                cmd: r#"x/(.*)\n/ p%"%q\n""#,
                proc: None,
                input: b"aee\nbee\tdee\ncee\n",
                output: b"\"aee\"\n\"bee\\tdee\"\n\"cee\"\n",
            },
            CmdCase {
                name: "field extraction",
                cmd: r#"x/(.*)\n/ x/^([^\s]+).*$/ p%"%q\n""#,
                proc: None,
                input: b"aee\nbee\tdee\ncee\n",
                output: b"\"aee\"\n\"bee\"\n\"cee\"\n",
            },
            CmdCase {
                name: "word extraction",
                cmd: r#"x/\w+/ p"\n""#,
                proc: None,
                input: b"able was I\nere\nI saw elba.",
                output: b"able\nwas\nI\nere\nI\nsaw\nelba\n",
            },
        ]);
    }

    #[test]
    fn balanced_commands() {
        cases(&[CmdCase {
            name: "fizzy code blocks",
            cmd: r#"x{ x/\{(.*)\}/s x{ p%"%q\n""#,
            proc: None,
            input: b"import \"fmt\"\n\nfor i := 0; i < 10; i++ {\n\tany := false\n\tif i % 3 == 0 {\n\t\tany = true\n\t\tfmt.Printf(\"fizz\")\n\t}\n\tif i % 5 == 0 {\n\t\tany = true\n\t\tfmt.Printf(\"buzz\")\n\t}\n\tif any {\n\t\tfmt.Printf(\"EOL\")\n\t}\n}\n",
            output: b"\"{\\n\\t\\tany = true\\n\\t\\tfmt.Printf(\\\"fizz\\\")\\n\\t}\"\n\"{\\n\\t\\tany = true\\n\\t\\tfmt.Printf(\\\"buzz\\\")\\n\\t}\"\n\"{\\n\\t\\tfmt.Printf(\\\"EOL\\\")\\n\\t}\"\n",
        }]);
    }

    #[test]
    fn whole_match() {
        let m = ExtractRe::new(Pattern::compile(r"\w+", "").unwrap());
        assert_eq!(m.scan(b"  bob lob"), loc(2, 5, 5));
        assert_eq!(m.scan(b" .,"), Scan::None);
    }

    #[test]
    fn submatch_yields_group_advances_whole() {
        let m = ExtractSub::new(Pattern::compile(r"(\w+)\s*=", "").unwrap(), 1);
        assert_eq!(m.scan(b"key = value", true), loc(0, 3, 6));
        // A whole match touching the window end might still grow; it is
        // withheld until EOF settles it.
        assert_eq!(m.scan(b"key =", false), Scan::None);
        assert_eq!(m.scan(b"key =", true), loc(0, 3, 5));
    }

    #[test]
    fn absent_group_yields_empty() {
        let m = ExtractSub::new(Pattern::compile(r"a(b)?c", "").unwrap(), 1);
        assert_eq!(m.scan(b"ac", true), loc(2, 2, 2));
        assert_eq!(m.scan(b"abc", true), loc(1, 2, 3));
    }

    #[test]
    fn balanced_includes_brackets() {
        let m = ExtractBalanced::new(Pair::for_open(b'{').unwrap());
        assert_eq!(m.scan(b"a {b} c", true), loc(2, 5, 5));
        assert_eq!(m.scan(b"none", true), Scan::None);
    }

    #[test]
    fn balanced_scope_descends_into_itself() {
        let m = ExtractBalanced::new(Pair::for_open(b'{').unwrap());
        // A region that is exactly one block yields its inner blocks.
        assert_eq!(m.scan(b"{a {b} c}", true), loc(3, 6, 6));
        // Unless there are none, in which case it yields itself.
        assert_eq!(m.scan(b"{abc}", true), loc(0, 5, 5));
        // Streaming: the decision waits until the region stops growing.
        assert_eq!(m.scan(b"{a {b} c}", false), Scan::None);
        assert_eq!(m.scan(b"a {b} c", false), loc(2, 5, 5));
    }
}
