// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::io::Write;

use thiserror::Error;

use crate::between::{BetweenBalanced, BetweenPair, BetweenRe, BetweenSplit};
use crate::command::{Between, Command, Extract, Join, Print};
use crate::extract::{ExtractBalanced, ExtractRe, ExtractSub};
use crate::filter::FilterProc;
use crate::join::{JoinProc, SepWriter};
use crate::matcher::{MatchProc, Matcher};
use crate::output::{DelimProc, DelimWriter, FmtProc, FmtWriter, Writer};
use crate::processor::{Pipeline, Proc};
use crate::split::Splitter;

/// An atom-level invariant failure caught while reifying a chain.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum BuildError {
    /// `y""`: a literal delimiter has to have at least one byte.
    #[error("empty y delimiter")]
    EmptyDelimiter,
    /// The capture group an extract atom names does not exist in its
    /// pattern.
    #[error("pattern has no capture group {0}")]
    NoSuchGroup(usize),
}

/// Folds a program right to left into a processor chain rooted at the
/// terminal writer, fusing adjacent output stages as it goes.
pub fn build<W: Write>(atoms: &[Command], sink: W) -> Result<Pipeline<W>, BuildError> {
    let mut proc = Proc::Write(Writer::new(sink));
    for atom in atoms.iter().rev() {
        proc = build_atom(atom, proc)?;
    }
    Ok(Pipeline::new(proc))
}

fn build_atom<W: Write>(atom: &Command, next: Proc<W>) -> Result<Proc<W>, BuildError> {
    match atom {
        Command::Extract(x) => Ok(Proc::Match(MatchProc::new(extract_matcher(x)?, next))),
        Command::Between(y) => Ok(Proc::Match(MatchProc::new(between_matcher(y)?, next))),
        Command::Filter(flt) => Ok(Proc::Filter(FilterProc::new(
            flt.pattern.clone(),
            flt.negate,
            next,
        ))),
        Command::Print(p) => Ok(build_print(p, next)),
        Command::Join(j) => Ok(build_join(j, next)),
    }
}

fn extract_matcher(x: &Extract) -> Result<Matcher, BuildError> {
    match x {
        Extract::Regex(pat) => Ok(Matcher::ExtractRe(ExtractRe::new(pat.clone()))),
        Extract::SubRegex(pat, group) => {
            if *group == 0 || *group > pat.group_count() {
                return Err(BuildError::NoSuchGroup(*group));
            }
            Ok(Matcher::ExtractSub(ExtractSub::new(pat.clone(), *group)))
        }
        Extract::Balanced(pair) => Ok(Matcher::ExtractBalanced(ExtractBalanced::new(*pair))),
    }
}

fn between_matcher(y: &Between) -> Result<Matcher, BuildError> {
    match y {
        Between::RegexDelim(pat) => Ok(Matcher::BetweenRe(BetweenRe::new(pat.clone()))),
        Between::RegexPair(start, end) => Ok(Matcher::BetweenPair(BetweenPair::new(
            start.clone(),
            end.clone(),
        ))),
        Between::Balanced(pair) => Ok(Matcher::BetweenBalanced(BetweenBalanced::new(*pair))),
        Between::StringDelim { delim, cutset } => {
            if delim.is_empty() {
                return Err(BuildError::EmptyDelimiter);
            }
            let mut split = Splitter::literal(delim);
            if let Some(cutset) = cutset {
                split = split.trimmed(cutset.clone());
            }
            Ok(Matcher::BetweenSplit(BetweenSplit::new(split)))
        }
    }
}

/// Print stages fuse opportunistically: adjacent delimiters concatenate, a
/// format swallows a following delimiter, and either collapses into the
/// writer when nothing sits in between.
fn build_print<W: Write>(p: &Print, next: Proc<W>) -> Proc<W> {
    match p {
        // A bare `p` passes regions through untouched. At the head of a
        // chain, the runner turns the remaining writer into a straight
        // reader-to-writer copy.
        Print::Plain => next,

        Print::Format(fmt) => match next {
            Proc::Delim(dp) => {
                let mut fmt = fmt.clone();
                fmt.push_literal(&dp.delim);
                Proc::Fmt(FmtProc::new(fmt, *dp.next))
            }
            Proc::Write(w) => Proc::FmtWrite(FmtWriter::new(fmt.clone(), w.w)),
            Proc::DelimWrite(dw) => {
                let mut fmt = fmt.clone();
                fmt.push_literal(&dw.delim);
                Proc::FmtWrite(FmtWriter::new(fmt, dw.w))
            }
            next => Proc::Fmt(FmtProc::new(fmt.clone(), next)),
        },

        Print::Delim(delim) => match next {
            Proc::Delim(dp) => {
                let mut delim = delim.clone();
                delim.extend_from_slice(&dp.delim);
                Proc::Delim(DelimProc::new(delim, *dp.next))
            }
            Proc::Write(w) => Proc::DelimWrite(DelimWriter::new(delim.clone(), w.w)),
            Proc::DelimWrite(dw) => {
                let mut delim = delim.clone();
                delim.extend_from_slice(&dw.delim);
                Proc::DelimWrite(DelimWriter::new(delim, dw.w))
            }
            next => Proc::Delim(DelimProc::new(delim.clone(), next)),
        },
    }
}

fn build_join<W: Write>(j: &Join, next: Proc<W>) -> Proc<W> {
    match (j, next) {
        // Writing the pieces back to back is already a concatenation.
        (Join::Concat, next @ Proc::Write(_)) => next,
        (j, Proc::Write(w)) => Proc::SepWrite(SepWriter::new(j.clone(), w.w)),
        (j, next) => Proc::Join(JoinProc::new(j.clone(), next)),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::command::Pattern;
    use crate::parser::parse;

    fn chain(prog: &str) -> String {
        let atoms = parse(prog).unwrap();
        build(&atoms, Vec::<u8>::new()).unwrap().to_string()
    }

    #[test]
    fn fusion_shapes() {
        assert_eq!(chain("p"), "p");
        assert_eq!(chain(r"x/\w+/ j"), r"x/\w+/ p");
        assert_eq!(chain(r"x/\w+/ j,"), r"x/\w+/ j,");
        assert_eq!(chain(r#"x/\w+/ p"," p"\n""#), r#"x/\w+/ p",\n""#);
        assert_eq!(chain(r#"x/\w+/ p%"%q" p"\n""#), r#"x/\w+/ p%"%q\n""#);
        assert_eq!(
            chain(r#"x/\w+/ p"," p%"%q\n""#),
            r#"x/\w+/ p"," p%"%q\n""#,
        );
        assert_eq!(chain(r#"y"\n" g/cat/ p"\n""#), r#"y"\n" g/cat/ p"\n""#);
    }

    #[test]
    fn empty_delimiter_is_a_build_error() {
        let atoms = parse(r#"y"""#).unwrap();
        let err = build(&atoms, Vec::<u8>::new()).unwrap_err();
        assert_eq!(err, BuildError::EmptyDelimiter);
    }

    #[test]
    fn missing_capture_group_is_a_build_error() {
        // The parser never produces this shape; the builder still refuses
        // it rather than panic on a bad group index.
        let pat = Pattern::compile(r"\w+", "").unwrap();
        let atoms = [Command::Extract(Extract::SubRegex(pat, 1))];
        let err = build(&atoms, Vec::<u8>::new()).unwrap_err();
        assert_eq!(err, BuildError::NoSuchGroup(1));
    }
}
