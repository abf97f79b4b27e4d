// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

//! A streaming engine for structural regular expressions in the tradition
//! of `sam`'s command language: a program is a chain of small commands,
//! each carving its input into sub-regions for the next, from one input
//! reader to one output writer.
//!
//! The three stages are [`parse`] (program text to [`Command`] atoms),
//! [`build`] (atoms plus an output sink to a [`Pipeline`]), and the
//! pipeline's [`read_from`](Pipeline::read_from), which drives input
//! through the chain either incrementally or from finished in-memory
//! regions, with identical results.

mod balance;
mod between;
mod buffer;
mod builder;
mod command;
mod environment;
mod extract;
mod filter;
mod join;
mod matcher;
mod output;
mod parser;
mod processor;
mod quote;
mod split;

#[cfg(test)]
mod testutil;

use thiserror::Error;
use tracing::debug;

pub use crate::buffer::{ReadBuf, Tail, MIN_READ};
pub use crate::builder::{build, BuildError};
pub use crate::command::{render, Between, Command, Extract, Filter, Join, Pattern, Print};
pub use crate::environment::{
    BufEnv, Environment, FileEnv, Input, InputError, InputResult, InputSender, NullEnv, SharedBuf,
};
pub use crate::parser::{parse, ParseError, ParseErrorKind};
pub use crate::processor::{Pipeline, Proc, ProcessError};
pub use crate::quote::{quote, unquote, FormatError, FormatStr, QuoteError};
pub use crate::split::{Split, SplitError, Splitter, MAX_CONSECUTIVE_EMPTIES};

/// Any error from parsing, building, or running a program.
#[derive(Debug, Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("build error: {0}")]
    Build(#[from] BuildError),
    #[error(transparent)]
    Input(#[from] InputError),
    #[error(transparent)]
    Process(#[from] ProcessError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Parses `prog` and runs it over every input the environment supplies, in
/// arrival order. Output goes to the environment's sink, which is flushed
/// before returning; the first error wins but the flush still happens.
pub fn run_program<E: Environment>(prog: &str, env: &mut E) -> Result<(), Error> {
    run_program_with(prog, env, None)
}

/// [`run_program`] with an explicit read-buffer growth step.
pub fn run_program_with<E: Environment>(
    prog: &str,
    env: &mut E,
    min_read: Option<usize>,
) -> Result<(), Error> {
    let atoms = parse(prog)?;
    debug!(program = %render(&atoms), "parsed program");
    let mut pipeline = build(&atoms, env.sink())?;
    if let Some(min_read) = min_read {
        pipeline.set_min_read(min_read);
    }
    debug!(pipeline = %pipeline, "built pipeline");

    let mut result = Ok(());
    for input in env.inputs() {
        match input {
            Ok(input) => {
                debug!(input = %input.name, "processing input");
                match pipeline.read_from(input.reader) {
                    Ok(n) => debug!(input = %input.name, bytes = n, "finished input"),
                    Err(err) => {
                        result = Err(Error::Process(err));
                        break;
                    }
                }
            }
            Err(err) => {
                result = Err(Error::Input(err));
                break;
            }
        }
    }

    let flushed = pipeline.finish();
    let closed = env.close();
    result?;
    flushed?;
    closed?;
    Ok(())
}
