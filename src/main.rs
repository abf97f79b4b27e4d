// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
    thread,
};

use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use strex::{run_program_with, FileEnv, InputSender};

/// Carve a byte stream into nested regions with structural regular
/// expressions and print the ones you care about.
///
/// A program is a chain of commands, each feeding sub-regions to the next:
/// `x/re/` extracts matches, `y/re/` the spans between them, `g`/`v` keep
/// or drop regions, `j` joins them back up, and `p` formats the output.
#[derive(Debug, Parser)]
#[command(name = "strex", version)]
struct Cli {
    /// Treat each operand (or stdin) as a list of file paths, one per line
    #[arg(short = 'l', long = "file-list")]
    file_list: bool,

    /// Read-buffer growth step in bytes
    #[arg(long = "min-read", value_name = "BYTES")]
    min_read: Option<usize>,

    /// The program to run
    expr: String,

    /// Input files (stdin if none)
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("strex: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut env = FileEnv::stdout();
    let sender = env.input_sender();
    let producer = thread::spawn(move || produce_inputs(sender, cli.files, cli.file_list));

    let result = run_program_with(&cli.expr, &mut env, cli.min_read);

    // Dropping the environment closes the input queue, so a producer still
    // blocked on it can notice and exit before we join it.
    drop(env);
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("input producer panicked"))?;
    Ok(result?)
}

/// Opens the inputs on their own thread and feeds them to the run in
/// order. Sends stop as soon as the consuming side has gone away.
fn produce_inputs(sender: InputSender, files: Vec<PathBuf>, file_list: bool) {
    if !file_list {
        if files.is_empty() {
            sender.send_stdin();
            return;
        }
        for path in files {
            debug!(path = %path.display(), "queueing input");
            if !sender.send_path(&path) {
                return;
            }
        }
        return;
    }

    // -l: the operands name lists of files rather than files.
    if files.is_empty() {
        let mut text = String::new();
        if let Err(err) = io::stdin().read_to_string(&mut text) {
            sender.send_error("<stdin>", err);
            return;
        }
        send_listed(&sender, "<stdin>", &text);
        return;
    }
    for list in files {
        match fs::read_to_string(&list) {
            Ok(text) => {
                if !send_listed(&sender, &list.display().to_string(), &text) {
                    return;
                }
            }
            Err(err) => {
                sender.send_error(list.display().to_string(), err);
                return;
            }
        }
    }
}

fn send_listed(sender: &InputSender, list_name: &str, text: &str) -> bool {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        debug!(list = list_name, path = line, "queueing listed input");
        if !sender.send_path(Path::new(line)) {
            return false;
        }
    }
    true
}
