// Copyright (C) the strex authors. All rights reserved.
//
// This file is part of strex, distributed under the terms of the MIT
// License. For the full terms, see the included LICENSE file.

use std::{
    cell::RefCell,
    fs::File,
    io::{self, Cursor, Read, Write},
    path::Path,
    rc::Rc,
    sync::mpsc::{channel, sync_channel, Receiver, SyncSender},
};

use static_assertions::assert_impl_all;
use thiserror::Error;

/// One input for a run: a name for diagnostics and the reader itself.
pub struct Input {
    pub name: String,
    pub reader: Box<dyn Read + Send>,
}

impl std::fmt::Debug for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Input").field("name", &self.name).finish_non_exhaustive()
    }
}

/// A failure to acquire an input, carried through the input queue as a
/// value so the producer thread never has to unwind.
#[derive(Debug, Error)]
#[error("{name}: {source}")]
pub struct InputError {
    pub name: String,
    #[source]
    pub source: io::Error,
}

pub type InputResult = Result<Input, InputError>;

assert_impl_all!(Input: Send);
assert_impl_all!(InputResult: Send);

/// The runtime context a program runs in: where output goes and where
/// inputs come from. Input acquisition may happen on another thread; the
/// queue keeps producer and consumer loosely coupled.
pub trait Environment {
    type Sink: Write;

    /// Takes the default output sink. The builder calls this once; the sink
    /// then lives inside the chain's terminal writer.
    fn sink(&mut self) -> Self::Sink;

    /// Takes the receiving end of the input queue.
    fn inputs(&mut self) -> Receiver<InputResult>;

    /// Final cleanup once the run is over and the sink has been flushed.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The producing side of an environment's input queue. Clone it into
/// whatever thread opens the inputs; the queue closes when every handle is
/// dropped.
#[derive(Clone)]
pub struct InputSender {
    tx: SyncSender<InputResult>,
}

assert_impl_all!(InputSender: Send, Clone);

impl InputSender {
    /// Opens a file and queues it (or the open error). Returns `false` once
    /// the consumer has gone away and further sends are pointless.
    pub fn send_path(&self, path: &Path) -> bool {
        let name = path.display().to_string();
        let result = match File::open(path) {
            Ok(f) => Ok(Input {
                name,
                reader: Box::new(f),
            }),
            Err(source) => Err(InputError { name, source }),
        };
        self.tx.send(result).is_ok()
    }

    pub fn send_stdin(&self) -> bool {
        self.tx
            .send(Ok(Input {
                name: "<stdin>".to_string(),
                reader: Box::new(io::stdin()),
            }))
            .is_ok()
    }

    pub fn send_reader(&self, name: impl Into<String>, reader: Box<dyn Read + Send>) -> bool {
        self.tx
            .send(Ok(Input {
                name: name.into(),
                reader,
            }))
            .is_ok()
    }

    /// Queues a failure that happened while resolving inputs (say, reading
    /// a file list), so it aborts the run in arrival order like any other.
    pub fn send_error(&self, name: impl Into<String>, source: io::Error) -> bool {
        self.tx
            .send(Err(InputError {
                name: name.into(),
                source,
            }))
            .is_ok()
    }
}

/// An environment backed by real file handles; output goes to the provided
/// writer (stdout by default) through a buffer. Inputs arrive over a small
/// bounded queue so a producer thread can open files just ahead of the run.
pub struct FileEnv {
    out: Option<io::BufWriter<Box<dyn Write + Send>>>,
    tx: Option<SyncSender<InputResult>>,
    rx: Option<Receiver<InputResult>>,
}

impl FileEnv {
    pub fn stdout() -> FileEnv {
        FileEnv::to_writer(Box::new(io::stdout()))
    }

    pub fn to_writer(w: Box<dyn Write + Send>) -> FileEnv {
        let (tx, rx) = sync_channel(1);
        FileEnv {
            out: Some(io::BufWriter::new(w)),
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    /// Takes the producer handle for the input queue. Panics if taken
    /// twice: the queue only closes when every handle is gone, so handing
    /// out extras by accident would hang the run.
    pub fn input_sender(&mut self) -> InputSender {
        let tx = self.tx.take().expect("input sender already taken");
        InputSender { tx }
    }
}

impl Environment for FileEnv {
    type Sink = io::BufWriter<Box<dyn Write + Send>>;

    fn sink(&mut self) -> Self::Sink {
        self.out.take().expect("sink already taken")
    }

    fn inputs(&mut self) -> Receiver<InputResult> {
        self.rx.take().expect("inputs already taken")
    }
}

/// A byte buffer that can be handed to a chain as its sink while the
/// environment keeps a handle for reading the output back out.
#[derive(Clone, Debug, Default)]
pub struct SharedBuf(Rc<RefCell<Vec<u8>>>);

impl SharedBuf {
    pub fn contents(&self) -> Vec<u8> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// An environment that collects output in memory and feeds queued byte
/// buffers as inputs; the test environment.
pub struct BufEnv {
    out: SharedBuf,
    tx: Option<std::sync::mpsc::Sender<InputResult>>,
    rx: Option<Receiver<InputResult>>,
}

impl Default for BufEnv {
    fn default() -> Self {
        BufEnv::new()
    }
}

impl BufEnv {
    pub fn new() -> BufEnv {
        let (tx, rx) = channel();
        BufEnv {
            out: SharedBuf::default(),
            tx: Some(tx),
            rx: Some(rx),
        }
    }

    /// Queues one in-memory input.
    pub fn push_input(&mut self, bytes: impl Into<Vec<u8>>) {
        let tx = self.tx.as_ref().expect("inputs already closed");
        tx.send(Ok(Input {
            name: "<buffer>".to_string(),
            reader: Box::new(Cursor::new(bytes.into())),
        }))
        .expect("input receiver gone");
    }

    /// Closes the input queue; the run ends once what was queued is
    /// consumed.
    pub fn close_inputs(&mut self) {
        self.tx = None;
    }

    /// The output collected so far.
    pub fn output(&self) -> Vec<u8> {
        self.out.contents()
    }
}

impl Environment for BufEnv {
    type Sink = SharedBuf;

    fn sink(&mut self) -> Self::Sink {
        self.out.clone()
    }

    fn inputs(&mut self) -> Receiver<InputResult> {
        // Runs end when the queue closes; drop our sender now so a fully
        // queued BufEnv does not hang the consumer.
        self.tx = None;
        self.rx.take().expect("inputs already taken")
    }
}

/// An environment that discards all output; useful for examining chain
/// structure apart from any real output.
#[derive(Default)]
pub struct NullEnv;

impl Environment for NullEnv {
    type Sink = io::Sink;

    fn sink(&mut self) -> Self::Sink {
        io::sink()
    }

    fn inputs(&mut self) -> Receiver<InputResult> {
        let (tx, rx) = sync_channel(1);
        drop(tx);
        rx
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn buf_env_round() {
        let mut env = BufEnv::new();
        env.push_input(b"hello".to_vec());
        let mut sink = env.sink();
        for input in env.inputs() {
            let mut input = input.unwrap();
            io::copy(&mut input.reader, &mut sink).unwrap();
        }
        assert_eq!(env.output(), b"hello");
    }

    #[test]
    fn file_env_reports_open_errors_in_order() {
        let mut env = FileEnv::to_writer(Box::new(io::sink()));
        let sender = env.input_sender();
        let producer = std::thread::spawn(move || {
            sender.send_reader("first", Box::new(Cursor::new(b"ok".to_vec())));
            sender.send_path(Path::new("no/such/path"));
        });

        let inputs = env.inputs();
        let first = inputs.recv().unwrap();
        assert_eq!(first.unwrap().name, "first");
        let second = inputs.recv().unwrap();
        let err = second.unwrap_err();
        assert_eq!(err.name, "no/such/path");
        assert_eq!(err.source.kind(), io::ErrorKind::NotFound);
        assert!(inputs.recv().is_err(), "queue closes with its senders");
        producer.join().unwrap();
    }

    #[test]
    #[should_panic(expected = "input sender already taken")]
    fn file_env_sender_taken_once() {
        let mut env = FileEnv::to_writer(Box::new(io::sink()));
        let _keep = env.input_sender();
        let _ = env.input_sender();
    }

    #[test]
    fn null_env_discards_everything() {
        let mut env = NullEnv;
        let mut sink = env.sink();
        sink.write_all(b"gone").unwrap();
        assert!(env.inputs().recv().is_err(), "no inputs, ever");
        env.close().unwrap();
    }
}
