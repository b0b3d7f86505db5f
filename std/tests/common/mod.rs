#![allow(dead_code)]

use compiler::ChunkCompiler;
use lunette_std::Registry;
use memory::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::rc::Rc;
use vm::{ChunkReader, Host, RuntimeError, VM};

/// Chunk stream that reports its name when closed.
pub struct RecordedReader {
    inner: Cursor<Vec<u8>>,
    name: String,
    standard: bool,
    closes: Rc<RefCell<Vec<String>>>,
}

impl Read for RecordedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ChunkReader for RecordedReader {
    fn is_standard(&self) -> bool {
        self.standard
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        self.closes.borrow_mut().push(self.name.clone());
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct SharedBuf(pub Rc<RefCell<Vec<u8>>>);

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Host backed by in-memory files and streams.
pub struct MemoryHost {
    files: HashMap<String, Vec<u8>>,
    stdin: Vec<u8>,
    closes: Rc<RefCell<Vec<String>>>,
    out: SharedBuf,
}

impl Host for MemoryHost {
    fn open_resource(&mut self, name: &str) -> io::Result<Box<dyn ChunkReader>> {
        let bytes = self
            .files
            .get(name)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, name.to_string()))?;
        Ok(Box::new(RecordedReader {
            inner: Cursor::new(bytes),
            name: name.to_string(),
            standard: false,
            closes: Rc::clone(&self.closes),
        }))
    }

    fn stdin(&mut self) -> Box<dyn ChunkReader> {
        Box::new(RecordedReader {
            inner: Cursor::new(self.stdin.clone()),
            name: "stdin".into(),
            standard: true,
            closes: Rc::clone(&self.closes),
        })
    }

    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.out
    }
}

/// A VM with the compiler and base library installed over a [`MemoryHost`].
pub struct Harness {
    pub vm: VM,
    pub registry: Registry,
    pub closes: Rc<RefCell<Vec<String>>>,
    pub output: Rc<RefCell<Vec<u8>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_files(&[], "")
    }

    pub fn with_files(files: &[(&str, &str)], stdin: &str) -> Self {
        let closes = Rc::new(RefCell::new(Vec::new()));
        let out = SharedBuf::default();
        let host = MemoryHost {
            files: files
                .iter()
                .map(|(name, body)| (name.to_string(), body.as_bytes().to_vec()))
                .collect(),
            stdin: stdin.as_bytes().to_vec(),
            closes: Rc::clone(&closes),
            out: out.clone(),
        };
        let mut vm = VM::new();
        vm.set_host(Box::new(host));
        vm.set_compiler(Box::new(ChunkCompiler));
        let registry = Registry::install(&mut vm).expect("install base library");
        Self {
            vm,
            registry,
            closes,
            output: out.0,
        }
    }

    pub fn run(&mut self, source: &str) -> Result<Vec<Value>, RuntimeError> {
        let main = self.vm.decode_bytes(source.as_bytes(), "=test")?;
        self.vm.run_main(main)
    }

    /// Run `source` and render every result with `tostring`.
    pub fn eval(&mut self, source: &str) -> Vec<String> {
        let values = self
            .run(source)
            .unwrap_or_else(|e| panic!("{source:?} failed: {e}"));
        values.iter().map(|&v| self.vm.tostring_lossy(v)).collect()
    }

    /// Run `source`, expecting an error, and return its message.
    pub fn error(&mut self, source: &str) -> String {
        match self.run(source) {
            Ok(values) => panic!("{source:?} succeeded with {} values", values.len()),
            Err(e) => e.message(),
        }
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.borrow()).into_owned()
    }

    pub fn closed(&self) -> Vec<String> {
        self.closes.borrow().clone()
    }
}
