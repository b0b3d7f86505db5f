//! Dynamic loading: `loadfile`, `dofile`, `loadstring` and `load`.
//!
//! Every path funnels into [`stream_to_closure`], which owns the stream for
//! the duration of the load and closes it on the way out. Guest-facing
//! loaders report failure as `nil, message`; the Rust functions return the
//! structured [`LoadError`].

use memory::Value;
use std::io::{self, Read};
use tracing::{debug, trace, warn};
use vm::{ChunkReader, Facade, LoadError, MemoryReader, RuntimeError, VM};

/// Chunk name used when `loadfile`/`dofile` read standard input.
pub const STDIN_CHUNK: &str = "=stdin";
/// Default chunk name for `load`.
pub const LOAD_CHUNK: &str = "=(load)";

/// Closes the wrapped stream when dropped, unless it is a process-wide
/// standard stream.
struct ScopedStream {
    stream: Option<Box<dyn ChunkReader>>,
    chunk: String,
}

impl ScopedStream {
    fn new(stream: Box<dyn ChunkReader>, chunk: &str) -> Self {
        Self {
            stream: Some(stream),
            chunk: chunk.to_string(),
        }
    }
}

impl Read for ScopedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.stream.as_mut() {
            Some(stream) => stream.read(buf),
            None => Ok(0),
        }
    }
}

impl Drop for ScopedStream {
    fn drop(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        if stream.is_standard() {
            trace!(chunk = %self.chunk, "standard stream left open");
            return;
        }
        match stream.close() {
            Ok(()) => trace!(chunk = %self.chunk, "stream closed"),
            Err(e) => warn!(chunk = %self.chunk, error = %e, "failed to close chunk stream"),
        }
    }
}

/// Load one chunk from `stream` and wrap it in a closure over the global
/// environment.
///
/// The stream is closed before this returns, whatever the outcome.
pub fn stream_to_closure(
    vm: &mut VM,
    stream: Box<dyn ChunkReader>,
    chunk_name: &str,
) -> Result<Value, LoadError> {
    let mut scoped = ScopedStream::new(stream, chunk_name);
    let loaded = Facade::decode_chunk(vm, &mut scoped, chunk_name);
    drop(scoped);
    let function = loaded?;
    Ok(vm.new_closure(function))
}

/// Load a named resource through the host, or standard input when `name`
/// is `None`.
pub fn load_file(vm: &mut VM, name: Option<&str>) -> Result<Value, LoadError> {
    match name {
        None => {
            let stdin = vm.host.stdin();
            stream_to_closure(vm, stdin, STDIN_CHUNK)
        }
        Some(name) => {
            let stream = vm.host.open_resource(name).map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => LoadError::NotFound(name.to_string()),
                _ => LoadError::Io {
                    name: name.to_string(),
                    source: e,
                },
            })?;
            stream_to_closure(vm, stream, &format!("@{}", name))
        }
    }
}

/// Load `source` held in memory.
pub fn load_string(vm: &mut VM, source: &[u8], chunk_name: &str) -> Result<Value, LoadError> {
    stream_to_closure(vm, Box::new(MemoryReader::new(source)), chunk_name)
}

/// Pull pieces from `reader` until it yields a non-string or an empty
/// string, then load the concatenation.
pub fn load_from(vm: &mut VM, reader: Value, chunk_name: &str) -> Result<Value, LoadError> {
    let mut source = Vec::new();
    loop {
        // The reader's failure ends here, so its location must not
        // outlive it.
        let location = vm.last_error_location.clone();
        let results = vm.invoke(reader, &[]).map_err(|e| {
            vm.last_error_location = location;
            LoadError::Reader(e.message())
        })?;
        match results.first().and_then(|&v| vm.string_bytes(v)) {
            Some(piece) if !piece.is_empty() => source.extend_from_slice(piece),
            _ => break,
        }
    }
    trace!(chunk = chunk_name, size = source.len(), "reader function drained");
    load_string(vm, &source, chunk_name)
}

/// Optional chunk-name argument `i`.
fn chunk_name_arg(vm: &VM, i: usize) -> Result<Option<String>, RuntimeError> {
    if vm.arg(i).is_nil() {
        return Ok(None);
    }
    let bytes = vm.arg_as_string(i)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Deliver a load outcome to the guest: the closure, or `nil, message`.
fn deliver(vm: &mut VM, outcome: Result<Value, LoadError>) {
    match outcome {
        Ok(closure) => vm.set_result(&[closure]),
        Err(e) => {
            debug!(error = %e, "chunk load failed");
            let message = vm.str_value(&e.to_string());
            vm.set_result(&[Value::nil(), message]);
        }
    }
}

pub fn native_loadfile(vm: &mut VM) -> Result<(), RuntimeError> {
    let name = chunk_name_arg(vm, 0)?;
    let outcome = load_file(vm, name.as_deref());
    deliver(vm, outcome);
    Ok(())
}

pub fn native_dofile(vm: &mut VM) -> Result<(), RuntimeError> {
    let name = chunk_name_arg(vm, 0)?;
    let closure = match load_file(vm, name.as_deref()) {
        Ok(closure) => closure,
        Err(LoadError::NotFound(missing)) => {
            let message = vm.str_value(&format!("file not found: {}", missing));
            return Err(vm.raise_error(message));
        }
        Err(e) => {
            let message = vm.str_value(&e.to_string());
            return Err(vm.raise_error(message));
        }
    };
    let results = vm.invoke(closure, &[])?;
    vm.set_result(&results);
    Ok(())
}

pub fn native_loadstring(vm: &mut VM) -> Result<(), RuntimeError> {
    let source = vm.arg_as_string(0)?;
    let chunk_name = match chunk_name_arg(vm, 1)? {
        Some(name) => name,
        None => String::from_utf8_lossy(&source).into_owned(),
    };
    let outcome = load_string(vm, &source, &chunk_name);
    deliver(vm, outcome);
    Ok(())
}

pub fn native_load(vm: &mut VM) -> Result<(), RuntimeError> {
    let reader = vm.arg(0);
    if !reader.is_callable() {
        let message = format!("not a function: {}", vm.tostring_lossy(reader));
        return Err(RuntimeError::TypeMismatch(message));
    }
    let chunk_name = chunk_name_arg(vm, 1)?.unwrap_or_else(|| LOAD_CHUNK.to_string());
    let outcome = load_from(vm, reader, &chunk_name);
    deliver(vm, outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Tracked {
        inner: MemoryReader,
        standard: bool,
        closed: Rc<RefCell<usize>>,
    }

    impl Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.inner.read(buf)
        }
    }

    impl ChunkReader for Tracked {
        fn is_standard(&self) -> bool {
            self.standard
        }

        fn close(self: Box<Self>) -> io::Result<()> {
            *self.closed.borrow_mut() += 1;
            Ok(())
        }
    }

    fn tracked(bytes: &[u8], standard: bool) -> (Box<dyn ChunkReader>, Rc<RefCell<usize>>) {
        let closed = Rc::new(RefCell::new(0));
        let stream = Tracked {
            inner: MemoryReader::new(bytes),
            standard,
            closed: Rc::clone(&closed),
        };
        (Box::new(stream), closed)
    }

    #[test]
    fn test_stream_closed_after_failed_load() {
        // No source compiler installed: loading text fails.
        let mut vm = VM::new();
        let (stream, closed) = tracked(b"return 1", false);
        let err = stream_to_closure(&mut vm, stream, "=t").unwrap_err();
        assert!(matches!(err, LoadError::NoCompiler));
        assert_eq!(*closed.borrow(), 1);
    }

    #[test]
    fn test_standard_stream_never_closed() {
        let mut vm = VM::new();
        let (stream, closed) = tracked(b"", true);
        let _ = stream_to_closure(&mut vm, stream, STDIN_CHUNK);
        assert_eq!(*closed.borrow(), 0);
    }
}
