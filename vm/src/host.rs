//! Host I/O seam: where chunk bytes come from and where `print` goes.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// A byte stream handed to the chunk loader.
pub trait ChunkReader: Read {
    /// Process-wide streams (stdin/stdout) are never closed by the loader.
    fn is_standard(&self) -> bool {
        false
    }

    /// Release the underlying resource.
    fn close(self: Box<Self>) -> io::Result<()>;
}

pub trait Host {
    /// Open a named resource (a script path for `loadfile`/`dofile`).
    fn open_resource(&mut self, name: &str) -> io::Result<Box<dyn ChunkReader>>;

    /// The shared standard-input stream.
    fn stdin(&mut self) -> Box<dyn ChunkReader>;

    /// Sink for `print`.
    fn stdout(&mut self) -> &mut dyn Write;
}

/// Filesystem host: resources resolve against `root` unless absolute.
pub struct FsHost {
    root: PathBuf,
    out: io::Stdout,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out: io::stdout(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, name: &str) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl Default for FsHost {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Host for FsHost {
    fn open_resource(&mut self, name: &str) -> io::Result<Box<dyn ChunkReader>> {
        let file = File::open(self.resolve(name))?;
        Ok(Box::new(FileReader::new(file)))
    }

    fn stdin(&mut self) -> Box<dyn ChunkReader> {
        Box::new(StdinReader)
    }

    fn stdout(&mut self) -> &mut dyn Write {
        &mut self.out
    }
}

pub struct FileReader {
    inner: BufReader<File>,
}

impl FileReader {
    pub fn new(file: File) -> Self {
        Self {
            inner: BufReader::new(file),
        }
    }
}

impl Read for FileReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ChunkReader for FileReader {
    fn close(self: Box<Self>) -> io::Result<()> {
        drop(self.inner);
        Ok(())
    }
}

/// In-memory stream, used for `loadstring`/`load` and by tests.
pub struct MemoryReader {
    inner: Cursor<Vec<u8>>,
}

impl MemoryReader {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Cursor::new(bytes.into()),
        }
    }
}

impl Read for MemoryReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl ChunkReader for MemoryReader {
    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

pub struct StdinReader;

impl Read for StdinReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::stdin().lock().read(buf)
    }
}

impl ChunkReader for StdinReader {
    fn is_standard(&self) -> bool {
        true
    }

    fn close(self: Box<Self>) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_host_resolves_relative_to_root() {
        let host = FsHost::new("/srv/scripts");
        assert_eq!(host.resolve("a.lua"), PathBuf::from("/srv/scripts/a.lua"));
        assert_eq!(host.resolve("/tmp/b.lua"), PathBuf::from("/tmp/b.lua"));
    }

    #[test]
    fn test_fs_host_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut host = FsHost::new(dir.path());
        let err = host.open_resource("nope.lua").err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_reader() {
        let mut r = MemoryReader::new(b"return 1".to_vec());
        let mut out = String::new();
        r.read_to_string(&mut out).unwrap();
        assert_eq!(out, "return 1");
        assert!(!r.is_standard());
        assert!(Box::new(r).close().is_ok());
    }

    #[test]
    fn test_stdin_is_standard() {
        assert!(StdinReader.is_standard());
    }
}
