//! Byte stream abstraction backing message bodies and repository files.
//!
//! A [`Stream`] wraps one underlying byte channel — an in-memory buffer or
//! a file handle opened in some access [`Mode`]. Capability flags
//! (readable/writable/seekable) are computed once from the mode at
//! construction and cached; `close`/`detach` release the handle and reset
//! all cached state, after which every I/O operation fails with
//! [`StreamError::Detached`].
//!
//! Messages own their stream exclusively. Cloning deep-copies: memory
//! buffers are copied outright and file handles are reopened by path, so
//! two message values never alias the same channel.

use crate::ensure;
use crate::protocol::StreamError;
use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Number of bytes moved per read when copying a stream somewhere else.
pub const CHUNK_SIZE: usize = 4096;

/// File access modes, mirroring the classic `fopen` mode table.
///
/// `Create`/`CreatePlus` open an existing file without truncating it and
/// create it when missing, which is what the JSON repositories want for
/// their backing files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `r` — read only, file must exist.
    Read,
    /// `r+` — read and write, file must exist.
    ReadPlus,
    /// `w` — write only, truncate or create.
    Write,
    /// `w+` — read and write, truncate or create.
    WritePlus,
    /// `a` — append only, create when missing.
    Append,
    /// `a+` — read and append, create when missing.
    AppendPlus,
    /// `c` — write only, create when missing, never truncate.
    Create,
    /// `c+` — read and write, create when missing, never truncate.
    CreatePlus,
}

impl Mode {
    pub fn readable(self) -> bool {
        matches!(self, Mode::Read | Mode::ReadPlus | Mode::WritePlus | Mode::AppendPlus | Mode::CreatePlus)
    }

    pub fn writable(self) -> bool {
        !matches!(self, Mode::Read)
    }

    fn open_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            Mode::Read => options.read(true),
            Mode::ReadPlus => options.read(true).write(true),
            Mode::Write => options.write(true).create(true).truncate(true),
            Mode::WritePlus => options.read(true).write(true).create(true).truncate(true),
            Mode::Append => options.append(true).create(true),
            Mode::AppendPlus => options.read(true).append(true).create(true),
            Mode::Create => options.write(true).create(true),
            Mode::CreatePlus => options.read(true).write(true).create(true),
        };
        options
    }

    /// Options for reopening an already-open file when a stream is
    /// deep-copied. Truncating modes must not truncate again.
    fn reopen_options(self) -> OpenOptions {
        let mut options = OpenOptions::new();
        options.read(self.readable()).write(self.writable());
        if matches!(self, Mode::Append | Mode::AppendPlus) {
            options.append(true);
        }
        options
    }
}

#[derive(Debug)]
enum Inner {
    Memory(io::Cursor<Vec<u8>>),
    File { file: File, path: PathBuf, mode: Mode },
}

/// The handle released by [`Stream::detach`].
#[derive(Debug)]
pub enum StreamHandle {
    Memory(Vec<u8>),
    File(File),
}

/// A byte stream with cached capability flags.
#[derive(Debug)]
pub struct Stream {
    inner: Option<Inner>,
    readable: bool,
    writable: bool,
    seekable: bool,
    reached_eof: bool,
}

impl Default for Stream {
    fn default() -> Self {
        Self::memory()
    }
}

impl Stream {
    /// An empty in-memory stream, readable, writable and seekable.
    pub fn memory() -> Self {
        Self::from_bytes(Vec::new())
    }

    /// An in-memory stream over the given bytes, positioned at the start.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            inner: Some(Inner::Memory(io::Cursor::new(bytes.into()))),
            readable: true,
            writable: true,
            seekable: true,
            reached_eof: false,
        }
    }

    /// Opens a file-backed stream. The capability flags are derived from
    /// the mode once and cached for the lifetime of the stream.
    pub fn open(path: impl AsRef<Path>, mode: Mode) -> Result<Self, StreamError> {
        let path = path.as_ref().to_path_buf();
        let file = mode.open_options().open(&path)?;

        Ok(Self {
            inner: Some(Inner::File { file, path, mode }),
            readable: mode.readable(),
            writable: mode.writable(),
            seekable: true,
            reached_eof: false,
        })
    }

    pub fn is_readable(&self) -> bool {
        self.readable
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_seekable(&self) -> bool {
        self.seekable
    }

    /// Whether a read has hit the end of the stream. Mirrors `feof`:
    /// this only turns true after a read comes back empty, and seeking
    /// resets it.
    pub fn eof(&self) -> bool {
        self.reached_eof
    }

    /// The total size in bytes, when the backing channel can report one.
    pub fn size(&self) -> Option<u64> {
        match self.inner.as_ref()? {
            Inner::Memory(cursor) => Some(cursor.get_ref().len() as u64),
            Inner::File { file, .. } => file.metadata().ok().map(|meta| meta.len()),
        }
    }

    /// The current position of the underlying channel.
    pub fn tell(&mut self) -> Result<u64, StreamError> {
        match self.handle_mut()? {
            Inner::Memory(cursor) => Ok(cursor.position()),
            Inner::File { file, .. } => Ok(file.stream_position()?),
        }
    }

    /// Reads up to `n` bytes from the current position.
    ///
    /// An empty result means end of stream and flips the [`eof`](Self::eof)
    /// flag.
    pub fn read(&mut self, n: usize) -> Result<Bytes, StreamError> {
        ensure!(self.readable, StreamError::NotReadable);

        let mut buffer = vec![0u8; n];
        let read = match self.handle_mut()? {
            Inner::Memory(cursor) => cursor.read(&mut buffer)?,
            Inner::File { file, .. } => file.read(&mut buffer)?,
        };

        if read == 0 {
            self.reached_eof = true;
        }

        buffer.truncate(read);
        Ok(Bytes::from(buffer))
    }

    /// Writes the whole buffer, returning the number of bytes written.
    pub fn write(&mut self, data: &[u8]) -> Result<usize, StreamError> {
        ensure!(self.writable, StreamError::NotWritable);

        match self.handle_mut()? {
            Inner::Memory(cursor) => cursor.write_all(data)?,
            Inner::File { file, .. } => file.write_all(data)?,
        }

        Ok(data.len())
    }

    pub fn seek(&mut self, position: SeekFrom) -> Result<u64, StreamError> {
        ensure!(self.seekable, StreamError::NotSeekable);

        let position = match self.handle_mut()? {
            Inner::Memory(cursor) => cursor.seek(position)?,
            Inner::File { file, .. } => file.seek(position)?,
        };

        self.reached_eof = false;
        Ok(position)
    }

    pub fn rewind(&mut self) -> Result<(), StreamError> {
        self.seek(SeekFrom::Start(0)).map(drop)
    }

    /// Reads everything from the current position to the end. Bytes that
    /// are not valid UTF-8 are replaced.
    pub fn contents(&mut self) -> Result<String, StreamError> {
        ensure!(self.readable, StreamError::NotReadable);

        let mut buffer = Vec::new();
        match self.handle_mut()? {
            Inner::Memory(cursor) => cursor.read_to_end(&mut buffer)?,
            Inner::File { file, .. } => file.read_to_end(&mut buffer)?,
        };

        self.reached_eof = true;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Best-effort full read: rewind and return everything, or an empty
    /// string when the stream cannot be rewound or read.
    pub fn full_string(&mut self) -> String {
        if self.rewind().is_err() {
            return String::new();
        }

        self.contents().unwrap_or_default()
    }

    /// Closes the underlying channel and resets all cached state to
    /// unusable.
    pub fn close(&mut self) {
        self.inner = None;
        self.readable = false;
        self.writable = false;
        self.seekable = false;
        self.reached_eof = false;
    }

    /// Releases the underlying channel to the caller and resets all cached
    /// state, like [`close`](Self::close) but without dropping the handle.
    pub fn detach(&mut self) -> Option<StreamHandle> {
        let inner = self.inner.take();
        self.close();

        match inner? {
            Inner::Memory(cursor) => Some(StreamHandle::Memory(cursor.into_inner())),
            Inner::File { file, .. } => Some(StreamHandle::File(file)),
        }
    }

    fn handle_mut(&mut self) -> Result<&mut Inner, StreamError> {
        self.inner.as_mut().ok_or(StreamError::Detached)
    }

    fn detached() -> Self {
        Self { inner: None, readable: false, writable: false, seekable: false, reached_eof: false }
    }
}

impl Clone for Stream {
    /// Deep copy. Memory buffers are copied; file handles are reopened by
    /// path and positioned where the original is. When the path cannot be
    /// reopened the clone is detached and fails loudly at first use.
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            None => return Self::detached(),
            Some(Inner::Memory(cursor)) => {
                let mut copy = io::Cursor::new(cursor.get_ref().clone());
                copy.set_position(cursor.position());
                Inner::Memory(copy)
            }
            Some(Inner::File { file, path, mode }) => {
                let mut original = file;
                let position = original.stream_position().unwrap_or(0);

                match mode.reopen_options().open(path) {
                    Ok(mut reopened) => {
                        if let Err(cause) = reopened.seek(SeekFrom::Start(position)) {
                            warn!(path = %path.display(), %cause, "failed to position reopened stream");
                        }
                        Inner::File { file: reopened, path: path.clone(), mode: *mode }
                    }
                    Err(cause) => {
                        warn!(path = %path.display(), %cause, "failed to reopen stream for deep copy");
                        return Self::detached();
                    }
                }
            }
        };

        Self {
            inner: Some(inner),
            readable: self.readable,
            writable: self.writable,
            seekable: self.seekable,
            reached_eof: self.reached_eof,
        }
    }
}
