//! Uploaded-file value object.

use crate::ensure;
use crate::protocol::{CHUNK_SIZE, Mode, Stream, StreamError, UploadFileError};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Upload outcome codes reported by the ambient environment alongside each
/// file. [`Ok`](UploadErrorCode::Ok) means the upload itself succeeded;
/// everything else describes why the file content is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorCode {
    Ok,
    ExceedsMaxSize,
    ExceedsFormSize,
    Partial,
    Missing,
    NoTempDir,
    WriteFailed,
    BlockedByExtension,
}

impl UploadErrorCode {
    pub fn is_ok(self) -> bool {
        matches!(self, UploadErrorCode::Ok)
    }

    /// Maps the conventional CGI upload error integers onto the fixed
    /// enumeration. Unknown codes yield `None`; the factory rejects them.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(UploadErrorCode::Ok),
            1 => Some(UploadErrorCode::ExceedsMaxSize),
            2 => Some(UploadErrorCode::ExceedsFormSize),
            3 => Some(UploadErrorCode::Partial),
            4 => Some(UploadErrorCode::Missing),
            6 => Some(UploadErrorCode::NoTempDir),
            7 => Some(UploadErrorCode::WriteFailed),
            8 => Some(UploadErrorCode::BlockedByExtension),
            _ => None,
        }
    }
}

/// One uploaded resource: a stream plus the untrusted metadata the client
/// sent along with it.
///
/// The client filename and media type are advisory only — nothing here
/// trusts them beyond reporting; callers doing extension whitelisting must
/// treat them as hostile input.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    stream: Stream,
    size: Option<u64>,
    error: UploadErrorCode,
    client_filename: String,
    client_media_type: String,
    moved: bool,
}

impl UploadedFile {
    pub fn new(
        stream: Stream,
        size: Option<u64>,
        error: UploadErrorCode,
        client_filename: impl Into<String>,
        client_media_type: impl Into<String>,
    ) -> Self {
        Self {
            stream,
            size,
            error,
            client_filename: client_filename.into(),
            client_media_type: client_media_type.into(),
            moved: false,
        }
    }

    /// Wraps a file already sitting on disk (the usual temp-file case).
    pub fn from_path(
        path: impl AsRef<Path>,
        size: Option<u64>,
        error: UploadErrorCode,
        client_filename: impl Into<String>,
        client_media_type: impl Into<String>,
    ) -> Result<Self, StreamError> {
        let stream = Stream::open(path, Mode::Read)?;
        Ok(Self::new(stream, size, error, client_filename, client_media_type))
    }

    pub fn stream_mut(&mut self) -> &mut Stream {
        &mut self.stream
    }

    /// Size in bytes as reported by the environment, or `None` when
    /// unknown.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    pub fn error(&self) -> UploadErrorCode {
        self.error
    }

    pub fn client_filename(&self) -> &str {
        &self.client_filename
    }

    pub fn client_media_type(&self) -> &str {
        &self.client_media_type
    }

    pub fn is_moved(&self) -> bool {
        self.moved
    }

    /// Streams the file's full contents to `target` in bounded chunks and
    /// marks this instance moved. A second call fails with
    /// [`UploadFileError::AlreadyMoved`] regardless of arguments.
    ///
    /// The copy is not atomic: a failure mid-stream can leave a partial
    /// file at the target. Callers needing atomicity must stage the copy
    /// themselves.
    pub fn move_to(&mut self, target: impl AsRef<Path>) -> Result<(), UploadFileError> {
        ensure!(!self.moved, UploadFileError::AlreadyMoved);

        let target = target.as_ref();
        ensure!(!target.as_os_str().is_empty(), UploadFileError::EmptyTargetPath);

        let directory = target.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        if !directory.is_dir() {
            return Err(UploadFileError::DirectoryNotWritable { path: directory.display().to_string() });
        }

        let mut handle = File::create(target)?;

        self.stream.rewind()?;
        loop {
            let chunk = self.stream.read(CHUNK_SIZE)?;
            if chunk.is_empty() {
                break;
            }
            handle.write_all(&chunk)?;
        }

        self.moved = true;
        Ok(())
    }
}
