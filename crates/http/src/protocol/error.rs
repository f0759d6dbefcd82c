use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("uri error: {source}")]
    Uri {
        #[from]
        source: UriError,
    },

    #[error("message error: {source}")]
    Message {
        #[from]
        source: MessageError,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("upload error: {source}")]
    Upload {
        #[from]
        source: UploadFileError,
    },

    #[error("send error: {source}")]
    Send {
        #[from]
        source: SendError,
    },
}

#[derive(Error, Debug)]
pub enum UriError {
    #[error("malformed uri: {raw:?}")]
    Malformed { raw: String },

    #[error("unsupported uri scheme: {scheme:?}")]
    UnsupportedScheme { scheme: String },

    #[error("port out of range: {port}")]
    InvalidPort { port: u32 },
}

impl UriError {
    pub fn malformed<S: ToString>(raw: S) -> Self {
        Self::Malformed { raw: raw.to_string() }
    }

    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum MessageError {
    #[error("invalid header name: {name:?}")]
    InvalidHeaderName { name: String },

    #[error("unsupported protocol version: {version:?}")]
    UnsupportedVersion { version: String },

    #[error("unsupported request method: {method:?}")]
    UnsupportedMethod { method: String },

    #[error("unrecognized status code: {code}")]
    UnknownStatus { code: u16 },

    #[error("parsed body must be a structured value")]
    NotStructured,
}

impl MessageError {
    pub fn invalid_header_name<S: ToString>(name: S) -> Self {
        Self::InvalidHeaderName { name: name.to_string() }
    }

    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    pub fn unsupported_method<S: ToString>(method: S) -> Self {
        Self::UnsupportedMethod { method: method.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("stream handle has been closed or detached")]
    Detached,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum UploadFileError {
    #[error("uploaded file has already been moved")]
    AlreadyMoved,

    #[error("target path must not be empty")]
    EmptyTargetPath,

    #[error("target directory is not writable: {path}")]
    DirectoryNotWritable { path: String },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

#[derive(Error, Debug)]
pub enum SendError {
    #[error("downstream connection is closed")]
    ConnectionClosed,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
