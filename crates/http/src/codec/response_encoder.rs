//! Response head serialization.
//!
//! Turns a [`Response`]'s status line and header block into raw bytes:
//! `HTTP/<version> <code> <reason>` followed by one line per header value
//! in insertion order with original casing, terminated by an empty line.
//! The body is not handled here — the application streams it to the
//! output channel in chunks so it is never buffered whole.

use crate::protocol::{Message, Response, SendError};
use bytes::{BufMut, BytesMut};
use std::io;
use std::io::Write;

/// Initial buffer size reserved for head serialization.
const INIT_HEAD_SIZE: usize = 4 * 1024;

/// Encoder for the response status line and header block.
#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    /// Serializes the status line and headers into `dst`.
    pub fn encode_head(response: &Response, dst: &mut BytesMut) -> Result<(), SendError> {
        dst.reserve(INIT_HEAD_SIZE);

        write!(
            FastWrite(dst),
            "HTTP/{} {} {}\r\n",
            response.protocol_version(),
            response.status_code(),
            response.reason_phrase()
        )?;

        for (name, values) in response.headers().iter() {
            for value in values {
                dst.put_slice(name.as_bytes());
                dst.put_slice(b": ");
                dst.put_slice(value.as_bytes());
                dst.put_slice(b"\r\n");
            }
        }
        dst.put_slice(b"\r\n");

        Ok(())
    }
}

/// Writer shim over `BytesMut` so `write!` can target the buffer without
/// an intermediate string.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_status_line_and_headers() {
        let response = Response::new()
            .with_status(201)
            .unwrap()
            .with_header("Content-Type", "application/json")
            .unwrap()
            .with_header("Content-Length", "2")
            .unwrap();

        let mut head = BytesMut::new();
        ResponseEncoder::encode_head(&response, &mut head).unwrap();

        let head = String::from_utf8(head.to_vec()).unwrap();
        assert_eq!(head, "HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n");
    }

    #[test]
    fn repeats_multi_value_headers_per_line() {
        let response = Response::new()
            .with_header("Set-Cookie", vec!["a=1".to_string(), "b=2".to_string()])
            .unwrap();

        let mut head = BytesMut::new();
        ResponseEncoder::encode_head(&response, &mut head).unwrap();

        let head = String::from_utf8(head.to_vec()).unwrap();
        assert!(head.contains("Set-Cookie: a=1\r\n"));
        assert!(head.contains("Set-Cookie: b=2\r\n"));
    }

    #[test]
    fn a_bare_response_is_just_the_status_line() {
        let mut head = BytesMut::new();
        ResponseEncoder::encode_head(&Response::new(), &mut head).unwrap();
        assert_eq!(&head[..], b"HTTP/1.1 200 OK\r\n\r\n");
    }
}
