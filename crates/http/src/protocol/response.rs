//! Outgoing response value: a status code from the recognized table plus
//! the shared message parts.

use crate::protocol::{Message, MessageError, MessageParts};

/// An immutable HTTP response.
///
/// The status code is guaranteed to be in the recognized table —
/// [`with_status`](Response::with_status) rejects anything else — so the
/// reason phrase can always be derived.
#[derive(Debug, Clone, Default)]
pub struct Response {
    parts: MessageParts,
    status: Status,
}

/// Newtype wrapper so the default status is 200 rather than 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Status(u16);

impl Default for Status {
    fn default() -> Self {
        Status(200)
    }
}

impl Response {
    /// A fresh `200 OK` response with no headers and an empty body.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status_code(&self) -> u16 {
        self.status.0
    }

    /// The reason phrase for the current status code.
    pub fn reason_phrase(&self) -> &'static str {
        reason_phrase(self.status.0).unwrap_or("")
    }

    /// Replaces the status code. Codes outside the recognized table are
    /// rejected; the controller-facing `status` helper is the place where
    /// unknown codes degrade to 500.
    pub fn with_status(mut self, code: u16) -> Result<Self, MessageError> {
        if !Self::recognizes(code) {
            return Err(MessageError::UnknownStatus { code });
        }

        self.status = Status(code);
        Ok(self)
    }

    /// Whether a code is in the recognized status table.
    pub fn recognizes(code: u16) -> bool {
        reason_phrase(code).is_some()
    }
}

impl Message for Response {
    fn parts(&self) -> &MessageParts {
        &self.parts
    }

    fn parts_mut(&mut self) -> &mut MessageParts {
        &mut self.parts
    }
}

/// The fixed status table. Returns `None` for unrecognized codes.
pub fn reason_phrase(code: u16) -> Option<&'static str> {
    let phrase = match code {
        100 => "Continue",
        101 => "Switching Protocols",
        102 => "Processing",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        207 => "Multi-Status",
        208 => "Already Reported",
        226 => "IM Used",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        308 => "Permanent Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Payload Too Large",
        414 => "URI Too Long",
        415 => "Unsupported Media Type",
        416 => "Range Not Satisfiable",
        417 => "Expectation Failed",
        418 => "I'm a teapot",
        421 => "Misdirected Request",
        422 => "Unprocessable Entity",
        423 => "Locked",
        424 => "Failed Dependency",
        426 => "Upgrade Required",
        428 => "Precondition Required",
        429 => "Too Many Requests",
        431 => "Request Header Fields Too Large",
        451 => "Unavailable For Legal Reasons",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        506 => "Variant Also Negotiates",
        507 => "Insufficient Storage",
        508 => "Loop Detected",
        510 => "Not Extended",
        511 => "Network Authentication Required",
        _ => return None,
    };

    Some(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Stream;

    #[test]
    fn defaults_to_200_ok() {
        let response = Response::new();
        assert_eq!(response.status_code(), 200);
        assert_eq!(response.reason_phrase(), "OK");
    }

    #[test]
    fn with_status_accepts_recognized_codes() {
        let response = Response::new().with_status(404).unwrap();
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.reason_phrase(), "Not Found");
    }

    #[test]
    fn with_status_rejects_unknown_codes() {
        assert!(matches!(Response::new().with_status(999), Err(MessageError::UnknownStatus { code: 999 })));
        assert!(Response::new().with_status(299).is_err());
        assert!(!Response::recognizes(999));
        assert!(Response::recognizes(204));
    }

    #[test]
    fn mutators_compose_into_a_new_response() {
        let mut response = Response::new()
            .with_status(201)
            .unwrap()
            .with_header("Content-Type", "application/json")
            .unwrap()
            .with_body(Stream::from_bytes(b"{}".to_vec()));

        assert_eq!(response.status_code(), 201);
        assert_eq!(response.header_line("content-type"), "application/json");
        assert_eq!(response.body_mut().contents().unwrap(), "{}");
    }
}
