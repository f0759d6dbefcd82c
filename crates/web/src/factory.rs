//! Builds one [`ServerRequest`] from one [`Environment`] snapshot.

use crate::environment::{Environment, FileSource, FileUpload};
use realtor_http::protocol::{
    HeaderMap, Method, Request, ServerRequest, Stream, StreamError, UploadErrorCode, UploadedFile, Uri, UriError,
    MessageError, Version,
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("missing server parameter: {name}")]
    MissingServerParam { name: &'static str },

    #[error("unknown upload error code: {code}")]
    UnknownUploadErrorCode { code: u8 },

    #[error("message error: {source}")]
    Message {
        #[from]
        source: MessageError,
    },

    #[error("uri error: {source}")]
    Uri {
        #[from]
        source: UriError,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },
}

/// The factory at the environment boundary: everything request-shaped the
/// application sees comes out of [`from_env`](ServerRequestFactory::from_env).
#[derive(Debug, Default)]
pub struct ServerRequestFactory;

impl ServerRequestFactory {
    pub fn from_env(env: &Environment) -> Result<ServerRequest, FactoryError> {
        let method: Method = env
            .server
            .get("REQUEST_METHOD")
            .ok_or(FactoryError::MissingServerParam { name: "REQUEST_METHOD" })?
            .parse()?;

        let version: Version = env
            .server
            .get("SERVER_PROTOCOL")
            .map(|protocol| protocol.trim_start_matches("HTTP/"))
            .unwrap_or("1.1")
            .parse()?;

        let request = Request::new(
            method,
            version,
            Self::uri_from(env)?,
            Self::headers_from(&env.server),
            Stream::from_bytes(env.body.clone()),
        );

        Ok(ServerRequest::new(
            request,
            Self::params_from(&env.server),
            env.cookies.clone(),
            Self::files_from(env)?,
            env.form.clone(),
        ))
    }

    /// Composes the request URI from the environment: `HTTPS` decides the
    /// scheme, `HTTP_HOST` (falling back to `SERVER_NAME`) the host,
    /// `SERVER_PORT`, `REMOTE_USER`, `REQUEST_URI` and `QUERY_STRING` the
    /// rest.
    fn uri_from(env: &Environment) -> Result<Uri, UriError> {
        let lookup = |name: &str| env.server.get(name).map(String::as_str).unwrap_or("");

        let scheme = match lookup("HTTPS") {
            "" | "off" => "http",
            _ => "https",
        };

        let host = match lookup("HTTP_HOST") {
            "" => lookup("SERVER_NAME"),
            host => host,
        };
        // A proxied HTTP_HOST may carry the port; the Uri keeps them apart.
        let (host, host_port) = match host.split_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().ok()),
            None => (host, None),
        };

        let port = host_port.or_else(|| lookup("SERVER_PORT").parse().ok());

        let path = match lookup("REQUEST_URI") {
            "" => "/",
            target => target.split_once('?').map(|(path, _)| path).unwrap_or(target),
        };

        let uri = Uri::default()
            .with_scheme(scheme)?
            .with_host(host)
            .with_port(port)?
            .with_user_info(lookup("REMOTE_USER"), None)
            .with_path(path)
            .with_query(lookup("QUERY_STRING"));

        Ok(uri)
    }

    /// Lifts `HTTP_*` server parameters back into HTTP header names:
    /// `HTTP_USER_AGENT` → `User-Agent`, with `CONTENT_TYPE` and
    /// `CONTENT_LENGTH` handled despite their missing prefix. A name
    /// outside the token grammar is dropped, not fatal — the transport
    /// already accepted the request.
    fn headers_from(server: &HashMap<String, String>) -> HeaderMap {
        let mut headers = HeaderMap::new();

        for (key, value) in server {
            let name = match key.as_str() {
                "CONTENT_TYPE" => "Content-Type".to_string(),
                "CONTENT_LENGTH" => "Content-Length".to_string(),
                _ => match key.strip_prefix("HTTP_") {
                    Some(stripped) => http_name(stripped),
                    None => continue,
                },
            };

            if let Err(cause) = headers.set(&name, vec![value.clone()]) {
                warn!(%cause, "dropping header outside the token grammar");
            }
        }

        headers
    }

    /// The server-parameter snapshot: everything that is not a header.
    fn params_from(server: &HashMap<String, String>) -> HashMap<String, String> {
        server
            .iter()
            .filter(|(key, _)| {
                !key.starts_with("HTTP_") && key.as_str() != "CONTENT_TYPE" && key.as_str() != "CONTENT_LENGTH"
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    fn files_from(env: &Environment) -> Result<Vec<UploadedFile>, FactoryError> {
        let mut files = Vec::with_capacity(env.files.len());

        for descriptor in &env.files {
            let FileUpload { source, size, error_code, client_filename, client_media_type } = descriptor;

            let error = UploadErrorCode::from_code(*error_code)
                .ok_or(FactoryError::UnknownUploadErrorCode { code: *error_code })?;

            let file = match source {
                FileSource::Path(path) => {
                    UploadedFile::from_path(path, *size, error, client_filename.clone(), client_media_type.clone())?
                }
                FileSource::Bytes(bytes) => UploadedFile::new(
                    Stream::from_bytes(bytes.clone()),
                    *size,
                    error,
                    client_filename.clone(),
                    client_media_type.clone(),
                ),
            };

            files.push(file);
        }

        Ok(files)
    }
}

/// `USER_AGENT` → `User-Agent`.
fn http_name(cgi: &str) -> String {
    cgi.split('_')
        .map(|word| {
            let word = word.to_ascii_lowercase();
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => word,
            }
        })
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use indoc::indoc;
    use realtor_http::protocol::{Message, Scheme};
    use serde_json::json;

    fn env_from(raw: &str) -> Environment {
        Environment::from_raw(raw.as_bytes()).unwrap()
    }

    #[test]
    fn builds_a_server_request_from_a_raw_snapshot() {
        let env = env_from(indoc! {"
            GET /users/alice/?full=1 HTTP/1.1\r
            Host: example.com:8080\r
            User-Agent: curl/7.79.1\r
            Cookie: session=s1\r
            \r
        "});

        let request = ServerRequestFactory::from_env(&env).unwrap();

        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.uri().scheme(), Scheme::Http);
        assert_eq!(request.uri().host(), "example.com");
        assert_eq!(request.uri().port(), Some(8080));
        assert_eq!(request.uri().path(), "/users/alice/");
        assert_eq!(request.uri().query(), "full=1");

        assert_eq!(request.header_line("user-agent"), "curl/7.79.1");
        assert_eq!(request.header_line("host"), "example.com:8080");
        assert_eq!(request.cookie_params()["session"], "s1");

        assert_eq!(request.query_params()["full"], json!("1"));

        // Headers are not duplicated into the server params.
        assert!(!request.server_params().contains_key("HTTP_USER_AGENT"));
        assert!(request.server_params().contains_key("REQUEST_METHOD"));
    }

    #[test]
    fn content_type_reaches_the_parsed_body() {
        let raw = "POST /users/ HTTP/1.1\r\nHost: x\r\nContent-Type: application/json\r\n\r\n{\"email\":\"a@b.c\"}";
        let env = env_from(raw);

        let mut request = ServerRequestFactory::from_env(&env).unwrap();
        assert_eq!(request.header_line("content-type"), "application/json");

        let body = request.parsed_body().as_value().unwrap().clone();
        assert_eq!(body["email"], json!("a@b.c"));
    }

    #[test]
    fn https_flag_selects_the_scheme() {
        let mut env = env_from("GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        env.server.insert("HTTPS".to_string(), "on".to_string());

        let request = ServerRequestFactory::from_env(&env).unwrap();
        assert_eq!(request.uri().scheme(), Scheme::Https);
    }

    #[test]
    fn missing_method_is_a_factory_error() {
        let mut env = env_from("GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        env.server.remove("REQUEST_METHOD");

        assert!(matches!(
            ServerRequestFactory::from_env(&env),
            Err(FactoryError::MissingServerParam { name: "REQUEST_METHOD" })
        ));
    }

    #[test]
    fn upload_descriptors_become_uploaded_files() {
        let mut env = env_from("POST /app/properties/ HTTP/1.1\r\nHost: x\r\n\r\n");
        env.files.push(FileUpload {
            source: FileSource::Bytes(b"fake image".to_vec()),
            size: Some(10),
            error_code: 0,
            client_filename: "house.jpg".to_string(),
            client_media_type: "image/jpeg".to_string(),
        });

        let request = ServerRequestFactory::from_env(&env).unwrap();
        let files = request.uploaded_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].client_media_type(), "image/jpeg");
        assert!(files[0].error().is_ok());
    }

    #[test]
    fn unknown_upload_error_codes_are_rejected() {
        let mut env = env_from("POST / HTTP/1.1\r\nHost: x\r\n\r\n");
        env.files.push(FileUpload {
            source: FileSource::Bytes(Vec::new()),
            size: None,
            error_code: 9,
            client_filename: "f".to_string(),
            client_media_type: "t".to_string(),
        });

        assert!(matches!(
            ServerRequestFactory::from_env(&env),
            Err(FactoryError::UnknownUploadErrorCode { code: 9 })
        ));
    }
}
