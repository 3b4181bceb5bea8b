//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;
use tracing::debug;

use crate::transport::{TRANSPORT_HEADER, Transport};

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete — more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },
}

/// A parsed inbound request, as seen by the lifecycle pipeline.
///
/// Created by [`Request::parse`] from a raw byte buffer, or assembled
/// directly with [`Request::new`] when the surrounding container has already
/// done its own parsing.
///
/// # Examples
///
/// ```
/// use pushwire::http::Request;
/// use pushwire::transport::Transport;
///
/// let raw = b"GET /chat HTTP/1.1\r\nHost: localhost\r\nX-Push-Transport: long-polling\r\n\r\n";
/// let request = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "GET");
/// assert_eq!(request.path(), "/chat");
/// assert_eq!(request.transport(), Transport::LongPolling);
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: Headers,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Assembles a request from already-parsed parts.
    pub fn new(method: Method, path: impl Into<String>, headers: Headers) -> Self {
        Self {
            method,
            path: path.into(),
            headers,
            body: Bytes::new(),
        }
    }

    /// Parse a raw HTTP/1.1 request from a byte slice.
    ///
    /// Everything after the `\r\n\r\n` header terminator is taken as the
    /// body; chunked and length-delimited body framing belongs to the
    /// container, not to this crate.
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`] — more data is needed to complete the headers.
    /// - [`RequestError::Parse`] — the data is malformed.
    /// - [`RequestError::MissingField`] — method or path is absent.
    pub fn parse(buf: &[u8]) -> Result<Self, RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw = httparse::Request::new(&mut headers);

        let body_offset = match raw.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method: Method = raw
            .method
            .ok_or(RequestError::MissingField { field: "method" })?
            .parse()
            .unwrap(); // Infallible

        let path = raw
            .path
            .ok_or(RequestError::MissingField { field: "path" })?
            .to_owned();

        let mut header_map = Headers::with_capacity(raw.headers.len());
        for header in raw.headers.iter() {
            match std::str::from_utf8(header.value) {
                Ok(value) => header_map.insert(header.name, value),
                Err(_) => {
                    debug!(header = header.name, "header skipped: value is not valid UTF-8");
                }
            }
        }

        Ok(Self {
            method,
            path,
            headers: header_map,
            body: Bytes::copy_from_slice(&buf[body_offset..]),
        })
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the transport the client negotiated via the
    /// [`TRANSPORT_HEADER`] header.
    ///
    /// An absent header yields [`Transport::Undefined`], which classifies as
    /// persistent.
    pub fn transport(&self) -> Transport {
        match self.headers.get(TRANSPORT_HEADER) {
            Some(value) => value.parse().unwrap(), // Infallible
            None => Transport::Undefined,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /events HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/events");
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert!(req.body().is_empty());
    }

    #[test]
    fn transport_from_header() {
        let raw = b"GET / HTTP/1.1\r\nX-Push-Transport: websocket\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.transport(), Transport::WebSocket);
    }

    #[test]
    fn missing_transport_header_is_undefined() {
        let raw = b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.transport(), Transport::Undefined);
    }

    #[test]
    fn non_utf8_header_value_is_skipped_not_fatal() {
        let raw = b"GET / HTTP/1.1\r\nX-Push-Transport: \xFF\xFEbad\r\nHost: localhost\r\n\r\n";
        let req = Request::parse(raw).unwrap();
        assert!(!req.headers().contains(TRANSPORT_HEADER));
        assert_eq!(req.transport(), Transport::Undefined);
        assert_eq!(req.headers().get("host"), Some("localhost"));
    }

    #[test]
    fn incomplete_request() {
        let raw = b"GET / HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn body_follows_headers() {
        let raw = b"POST /send HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello";
        let req = Request::parse(raw).unwrap();
        assert_eq!(req.body().as_ref(), b"hello");
    }

    #[test]
    fn assembled_request() {
        let mut headers = Headers::new();
        headers.insert(TRANSPORT_HEADER, "sse");
        let req = Request::new(Method::Get, "/stream", headers);
        assert_eq!(req.transport(), Transport::Sse);
        assert!(req.body().is_empty());
    }
}
