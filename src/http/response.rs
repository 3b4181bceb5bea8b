//! Streaming HTTP response over a pluggable output sink.
//!
//! A suspended connection does not serialize its response once; it writes
//! message bytes incrementally and flushes them to the client as broadcasts
//! arrive. [`Response`] therefore wraps a [`ResponseSink`] — the container's
//! handle on the underlying socket — instead of buffering a final body.

use std::io;

use super::Headers;

/// The container-owned output channel of one connection.
///
/// Implementations wrap whatever the surrounding server writes to: a TCP
/// stream, a chunked-encoding writer, an in-memory buffer in tests. Both
/// operations may block; they are bounded by the transport's own write
/// timeout, which the container configures.
pub trait ResponseSink: Send {
    /// Appends bytes to the connection's output buffer.
    fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Forces buffered output to the client.
    ///
    /// Fails with an I/O error when the client is gone; callers on the
    /// broadcast path are expected to log and swallow that failure.
    fn flush(&mut self) -> io::Result<()>;
}

/// In-memory sink. Writes append, flush is a no-op. Useful for demos and
/// tests that only care about what was written.
impl ResponseSink for Vec<u8> {
    fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.extend_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The live response attached to one connection.
///
/// Headers accumulate until the container commits them; body bytes go
/// straight to the sink.
///
/// # Examples
///
/// ```
/// use pushwire::http::Response;
///
/// let mut response = Response::new(Box::new(Vec::new()));
/// response.add_header("Content-Type", "text/event-stream");
/// response.write(b"data: hello\n\n").unwrap();
/// response.flush().unwrap();
/// ```
pub struct Response {
    headers: Headers,
    sink: Box<dyn ResponseSink>,
}

impl Response {
    /// Creates a response writing to the given sink.
    pub fn new(sink: Box<dyn ResponseSink>) -> Self {
        Self {
            headers: Headers::new(),
            sink,
        }
    }

    /// Appends a response header.
    pub fn add_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name, value);
    }

    /// Returns the response headers accumulated so far.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Writes body bytes to the sink.
    pub fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.sink.write(buf)
    }

    /// Flushes buffered output to the client.
    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Sink that shares its buffer with the test.
    struct SharedSink(Arc<Mutex<Vec<u8>>>);

    impl ResponseSink for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<()> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Sink whose flush always fails, as if the client disconnected.
    struct BrokenSink;

    impl ResponseSink for BrokenSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<()> {
            Ok(())
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
        }
    }

    #[test]
    fn writes_reach_the_sink() {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let mut response = Response::new(Box::new(SharedSink(Arc::clone(&buffer))));
        response.write(b"one").unwrap();
        response.write(b"two").unwrap();
        assert_eq!(buffer.lock().unwrap().as_slice(), b"onetwo");
    }

    #[test]
    fn flush_failure_surfaces_as_io_error() {
        let mut response = Response::new(Box::new(BrokenSink));
        let err = response.flush().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn headers_accumulate() {
        let mut response = Response::new(Box::new(Vec::new()));
        response.add_header("Cache-Control", "no-cache");
        assert_eq!(response.headers().get("cache-control"), Some("no-cache"));
    }
}
