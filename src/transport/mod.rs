//! Transport identification and classification.
//!
//! Every connection negotiates a [`Transport`] — the delivery mechanism the
//! client asked for via the [`TRANSPORT_HEADER`] request header. Transports
//! fall into two [`TransportCategory`]s that drive the whole lifecycle
//! policy:
//!
//! | Category     | Physical connection        | Examples                       |
//! |--------------|----------------------------|--------------------------------|
//! | `Cycled`     | one message per connection | jsonp, ajax, long-polling      |
//! | `Persistent` | many messages per connection | streaming, sse, websocket    |
//!
//! Classification is total: every identifier, including ones this crate has
//! never seen, maps to a category. Unknown transports classify as
//! `Persistent` so that a new transport defaults to "keep the connection
//! open and flush explicitly" instead of silently auto-resuming.

use std::fmt;

/// Request header carrying the negotiated transport identifier.
pub const TRANSPORT_HEADER: &str = "X-Push-Transport";

/// The delivery mechanism negotiated for one connection.
///
/// Parsed from the [`TRANSPORT_HEADER`] value with [`str::parse`]; parsing is
/// infallible — unrecognized identifiers become [`Transport::Custom`].
///
/// # Examples
///
/// ```
/// use pushwire::transport::{Transport, TransportCategory};
///
/// let transport: Transport = "long-polling".parse().unwrap();
/// assert_eq!(transport, Transport::LongPolling);
/// assert_eq!(transport.category(), TransportCategory::Cycled);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Transport {
    /// Script-callback polling: the response body is a callback invocation.
    Jsonp,
    /// Plain ajax polling: immediate request/response, no parking.
    Ajax,
    /// Long-polling: the request parks until one message arrives.
    LongPolling,
    /// Chunked HTTP streaming: one response body carries many messages.
    Streaming,
    /// Server-Sent Events.
    Sse,
    /// WebSocket.
    WebSocket,
    /// No transport negotiated (header absent).
    Undefined,
    /// A transport identifier this crate does not know about.
    Custom(String),
}

/// How a transport consumes broadcasts, per connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportCategory {
    /// One logical message per physical connection. The connection is resumed
    /// or closed once a broadcast has been delivered; the client issues a
    /// fresh request for the next message.
    Cycled,
    /// One physical connection carries many messages. The connection stays
    /// open across broadcasts; each delivery is flushed explicitly.
    Persistent,
}

impl Transport {
    /// Returns the canonical identifier string for this transport.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Jsonp => "jsonp",
            Self::Ajax => "ajax",
            Self::LongPolling => "long-polling",
            Self::Streaming => "streaming",
            Self::Sse => "sse",
            Self::WebSocket => "websocket",
            Self::Undefined => "undefined",
            Self::Custom(s) => s.as_str(),
        }
    }

    /// Classifies this transport.
    ///
    /// Pure and total. The cycled set is a fixed enumeration — `Jsonp`,
    /// `Ajax`, and `LongPolling` — everything else, including `Custom` and
    /// `Undefined`, is `Persistent`.
    pub fn category(&self) -> TransportCategory {
        match self {
            Self::Jsonp | Self::Ajax | Self::LongPolling => TransportCategory::Cycled,
            _ => TransportCategory::Persistent,
        }
    }

    /// Returns `true` if this transport cycles one physical connection per
    /// logical message.
    pub fn is_cycled(&self) -> bool {
        self.category() == TransportCategory::Cycled
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Transport {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "jsonp" => Self::Jsonp,
            "ajax" => Self::Ajax,
            "long-polling" => Self::LongPolling,
            "streaming" => Self::Streaming,
            "sse" => Self::Sse,
            "websocket" => Self::WebSocket,
            "undefined" | "" => Self::Undefined,
            _ => Self::Custom(s.to_owned()),
        })
    }
}

impl AsRef<str> for Transport {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycled_set_is_exactly_jsonp_ajax_long_polling() {
        for t in [Transport::Jsonp, Transport::Ajax, Transport::LongPolling] {
            assert_eq!(t.category(), TransportCategory::Cycled, "{t} must cycle");
        }
    }

    #[test]
    fn streaming_family_is_persistent() {
        for t in [Transport::Streaming, Transport::Sse, Transport::WebSocket] {
            assert_eq!(t.category(), TransportCategory::Persistent, "{t}");
        }
    }

    #[test]
    fn unknown_transport_defaults_to_persistent() {
        let t: Transport = "carrier-pigeon".parse().unwrap();
        assert_eq!(t, Transport::Custom("carrier-pigeon".to_owned()));
        assert_eq!(t.category(), TransportCategory::Persistent);
    }

    #[test]
    fn undefined_is_persistent() {
        assert_eq!(Transport::Undefined.category(), TransportCategory::Persistent);
        assert!(!Transport::Undefined.is_cycled());
    }

    #[test]
    fn parse_is_case_insensitive() {
        let t: Transport = "LONG-POLLING".parse().unwrap();
        assert_eq!(t, Transport::LongPolling);
        let t: Transport = "WebSocket".parse().unwrap();
        assert_eq!(t, Transport::WebSocket);
    }

    #[test]
    fn display_round_trips_known_identifiers() {
        for name in ["jsonp", "ajax", "long-polling", "streaming", "sse", "websocket"] {
            let t: Transport = name.parse().unwrap();
            assert_eq!(t.as_str(), name);
        }
    }
}
