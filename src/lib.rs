//! # pushwire
//!
//! Connection lifecycle core for push-style HTTP servers: the suspend /
//! resume / flush state machine that sits between a request pipeline and a
//! broadcast mechanism.
//!
//! A client negotiates a transport (long-polling, streaming, sse, ...) via
//! the `X-Push-Transport` header. The [`LifecycleInterceptor`] classifies it,
//! parks the connection awaiting broadcasts, and governs how each broadcast
//! is consumed: cycled transports are resumed after one message, persistent
//! transports stay open and get an explicit flush per message.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pushwire::broadcast::Broadcaster;
//! use pushwire::http::Request;
//! use pushwire::interceptor::{Action, InterceptorOptions, InterceptorStack, LifecycleInterceptor};
//! use pushwire::resource::Resource;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut stack = InterceptorStack::new();
//!     stack.install(Box::new(LifecycleInterceptor::new()), &InterceptorOptions::new());
//!     let broadcaster = Broadcaster::new();
//!
//!     // per request, driven by the surrounding container:
//!     let raw = b"GET /events HTTP/1.1\r\nX-Push-Transport: long-polling\r\n\r\n";
//!     let request = Request::parse(raw).unwrap();
//!     let resource = Arc::new(Resource::new(request, Box::new(Vec::new())));
//!
//!     if stack.inspect(&resource) == Action::Continue {
//!         // ... application handler runs here ...
//!         stack.post_inspect(&resource);
//!         broadcaster.register(&resource);
//!     }
//!
//!     // later, from any producer task:
//!     broadcaster.broadcast("data: hello\n\n").await;
//! }
//! ```

pub mod broadcast;
pub mod http;
pub mod interceptor;
pub mod resource;
pub mod transport;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use broadcast::Broadcaster;
pub use http::{Headers, Method, Request, Response, ResponseSink};
pub use interceptor::{Action, Interceptor, InterceptorOptions, InterceptorStack, LifecycleInterceptor};
pub use resource::{BroadcastEvent, Resource, ResourceEventListener, ResourceState};
pub use transport::{TRANSPORT_HEADER, Transport, TransportCategory};
