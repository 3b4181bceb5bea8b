//! The per-connection ownership unit and its suspension state machine.
//!
//! A [`Resource`] represents one client's live connection: its negotiated
//! transport, the parsed request, the streaming response, and the suspension
//! state that the lifecycle interceptor drives. Setup (inspect/post-inspect)
//! happens on the request-handling task; broadcasts arrive from arbitrary
//! producer tasks. Every state transition is internally synchronized, and
//! any action on an already-terminated resource is a logged no-op rather
//! than an error — broadcasts and connection teardown race by nature.
//!
//! State machine:
//!
//! ```text
//! Active ──suspend──▶ Suspended ──resume──▶ Resumed
//!    │                    │                    │
//!    └──────close─────────┴───────close───────┴──▶ Terminated (absorbing)
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tracing::debug;

use crate::http::{Request, Response, ResponseSink};
use crate::transport::Transport;

mod event;

pub use event::{BroadcastEvent, ResourceEventListener};

/// Monotonic resource id source, for log correlation only.
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Errors produced by resource I/O operations.
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("I/O fault on response channel: {0}")]
    Io(#[from] io::Error),
}

/// Lifecycle state of a [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Request in flight, not yet parked.
    Active,
    /// Parked awaiting broadcasts.
    Suspended,
    /// Un-parked; the container completes the response.
    Resumed,
    /// Connection closed or timed out. Absorbing.
    Terminated,
}

struct LifecycleInner {
    state: ResourceState,
    listeners: Vec<Arc<dyn ResourceEventListener>>,
}

/// One client connection, as the lifecycle pipeline sees it.
///
/// Shared as `Arc<Resource>` between the request-handling task and the
/// broadcast fan-out. The suspension state and listener list live behind one
/// mutex so that listener registration plus the suspend transition form a
/// single atomic step; the response channel has its own lock so a slow flush
/// never holds up state inspection.
pub struct Resource {
    id: u64,
    transport: Transport,
    request: Request,
    response: Mutex<Response>,
    // Release/acquire pair: the write at inspect time must be visible to the
    // broadcast-delivery task before any broadcast reaches this resource.
    resume_on_broadcast: AtomicBool,
    lifecycle: Mutex<LifecycleInner>,
}

impl Resource {
    /// Creates a resource for the given request, writing its response to
    /// `sink`. The transport is taken from the request's negotiation header.
    pub fn new(request: Request, sink: Box<dyn ResponseSink>) -> Self {
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            transport: request.transport(),
            request,
            response: Mutex::new(Response::new(sink)),
            resume_on_broadcast: AtomicBool::new(false),
            lifecycle: Mutex::new(LifecycleInner {
                state: ResourceState::Active,
                listeners: Vec::new(),
            }),
        }
    }

    /// Stable id for log correlation.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The transport negotiated for this connection.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// The inbound request that opened this connection.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ResourceState {
        self.inner().state
    }

    /// Returns `true` if the resource is parked awaiting broadcasts.
    pub fn is_suspended(&self) -> bool {
        self.state() == ResourceState::Suspended
    }

    /// Returns `true` once the connection has closed. Terminated is absorbing.
    pub fn is_terminated(&self) -> bool {
        self.state() == ResourceState::Terminated
    }

    /// Instructs the connection owner to resume this connection once the
    /// next broadcast has been written out.
    pub fn set_resume_on_broadcast(&self, enable: bool) {
        self.resume_on_broadcast.store(enable, Ordering::Release);
    }

    /// Whether the connection owner should resume after the next broadcast.
    pub fn resume_on_broadcast(&self) -> bool {
        self.resume_on_broadcast.load(Ordering::Acquire)
    }

    /// Registers a listener, appending to the invocation order.
    ///
    /// Returns `false` (and drops the listener) if the resource has already
    /// terminated.
    pub fn add_listener(&self, listener: Arc<dyn ResourceEventListener>) -> bool {
        let mut inner = self.inner();
        if inner.state == ResourceState::Terminated {
            debug!(resource = self.id, "listener dropped: resource terminated");
            return false;
        }
        inner.listeners.push(listener);
        true
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner().listeners.len()
    }

    /// Parks the connection awaiting broadcasts.
    ///
    /// Only an `Active` resource can suspend; a second suspend without an
    /// intervening resume is a no-op returning `false`, as is suspending a
    /// resumed or terminated resource.
    pub fn suspend(&self) -> bool {
        self.suspend_inner(None)
    }

    /// Registers `listener` and suspends in one atomic step.
    ///
    /// No broadcast can observe the resource suspended without the listener
    /// in place. When the resource is not `Active` nothing happens — neither
    /// the registration nor the transition — and `false` is returned.
    pub fn suspend_with(&self, listener: Arc<dyn ResourceEventListener>) -> bool {
        self.suspend_inner(Some(listener))
    }

    fn suspend_inner(&self, listener: Option<Arc<dyn ResourceEventListener>>) -> bool {
        let mut inner = self.inner();
        if inner.state != ResourceState::Active {
            debug!(resource = self.id, state = ?inner.state, "suspend skipped");
            return false;
        }
        if let Some(listener) = listener {
            inner.listeners.push(listener);
        }
        inner.state = ResourceState::Suspended;
        debug!(resource = self.id, transport = %self.transport, "suspended");
        true
    }

    /// Un-parks a suspended connection.
    ///
    /// Fires `on_resume` on every listener in registration order. A no-op
    /// unless the resource is currently `Suspended`.
    pub fn resume(&self) -> bool {
        let listeners = {
            let mut inner = self.inner();
            if inner.state != ResourceState::Suspended {
                debug!(resource = self.id, state = ?inner.state, "resume skipped");
                return false;
            }
            inner.state = ResourceState::Resumed;
            inner.listeners.clone()
        };
        debug!(resource = self.id, "resumed");
        for listener in &listeners {
            listener.on_resume();
        }
        true
    }

    /// Terminates the resource: the connection closed, timed out, or the
    /// container tore it down.
    ///
    /// Fires `on_disconnect` and clears the listener list. Idempotent;
    /// `Terminated` is absorbing.
    pub fn close(&self) {
        let listeners = {
            let mut inner = self.inner();
            if inner.state == ResourceState::Terminated {
                return;
            }
            inner.state = ResourceState::Terminated;
            std::mem::take(&mut inner.listeners)
        };
        debug!(resource = self.id, "terminated");
        for listener in &listeners {
            listener.on_disconnect();
        }
    }

    /// Delivers a broadcast event to this resource's listeners, in
    /// registration order.
    ///
    /// A broadcast arriving after termination is dropped, not acted on.
    /// Listeners run outside the state lock so they may call back into the
    /// resource; a close racing this delivery is caught again by the I/O
    /// operations, which no-op on a terminated resource.
    pub fn notify_broadcast(&self, event: &BroadcastEvent) {
        let listeners = {
            let inner = self.inner();
            if inner.state == ResourceState::Terminated {
                debug!(resource = self.id, "broadcast dropped: resource terminated");
                return;
            }
            inner.listeners.clone()
        };
        for listener in &listeners {
            listener.on_broadcast(event);
        }
    }

    /// Writes body bytes to the response channel.
    ///
    /// A no-op on a terminated resource.
    pub fn write(&self, buf: &[u8]) -> Result<(), ResourceError> {
        if self.is_terminated() {
            debug!(resource = self.id, "write skipped: resource terminated");
            return Ok(());
        }
        let mut response = self
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        response.write(buf)?;
        Ok(())
    }

    /// Flushes buffered response bytes to the client.
    ///
    /// A no-op on a terminated resource. Blocking, bounded by the underlying
    /// transport's write timeout.
    pub fn flush(&self) -> Result<(), ResourceError> {
        if self.is_terminated() {
            debug!(resource = self.id, "flush skipped: resource terminated");
            return Ok(());
        }
        let mut response = self
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        response.flush()?;
        Ok(())
    }

    /// Applies `f` to the response under its lock. Gives the container access
    /// to headers without exposing the lock itself.
    pub fn with_response<T>(&self, f: impl FnOnce(&mut Response) -> T) -> T {
        let mut response = self
            .response
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut response)
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, LifecycleInner> {
        self.lifecycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("id", &self.id)
            .field("transport", &self.transport)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{Headers, Method, Request};
    use crate::transport::TRANSPORT_HEADER;
    use std::sync::atomic::AtomicUsize;

    fn resource(transport: &str) -> Resource {
        let mut headers = Headers::new();
        headers.insert(TRANSPORT_HEADER, transport);
        let request = Request::new(Method::Get, "/events", headers);
        Resource::new(request, Box::new(Vec::new()))
    }

    #[derive(Default)]
    struct Recorder {
        broadcasts: AtomicUsize,
        resumes: AtomicUsize,
        disconnects: AtomicUsize,
    }

    impl ResourceEventListener for Recorder {
        fn on_broadcast(&self, _event: &BroadcastEvent) {
            self.broadcasts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }
        fn on_disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder() -> (Arc<Recorder>, Arc<dyn ResourceEventListener>) {
        let rec = Arc::new(Recorder::default());
        // method-call form so the unsized coercion applies to the clone's result
        let listener: Arc<dyn ResourceEventListener> = rec.clone();
        (rec, listener)
    }

    #[test]
    fn starts_active_with_flag_clear() {
        let r = resource("long-polling");
        assert_eq!(r.state(), ResourceState::Active);
        assert!(!r.resume_on_broadcast());
        assert_eq!(r.listener_count(), 0);
    }

    #[test]
    fn suspend_transitions_once() {
        let r = resource("streaming");
        assert!(r.suspend());
        assert!(r.is_suspended());
        // second suspend without an intervening resume is a no-op
        assert!(!r.suspend());
        assert_eq!(r.listener_count(), 0);
    }

    #[test]
    fn suspend_with_registers_atomically() {
        let r = resource("streaming");
        let (_rec, listener) = recorder();
        assert!(r.suspend_with(listener));
        assert!(r.is_suspended());
        assert_eq!(r.listener_count(), 1);
    }

    #[test]
    fn suspend_with_on_non_active_registers_nothing() {
        let r = resource("streaming");
        r.suspend();
        let (_rec, listener) = recorder();
        assert!(!r.suspend_with(listener));
        assert_eq!(r.listener_count(), 0);
    }

    #[test]
    fn resume_requires_suspended() {
        let r = resource("long-polling");
        assert!(!r.resume());
        r.suspend();
        assert!(r.resume());
        assert_eq!(r.state(), ResourceState::Resumed);
        // resumed resources cannot re-suspend; a fresh request means a fresh resource
        assert!(!r.suspend());
    }

    #[test]
    fn resume_fires_listeners() {
        let r = resource("long-polling");
        let (rec, listener) = recorder();
        r.suspend_with(listener);
        r.resume();
        assert_eq!(rec.resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn close_is_absorbing_and_fires_disconnect_once() {
        let r = resource("sse");
        let (rec, listener) = recorder();
        r.suspend_with(listener);
        r.close();
        r.close();
        assert!(r.is_terminated());
        assert_eq!(rec.disconnects.load(Ordering::SeqCst), 1);
        assert!(!r.suspend());
        assert!(!r.resume());
    }

    #[test]
    fn broadcast_reaches_listeners_in_order() {
        let r = resource("streaming");
        let order = Arc::new(Mutex::new(Vec::new()));

        struct Tag(Arc<Mutex<Vec<u8>>>, u8);
        impl ResourceEventListener for Tag {
            fn on_broadcast(&self, _event: &BroadcastEvent) {
                self.0.lock().unwrap().push(self.1);
            }
        }

        r.add_listener(Arc::new(Tag(Arc::clone(&order), 1)));
        r.add_listener(Arc::new(Tag(Arc::clone(&order), 2)));
        r.notify_broadcast(&BroadcastEvent::new("msg"));
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn broadcast_after_close_is_dropped() {
        let r = resource("streaming");
        let (rec, listener) = recorder();
        r.suspend_with(listener);
        r.close();
        r.notify_broadcast(&BroadcastEvent::new("late"));
        assert_eq!(rec.broadcasts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_registration_after_close_is_rejected() {
        let r = resource("streaming");
        r.close();
        let (_rec, listener) = recorder();
        assert!(!r.add_listener(listener));
        assert_eq!(r.listener_count(), 0);
    }

    #[test]
    fn io_on_terminated_resource_is_a_noop() {
        let r = resource("streaming");
        r.close();
        assert!(r.write(b"late").is_ok());
        assert!(r.flush().is_ok());
    }

    #[test]
    fn with_response_reaches_the_headers() {
        let r = resource("sse");
        r.with_response(|response| response.add_header("Content-Type", "text/event-stream"));
        let value = r.with_response(|response| {
            response.headers().get("content-type").map(str::to_owned)
        });
        assert_eq!(value.as_deref(), Some("text/event-stream"));
    }

    #[test]
    fn resume_on_broadcast_flag_round_trips() {
        let r = resource("long-polling");
        r.set_resume_on_broadcast(true);
        assert!(r.resume_on_broadcast());
        r.set_resume_on_broadcast(false);
        assert!(!r.resume_on_broadcast());
    }
}
