//! Automatic suspend/resume management per transport.
//!
//! [`LifecycleInterceptor`] relieves application handlers of calling
//! [`Resource::suspend`] themselves. Before the handler runs it establishes
//! the resumption policy for the negotiated transport; after the handler has
//! written any initial body it parks the connection awaiting broadcasts,
//! provided the request method matches the configured trigger.
//!
//! Per transport category:
//!
//! - **Cycled** (jsonp, ajax, long-polling): the resume-on-broadcast flag is
//!   raised at inspect time, so the connection owner resumes the physical
//!   connection once the next broadcast has been written — the client then
//!   issues a fresh request for the next message.
//! - **Persistent** (streaming, sse, websocket, anything unknown): the
//!   connection stays parked across broadcasts and each delivery is flushed
//!   to the client immediately.
//!
//! The client must send the transport negotiation header
//! ([`crate::transport::TRANSPORT_HEADER`]) for this mechanism to engage
//! usefully; without it the transport is `Undefined` and treated as
//! persistent.

use std::sync::{Arc, Weak};

use tracing::{debug, warn};

use crate::resource::{BroadcastEvent, Resource, ResourceEventListener};
use crate::transport::TransportCategory;

use super::{Action, Interceptor, InterceptorOptions};

/// Option key selecting the HTTP method on which auto-suspension engages.
/// Compared case-insensitively against the inbound request method.
/// Default: `GET`.
pub const TRIGGER_METHOD: &str = "lifecycle.trigger-method";

/// Interceptor that suspends resources automatically and manages the
/// response's broadcast-time state (flushing, resuming).
///
/// # Examples
///
/// ```
/// use pushwire::interceptor::{InterceptorOptions, InterceptorStack, LifecycleInterceptor};
/// use pushwire::interceptor::lifecycle::TRIGGER_METHOD;
///
/// let options = InterceptorOptions::new().with(TRIGGER_METHOD, "GET");
/// let mut stack = InterceptorStack::new();
/// stack.install(Box::new(LifecycleInterceptor::new()), &options);
/// ```
#[derive(Debug)]
pub struct LifecycleInterceptor {
    trigger_method: String,
}

impl LifecycleInterceptor {
    /// Creates the interceptor with the default `GET` trigger.
    pub fn new() -> Self {
        Self {
            trigger_method: "GET".to_owned(),
        }
    }

    /// The configured trigger method.
    pub fn trigger_method(&self) -> &str {
        &self.trigger_method
    }
}

impl Default for LifecycleInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl Interceptor for LifecycleInterceptor {
    fn configure(&mut self, options: &InterceptorOptions) {
        if let Some(method) = options.get(TRIGGER_METHOD) {
            self.trigger_method = method.to_owned();
        }
    }

    /// Establishes the resumption policy for the resource's transport.
    ///
    /// Cycled transports get the resume-on-broadcast flag raised; persistent
    /// transports keep it clear. Never short-circuits the pipeline — this
    /// interceptor only configures policy.
    fn inspect(&self, resource: &Arc<Resource>) -> Action {
        match resource.transport().category() {
            TransportCategory::Cycled => resource.set_resume_on_broadcast(true),
            TransportCategory::Persistent => {}
        }
        Action::Continue
    }

    /// Parks the connection once the handler has run.
    ///
    /// When the request method matches the trigger, a broadcast listener is
    /// registered and the resource suspended in one atomic step — no
    /// broadcast can observe a partially-registered resource. Non-matching
    /// methods are left alone; the application decides whether they suspend.
    fn post_inspect(&self, resource: &Arc<Resource>) {
        if !resource.request().method().matches(&self.trigger_method) {
            return;
        }
        let listener = LifecycleListener {
            resource: Arc::downgrade(resource),
        };
        if resource.suspend_with(Arc::new(listener)) {
            debug!(
                resource = resource.id(),
                transport = %resource.transport(),
                "auto-suspended"
            );
        }
    }
}

impl std::fmt::Display for LifecycleInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("connection lifecycle")
    }
}

/// Broadcast-time policy, invoked on whatever task the broadcaster uses.
///
/// Holds a weak back-reference to its resource; a failed upgrade means the
/// connection is gone and the event is dropped quietly.
struct LifecycleListener {
    resource: Weak<Resource>,
}

impl ResourceEventListener for LifecycleListener {
    fn on_broadcast(&self, _event: &BroadcastEvent) {
        let Some(resource) = self.resource.upgrade() else {
            return;
        };
        match resource.transport().category() {
            // The connection owner consumes the resume-on-broadcast flag
            // once the message write completes; nothing to do here.
            TransportCategory::Cycled => {}
            // Push the already-written bytes to the client now. A failed
            // flush means the client is gone; that is logged, never
            // propagated to the broadcaster.
            TransportCategory::Persistent => {
                if let Err(e) = resource.flush() {
                    warn!(resource = resource.id(), error = %e, "broadcast flush failed");
                }
            }
        }
    }
}
