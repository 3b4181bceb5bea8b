//! Lifecycle event types and the listener callback contract.

use bytes::Bytes;

/// A broadcast delivered to one resource.
///
/// Carries the message payload only; the listener reaches its resource
/// through its own back-reference, not through the event.
#[derive(Debug, Clone)]
pub struct BroadcastEvent {
    message: Bytes,
}

impl BroadcastEvent {
    /// Creates an event carrying the given message bytes.
    pub fn new(message: impl Into<Bytes>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The broadcast payload.
    pub fn message(&self) -> &Bytes {
        &self.message
    }
}

/// Callback contract for resource lifecycle events.
///
/// All methods default to no-ops, so an implementation overrides only the
/// events it cares about:
///
/// ```
/// use pushwire::resource::{BroadcastEvent, ResourceEventListener};
///
/// struct Printer;
///
/// impl ResourceEventListener for Printer {
///     fn on_broadcast(&self, event: &BroadcastEvent) {
///         println!("got {} bytes", event.message().len());
///     }
/// }
/// ```
///
/// # Contract
///
/// - Listeners are invoked in registration order for a given resource.
/// - `on_broadcast` runs on whatever thread the broadcaster delivers from,
///   so implementations must be `Send + Sync`.
/// - Listeners are never invoked once their resource has terminated; an
///   implementation holding a `Weak` back-reference should still treat a
///   failed upgrade as "connection gone" and return quietly.
pub trait ResourceEventListener: Send + Sync {
    /// A broadcast message was delivered to the owning resource.
    fn on_broadcast(&self, event: &BroadcastEvent) {
        let _ = event;
    }

    /// The owning resource was resumed.
    fn on_resume(&self) {}

    /// The owning resource's connection closed or timed out.
    fn on_disconnect(&self) {}
}
