//! Broadcast fan-out to suspended resources.
//!
//! [`Broadcaster`] is the delivery side of the lifecycle contract: it writes
//! a message to every registered live resource, fires that resource's
//! listeners in registration order, and consumes the resume-on-broadcast
//! flag so cycled connections are un-parked once their message is out.
//!
//! Delivery to each resource runs in its own Tokio task — one resource's
//! slow or failing sink never delays another's, and a panicking listener is
//! contained to its task and logged. Message routing and topic semantics
//! live above this crate; a `Broadcaster` is one fan-out group.

use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::resource::{BroadcastEvent, Resource, ResourceState};

/// Fans broadcast messages out to its registered resources.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use pushwire::broadcast::Broadcaster;
/// use pushwire::http::Request;
/// use pushwire::resource::Resource;
///
/// # async fn demo(request: Request) {
/// let broadcaster = Broadcaster::new();
/// let resource = Arc::new(Resource::new(request, Box::new(Vec::new())));
/// broadcaster.register(&resource);
/// broadcaster.broadcast("data: hello\n\n").await;
/// # }
/// ```
#[derive(Default)]
pub struct Broadcaster {
    resources: Mutex<Vec<Arc<Resource>>>,
}

impl Broadcaster {
    /// Creates an empty fan-out group.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource to this fan-out group. Registering the same resource
    /// twice is a no-op.
    pub fn register(&self, resource: &Arc<Resource>) {
        let mut resources = self.lock();
        if resources.iter().any(|r| r.id() == resource.id()) {
            return;
        }
        resources.push(Arc::clone(resource));
    }

    /// Removes a resource from this fan-out group.
    pub fn unregister(&self, resource: &Arc<Resource>) {
        self.lock().retain(|r| r.id() != resource.id());
    }

    /// Number of currently registered resources.
    pub fn resource_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers `message` to every registered live resource.
    ///
    /// Returns the number of resources the message reached. Resources that
    /// terminated since registration are pruned, not delivered to; resources
    /// resumed by this delivery (cycled transports) are unregistered
    /// afterwards — their next physical request registers a fresh resource.
    pub async fn broadcast(&self, message: impl Into<Bytes>) -> usize {
        let message = message.into();
        let targets: Vec<Arc<Resource>> = {
            let mut resources = self.lock();
            resources.retain(|r| !r.is_terminated());
            resources.clone()
        };

        let mut handles = Vec::with_capacity(targets.len());
        for resource in targets {
            let message = message.clone();
            handles.push(tokio::spawn(async move {
                deliver(&resource, message)
            }));
        }

        let mut delivered = 0;
        for handle in handles {
            match handle.await {
                Ok(true) => delivered += 1,
                Ok(false) => {}
                // A panicking listener is contained to its delivery task.
                Err(e) => warn!(error = %e, "broadcast delivery task failed"),
            }
        }

        // Drop resources this delivery resumed or that closed meanwhile.
        self.lock()
            .retain(|r| matches!(r.state(), ResourceState::Active | ResourceState::Suspended));

        delivered
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<Resource>>> {
        self.resources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Delivers one message to one resource: write, notify listeners, then
/// consume the resume-on-broadcast flag.
fn deliver(resource: &Arc<Resource>, message: Bytes) -> bool {
    if resource.is_terminated() {
        debug!(resource = resource.id(), "delivery skipped: resource terminated");
        return false;
    }
    if let Err(e) = resource.write(&message) {
        // the client is gone; close now so later broadcasts skip this resource
        warn!(resource = resource.id(), error = %e, "broadcast write failed, closing resource");
        resource.close();
        return false;
    }
    resource.notify_broadcast(&BroadcastEvent::new(message));
    if resource.resume_on_broadcast() {
        resource.resume();
    }
    true
}
